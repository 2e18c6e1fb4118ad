pub mod calibration;
pub mod error;
pub mod sample;
pub mod units;

pub use calibration::*;
pub use error::*;
pub use sample::*;
pub use units::*;
