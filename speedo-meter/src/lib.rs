pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod sink;

pub use config::*;
pub use error::*;
pub use metrics::*;
pub use pipeline::*;
pub use provider::*;
pub use sink::*;
