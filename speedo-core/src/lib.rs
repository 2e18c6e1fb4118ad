//! Ядро спидометра
//!
//! Перевод скорости GPS (м/с) в угол стрелки и значение табло, линейная
//! анимация элементов шкалы и формат трасс скорости.
//!
//! # Быстрый старт
//!
//! ```
//! use speedo_core::SpeedToAngleConverter;
//!
//! let conv = SpeedToAngleConverter::default();
//! let (display_kmph, needle_deg) = conv.convert(25.0);
//! assert_eq!(display_kmph, 90.0);
//! assert_eq!(needle_deg, 90.0);
//! ```

pub mod animation;
pub mod converter;
pub mod gauge;
pub mod pacing;
pub mod trace;

pub use animation::*;
pub use converter::*;
pub use gauge::*;
pub use pacing::*;
pub use speedo_types::*;
pub use trace::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
