//! Core utilities: configuration, errors, logging, platform classification

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod utils;

pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use platform::Platform;
