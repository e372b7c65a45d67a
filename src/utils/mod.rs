//! Utility modules shared by the engine and embedding processes

pub mod logging;

pub use logging::{init_logging, init_logging_from_config};

#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
