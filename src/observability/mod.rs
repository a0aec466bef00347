// Observability: structured logging to console and rotating JSON files

pub mod logging;

pub use logging::init_logging;
