//! Utility modules for kilnbox
//!
//! Currently this hosts the structured logging setup shared by the CLI
//! entrypoint and the tests.

pub mod logging;

// Re-export commonly used items
pub use logging::{init, level_from_args, parse_level};
