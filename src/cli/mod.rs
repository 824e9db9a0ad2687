pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{BuildArgs, CliArgs, Commands, DetectArgs};
pub use output::{DetectReport, OutputFormat, OutputFormatter};
