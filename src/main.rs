use kilnbox::cli::commands::{CliArgs, Commands};
use kilnbox::cli::handlers::{handle_build, handle_detect};
use kilnbox::util::logging;
use kilnbox::VERSION;

use clap::Parser;
use tracing::debug;

fn main() {
    let args = CliArgs::parse();
    logging::init(logging::level_from_args(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("kilnbox v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args, args.quiet),
        Commands::Build(build_args) => handle_build(build_args),
    };

    std::process::exit(exit_code);
}
