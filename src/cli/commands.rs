use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildpack for Gradle and Maven applications
#[derive(Parser, Debug)]
#[command(
    name = "kilnbox",
    about = "Buildpack that compiles Gradle and Maven applications",
    version,
    long_about = "kilnbox inspects an application source tree, acquires the matching build \
                  tool (committed wrapper or provisioned distribution), wires a persistent \
                  dependency cache, runs the build, and replaces the source tree with the \
                  contents of the built artifact."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose output (debug logging)")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Report whether a source tree uses a supported build system",
        long_about = "Checks the source tree root for build system signals (wrapper scripts \
                      and marker files) and reports the result.\n\n\
                      Exit codes:\n  \
                      0    a supported build system was detected\n  \
                      100  no supported build system applies\n  \
                      101  the check itself failed\n\n\
                      Examples:\n  \
                      kilnbox detect\n  \
                      kilnbox detect /workspace\n  \
                      kilnbox detect --format json --plan plan.toml"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Build the application and replace the source tree with the built artifact",
        long_about = "Runs the full pipeline: detect the build system, resolve the build \
                      tool, contribute the dependency cache, execute the build, and replace \
                      the source tree with the exploded artifact.\n\n\
                      Examples:\n  \
                      kilnbox build\n  \
                      kilnbox build /workspace --layers /layers"
    )]
    Build(BuildArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Application source root (defaults to current directory)"
    )]
    pub app_dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'p',
        long,
        value_name = "FILE",
        help = "Write a build plan for the detected system to a TOML file"
    )]
    pub plan: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Application source root (defaults to current directory)"
    )]
    pub app_dir: Option<PathBuf>,

    #[arg(
        short = 'l',
        long,
        value_name = "DIR",
        default_value = "/layers",
        help = "Layers root provided by the host lifecycle"
    )]
    pub layers: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        // Verify that CLI structure is valid
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_detect_args() {
        let args = CliArgs::parse_from(["kilnbox", "detect"]);
        match args.command {
            Commands::Detect(detect_args) => {
                assert_eq!(detect_args.format, OutputFormatArg::Human);
                assert!(detect_args.app_dir.is_none());
                assert!(detect_args.plan.is_none());
            }
            _ => panic!("Expected Detect command"),
        }
    }

    #[test]
    fn test_detect_with_path_and_options() {
        let args = CliArgs::parse_from([
            "kilnbox",
            "detect",
            "/workspace",
            "--format",
            "json",
            "--plan",
            "plan.toml",
        ]);
        match args.command {
            Commands::Detect(detect_args) => {
                assert_eq!(detect_args.app_dir, Some(PathBuf::from("/workspace")));
                assert_eq!(detect_args.format, OutputFormatArg::Json);
                assert_eq!(detect_args.plan, Some(PathBuf::from("plan.toml")));
            }
            _ => panic!("Expected Detect command"),
        }
    }

    #[test]
    fn test_default_build_args() {
        let args = CliArgs::parse_from(["kilnbox", "build"]);
        match args.command {
            Commands::Build(build_args) => {
                assert!(build_args.app_dir.is_none());
                assert_eq!(build_args.layers, PathBuf::from("/layers"));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_build_with_layers_override() {
        let args = CliArgs::parse_from(["kilnbox", "build", "/workspace", "-l", "/tmp/layers"]);
        match args.command {
            Commands::Build(build_args) => {
                assert_eq!(build_args.app_dir, Some(PathBuf::from("/workspace")));
                assert_eq!(build_args.layers, PathBuf::from("/tmp/layers"));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_global_verbose_flag() {
        let args = CliArgs::parse_from(["kilnbox", "-v", "detect"]);
        assert!(args.verbose);
        assert!(!args.quiet);
    }

    #[test]
    fn test_global_quiet_flag() {
        let args = CliArgs::parse_from(["kilnbox", "-q", "build"]);
        assert!(!args.verbose);
        assert!(args.quiet);
    }

    #[test]
    fn test_log_level_flag() {
        let args = CliArgs::parse_from(["kilnbox", "--log-level", "debug", "detect"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
