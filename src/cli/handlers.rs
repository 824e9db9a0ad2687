//! Command handlers wiring the CLI to the pipeline.
//!
//! Exit codes follow the conventions of buildpack lifecycle binaries.
//! `detect` exits 0 on a match, 100 when no supported build system applies
//! and 101 when the check itself fails. `build` exits 0 on success (or when
//! the tree is simply not ours to build), 101 on initialization failures,
//! 102 when a pipeline component cannot be constructed and 103 when a
//! component fails while contributing.

use crate::buildsystem;
use crate::buildsystem::tool::ToolResolver;
use crate::cache::DependencyCache;
use crate::cli::commands::{BuildArgs, DetectArgs};
use crate::cli::output::{DetectReport, OutputFormatter};
use crate::config::BuildConfig;
use crate::layers::Layers;
use crate::runner::Runner;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// No supported build system applies to the tree.
pub const EXIT_DETECT_FAIL: i32 = 100;
/// Initialization failed before the pipeline could decide anything.
pub const EXIT_INIT: i32 = 101;
/// A pipeline component could not be constructed.
pub const EXIT_CREATE: i32 = 102;
/// A component failed while contributing its part of the build.
pub const EXIT_CONTRIBUTE: i32 = 103;

pub fn handle_detect(args: &DetectArgs, quiet: bool) -> i32 {
    match run_detect(args, quiet) {
        Ok(code) => code,
        Err(err) => {
            error!("detect failed: {:#}", err);
            EXIT_INIT
        }
    }
}

fn run_detect(args: &DetectArgs, quiet: bool) -> Result<i32> {
    let app_dir = resolve_app_dir(args.app_dir.as_deref())?;
    let report = DetectReport::new(&app_dir, buildsystem::detect(&app_dir));

    if !quiet {
        let formatter = OutputFormatter::new(args.format.into());
        println!("{}", formatter.format(&report)?);
    }

    if let Some(path) = &args.plan {
        if let Some(plan) = report.plan_toml() {
            fs::write(path, plan)
                .with_context(|| format!("failed to write build plan to {}", path.display()))?;
            debug!("Wrote build plan to {}", path.display());
        }
    }

    Ok(if report.passed() { 0 } else { EXIT_DETECT_FAIL })
}

pub fn handle_build(args: &BuildArgs) -> i32 {
    let app_dir = match resolve_app_dir(args.app_dir.as_deref()) {
        Ok(dir) => dir,
        Err(err) => {
            error!("{:#}", err);
            return EXIT_INIT;
        }
    };

    let config = BuildConfig::from_env();
    if let Err(err) = config.validate() {
        error!("invalid build configuration: {}", err);
        return EXIT_CREATE;
    }

    // A tree that is not ours is a pass, not a failure; some other step of
    // the host lifecycle owns it.
    let Some(kind) = buildsystem::detect(&app_dir) else {
        warn!(
            "no supported build system in {}, nothing to contribute",
            app_dir.display()
        );
        return 0;
    };
    info!("Detected {} application", kind);
    debug!("{}", config);

    let layers = Layers::new(&args.layers);

    let tool = match ToolResolver::new(&layers, kind).resolve(&app_dir) {
        Ok(tool) => tool,
        Err(err) => {
            error!(
                "failed to resolve {} tool: {:#}",
                kind,
                anyhow::Error::new(err)
            );
            return EXIT_CREATE;
        }
    };

    let home = match dirs::home_dir() {
        Some(home) => home,
        None => {
            error!("cannot determine a home directory for the dependency cache");
            return EXIT_CREATE;
        }
    };
    if let Err(err) = DependencyCache::new(&layers, home).contribute(kind) {
        error!(
            "failed to contribute dependency cache: {:#}",
            anyhow::Error::new(err)
        );
        return EXIT_CONTRIBUTE;
    }

    if let Err(err) = Runner::new(&app_dir, tool, &config, &layers).contribute() {
        error!("build failed: {:#}", anyhow::Error::new(err));
        return EXIT_CONTRIBUTE;
    }

    info!("Application build complete");
    0
}

fn resolve_app_dir(app_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match app_dir {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("failed to determine current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("source directory {} is not accessible", dir.display()))
}
