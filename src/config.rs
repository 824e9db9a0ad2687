//! Build configuration from the environment.
//!
//! Builds are configured the buildpack way: a handful of `BP_*` environment
//! variables set on the build, read once at pipeline start into a typed
//! struct. Everything is optional; unset or empty variables mean the
//! detected build system's defaults apply.
//!
//! # Environment Variables
//!
//! - `BP_BUILD_ARGUMENTS`: replaces the default build arguments. The value
//!   is split with shell-style word rules, so quoting works as it would in
//!   `sh`. Replacement is total, not additive.
//! - `BP_BUILT_ARTIFACT`: replaces the default artifact glob. The pattern is
//!   resolved relative to the working directory and must match exactly one
//!   file once the build has run.
//! - `BP_BUILT_MODULE`: subdirectory of the source root to build and search
//!   for the artifact in. Used for multi-module projects whose deliverable
//!   is produced by one module.

use std::env;
use std::fmt;
use std::path::{Component, Path};
use thiserror::Error;

/// Replaces the default build arguments.
pub const BUILD_ARGUMENTS_VAR: &str = "BP_BUILD_ARGUMENTS";

/// Replaces the default artifact glob.
pub const BUILT_ARTIFACT_VAR: &str = "BP_BUILT_ARTIFACT";

/// Selects the module subdirectory to build.
pub const BUILT_MODULE_VAR: &str = "BP_BUILT_MODULE";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The override cannot be split into words.
    #[error("BP_BUILD_ARGUMENTS is not valid shell syntax: {0:?}")]
    UnparsableArguments(String),

    /// A path override points outside the source tree.
    #[error("{var} must name a path inside the source tree: {value:?}")]
    EscapingPath { var: &'static str, value: String },
}

/// Overrides applied to a single build.
///
/// Resolved once by the orchestrator and handed read-only to the runner;
/// nothing re-reads the environment after that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Replacement build arguments (`BP_BUILD_ARGUMENTS`), still in raw
    /// string form. `None` keeps the build system's defaults.
    pub build_arguments: Option<String>,

    /// Replacement artifact glob (`BP_BUILT_ARTIFACT`).
    pub built_artifact: Option<String>,

    /// Module subdirectory to build (`BP_BUILT_MODULE`).
    pub built_module: Option<String>,
}

impl BuildConfig {
    /// Reads the configuration from the process environment. Empty and
    /// whitespace-only values count as unset.
    pub fn from_env() -> Self {
        Self {
            build_arguments: non_empty(env::var(BUILD_ARGUMENTS_VAR).ok()),
            built_artifact: non_empty(env::var(BUILT_ARTIFACT_VAR).ok()),
            built_module: non_empty(env::var(BUILT_MODULE_VAR).ok()),
        }
    }

    /// The tokenized replacement arguments, if an override is present.
    pub fn build_argument_tokens(&self) -> Result<Option<Vec<String>>, ConfigError> {
        match &self.build_arguments {
            Some(raw) => match shlex::split(raw) {
                Some(tokens) => Ok(Some(tokens)),
                None => Err(ConfigError::UnparsableArguments(raw.clone())),
            },
            None => Ok(None),
        }
    }

    /// Validates the overrides that can be rejected before any work starts.
    ///
    /// Checks that:
    /// - `BP_BUILD_ARGUMENTS` splits into shell words
    /// - path overrides are relative and do not traverse upward
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_argument_tokens()?;
        if let Some(module) = &self.built_module {
            ensure_inside_tree(BUILT_MODULE_VAR, module)?;
        }
        if let Some(pattern) = &self.built_artifact {
            ensure_inside_tree(BUILT_ARTIFACT_VAR, pattern)?;
        }
        Ok(())
    }
}

fn ensure_inside_tree(var: &'static str, value: &str) -> Result<(), ConfigError> {
    let path = Path::new(value);
    let escapes = path.is_absolute()
        || path.components().any(|c| matches!(c, Component::ParentDir));
    if escapes {
        return Err(ConfigError::EscapingPath {
            var,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build Configuration:")?;
        match &self.build_arguments {
            Some(args) => writeln!(f, "  Build Arguments: {}", args)?,
            None => writeln!(f, "  Build Arguments: (build system defaults)")?,
        }
        match &self.built_artifact {
            Some(glob) => writeln!(f, "  Built Artifact: {}", glob)?,
            None => writeln!(f, "  Built Artifact: (build system defaults)")?,
        }
        if let Some(module) = &self.built_module {
            writeln!(f, "  Built Module: {}", module)?;
        }
        Ok(())
    }
}
