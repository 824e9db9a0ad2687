//! Build execution and artifact materialization.
//!
//! The runner drives one build to completion: assemble the command from
//! defaults and overrides, execute the tool with streams passed through,
//! resolve exactly one built artifact, preserve a copy outside the source
//! tree, then replace the source tree with the artifact's contents. There
//! are no retries; the first failure aborts the pipeline.
//!
//! Execution goes through the [`Executor`] trait so tests can observe the
//! assembled command and fabricate build outputs without a real JVM.

use crate::archive::{self, ArchiveError};
use crate::buildsystem::tool::ToolReference;
use crate::config::{BuildConfig, ConfigError};
use crate::layers::{LayerError, LayerFlags, LayerMetadata, Layers};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Layer recording what was built. Carries no content the host needs to
/// keep, so all three flags stay false.
pub const APPLICATION_LAYER: &str = "application";

/// Executes an assembled build command.
pub trait Executor {
    fn execute(&self, command: &mut Command) -> io::Result<ExitStatus>;
}

/// Runs the command on the host with inherited output streams.
#[derive(Debug, Default)]
pub struct HostExecutor;

impl Executor for HostExecutor {
    fn execute(&self, command: &mut Command) -> io::Result<ExitStatus> {
        command.status()
    }
}

/// Errors raised while building or materializing.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("configured module directory {} does not exist", .0.display())]
    MissingModule(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start build command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("build command `{command}` failed: {status}")]
    BuildFailed { command: String, status: ExitStatus },

    #[error("invalid artifact pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unable to determine built artifact in {}, candidates matching {pattern:?}: [{}]", .location.display(), format_candidates(.candidates))]
    AmbiguousArtifact {
        pattern: String,
        location: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("failed to preserve built artifact {}: {source}", .artifact.display())]
    Preserve {
        artifact: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to replace source tree at {}: {source}", .path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Layer(#[from] LayerError),
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn replace_error(path: &Path, source: io::Error) -> RunnerError {
    RunnerError::Replace {
        path: path.to_path_buf(),
        source,
    }
}

/// Drives one build from command assembly to source tree replacement.
pub struct Runner<'a> {
    app_dir: PathBuf,
    tool: ToolReference,
    config: &'a BuildConfig,
    layers: &'a Layers,
    executor: Box<dyn Executor>,
}

impl<'a> Runner<'a> {
    pub fn new(
        app_dir: impl Into<PathBuf>,
        tool: ToolReference,
        config: &'a BuildConfig,
        layers: &'a Layers,
    ) -> Self {
        Self {
            app_dir: app_dir.into(),
            tool,
            config,
            layers,
            executor: Box::new(HostExecutor),
        }
    }

    /// Replaces the executor. Tests use this to capture commands and to
    /// fabricate build outputs.
    pub fn with_executor(mut self, executor: Box<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Builds the application and replaces the source tree with the built
    /// artifact's contents.
    pub fn contribute(&self) -> Result<(), RunnerError> {
        info!("Building {} application", self.tool.kind);
        let workdir = self.working_directory()?;
        self.execute(&workdir)?;

        let artifact = self.built_artifact(&workdir)?;
        let preserved = self.preserve(&artifact)?;
        self.materialize(preserved.path())?;
        self.contribute_application_layer(&artifact)?;

        info!("Source tree replaced with built artifact contents");
        Ok(())
    }

    /// Where the build command runs and where the artifact is searched:
    /// the source root, or the configured module subdirectory.
    fn working_directory(&self) -> Result<PathBuf, RunnerError> {
        match &self.config.built_module {
            Some(module) => {
                let dir = self.app_dir.join(module);
                if !dir.is_dir() {
                    return Err(RunnerError::MissingModule(dir));
                }
                Ok(dir)
            }
            None => Ok(self.app_dir.clone()),
        }
    }

    fn arguments(&self) -> Result<Vec<String>, RunnerError> {
        if let Some(tokens) = self.config.build_argument_tokens()? {
            debug!("Using configured build arguments: {:?}", tokens);
            return Ok(tokens);
        }
        Ok(self
            .tool
            .kind
            .default_arguments()
            .iter()
            .map(|s| s.to_string())
            .collect())
    }

    fn execute(&self, workdir: &Path) -> Result<(), RunnerError> {
        let arguments = self.arguments()?;
        let rendered = render_command(&self.tool.executable, &arguments);

        let mut command = Command::new(&self.tool.executable);
        command
            .args(&arguments)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        info!("Running {}", rendered);
        let status = self
            .executor
            .execute(&mut command)
            .map_err(|source| RunnerError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RunnerError::BuildFailed {
                command: rendered,
                status,
            });
        }
        Ok(())
    }

    /// The single file produced by the build. Zero or several matches both
    /// mean the pattern cannot identify the deliverable, and the error lists
    /// every candidate so the pattern can be corrected.
    fn built_artifact(&self, workdir: &Path) -> Result<PathBuf, RunnerError> {
        let pattern = self
            .config
            .built_artifact
            .as_deref()
            .unwrap_or_else(|| self.tool.kind.default_artifact_glob());

        let mut candidates = glob_matches(workdir, pattern)?;
        if candidates.len() != 1 {
            return Err(RunnerError::AmbiguousArtifact {
                pattern: pattern.to_string(),
                location: workdir.to_path_buf(),
                candidates,
            });
        }
        let artifact = candidates.remove(0);
        debug!("Built artifact: {}", artifact.display());
        Ok(artifact)
    }

    /// Copies the artifact out of the tree that is about to be destroyed.
    fn preserve(&self, artifact: &Path) -> Result<NamedTempFile, RunnerError> {
        let preserve_error = |source| RunnerError::Preserve {
            artifact: artifact.to_path_buf(),
            source,
        };
        let file = tempfile::Builder::new()
            .prefix("kilnbox-artifact-")
            .tempfile()
            .map_err(preserve_error)?;
        fs::copy(artifact, file.path()).map_err(preserve_error)?;
        debug!(
            "Preserved {} at {}",
            artifact.display(),
            file.path().display()
        );
        Ok(file)
    }

    /// Replaces the source tree with the archive's contents.
    ///
    /// The archive is extracted into a staging directory inside the root
    /// first, so an unreadable or truncated artifact aborts with the tree
    /// untouched. Only then is the old content removed and the staged
    /// content moved up. A crash between those two steps leaves the staged
    /// tree under the root instead of in place.
    fn materialize(&self, archive_path: &Path) -> Result<(), RunnerError> {
        let staging = tempfile::Builder::new()
            .prefix(".kilnbox-stage-")
            .tempdir_in(&self.app_dir)
            .map_err(|e| replace_error(&self.app_dir, e))?;

        info!("Expanding built artifact over the source tree");
        archive::extract_zip(archive_path, staging.path(), 0)?;

        let staging_name = staging.path().file_name().map(|n| n.to_os_string());
        for entry in fs::read_dir(&self.app_dir).map_err(|e| replace_error(&self.app_dir, e))? {
            let entry = entry.map_err(|e| replace_error(&self.app_dir, e))?;
            if Some(entry.file_name()) == staging_name {
                continue;
            }
            let file_type = entry
                .file_type()
                .map_err(|e| replace_error(&entry.path(), e))?;
            let removed = if file_type.is_dir() {
                fs::remove_dir_all(entry.path())
            } else {
                fs::remove_file(entry.path())
            };
            removed.map_err(|e| replace_error(&entry.path(), e))?;
        }

        for entry in fs::read_dir(staging.path()).map_err(|e| replace_error(staging.path(), e))? {
            let entry = entry.map_err(|e| replace_error(staging.path(), e))?;
            let target = self.app_dir.join(entry.file_name());
            fs::rename(entry.path(), &target).map_err(|e| replace_error(&target, e))?;
        }

        // The staging directory is empty now; its guard removes it.
        Ok(())
    }

    /// Records what was built in a layer the host neither caches nor ships.
    fn contribute_application_layer(&self, artifact: &Path) -> Result<(), RunnerError> {
        let layer = self.layers.layer(APPLICATION_LAYER);
        layer.ensure_dir()?;

        let mut metadata = LayerMetadata::new(LayerFlags::NONE)
            .with_entry("build-system", self.tool.kind.name());
        if let Some(name) = artifact.file_name() {
            metadata = metadata.with_entry("artifact", name.to_string_lossy());
        }
        if let Some(version) = &self.tool.version {
            metadata = metadata.with_entry("tool-version", version.clone());
        }
        layer.write_metadata(&metadata)?;
        Ok(())
    }
}

fn render_command(program: &Path, arguments: &[String]) -> String {
    format!("{} {}", program.display(), arguments.join(" "))
}

/// Matches a relative glob against files under `base`. `*` and `?` match
/// within a single path component. Results come back sorted so candidate
/// lists are deterministic.
fn glob_matches(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, RunnerError> {
    let regex = glob_regex(pattern)?;
    let depth = pattern.split('/').count();

    let mut matches: Vec<PathBuf> = WalkDir::new(base)
        .min_depth(1)
        .max_depth(depth)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .strip_prefix(base)
                .map(|relative| regex.is_match(&relative.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    matches.sort();
    Ok(matches)
}

fn glob_regex(pattern: &str) -> Result<Regex, RunnerError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            _ => expr.push_str(&regex::escape(&ch.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|source| RunnerError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
