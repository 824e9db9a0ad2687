//! Supported build systems and their detection.
//!
//! Gradle and Maven differ only in data: which files mark a project, what
//! the wrapper script is called, which arguments build by default, where the
//! artifact lands and where the dependency cache lives. That data hangs off
//! [`BuildSystemKind`] as a capability record, and the resolver, cache and
//! runner are written once against it instead of once per system.

pub mod gradle;
pub mod maven;
pub mod tool;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A supported build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystemKind {
    Gradle,
    Maven,
}

impl BuildSystemKind {
    /// All kinds, in detection precedence order. A tree carrying signals for
    /// more than one system resolves to the first match.
    pub const ALL: [BuildSystemKind; 2] = [BuildSystemKind::Gradle, BuildSystemKind::Maven];

    pub fn name(&self) -> &'static str {
        match self {
            BuildSystemKind::Gradle => "gradle",
            BuildSystemKind::Maven => "maven",
        }
    }

    /// Files at the source root that mark a project as using this system.
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            BuildSystemKind::Gradle => gradle::MARKERS,
            BuildSystemKind::Maven => maven::MARKERS,
        }
    }

    /// Name of the in-tree wrapper script.
    pub fn wrapper(&self) -> &'static str {
        match self {
            BuildSystemKind::Gradle => gradle::WRAPPER,
            BuildSystemKind::Maven => maven::WRAPPER,
        }
    }

    /// Name of the launcher inside a provisioned distribution's `bin/`.
    pub fn tool_binary(&self) -> &'static str {
        match self {
            BuildSystemKind::Gradle => "gradle",
            BuildSystemKind::Maven => "mvn",
        }
    }

    /// Build arguments used when `BP_BUILD_ARGUMENTS` is unset.
    pub fn default_arguments(&self) -> &'static [&'static str] {
        match self {
            BuildSystemKind::Gradle => gradle::DEFAULT_ARGUMENTS,
            BuildSystemKind::Maven => maven::DEFAULT_ARGUMENTS,
        }
    }

    /// Glob for the built artifact, relative to the working directory, used
    /// when `BP_BUILT_ARTIFACT` is unset.
    pub fn default_artifact_glob(&self) -> &'static str {
        match self {
            BuildSystemKind::Gradle => gradle::DEFAULT_ARTIFACT_GLOB,
            BuildSystemKind::Maven => maven::DEFAULT_ARTIFACT_GLOB,
        }
    }

    /// Directory under `$HOME` the tool keeps its dependency cache in.
    pub fn cache_home(&self) -> &'static str {
        match self {
            BuildSystemKind::Gradle => gradle::CACHE_HOME,
            BuildSystemKind::Maven => maven::CACHE_HOME,
        }
    }

    /// Layer name for the persistent dependency cache.
    pub fn cache_layer_name(&self) -> &'static str {
        match self {
            BuildSystemKind::Gradle => "gradle-cache",
            BuildSystemKind::Maven => "maven-cache",
        }
    }

    /// Layer name for a provisioned tool distribution.
    pub fn tool_layer_name(&self) -> &'static str {
        self.name()
    }

    /// True when the source tree carries this system's signals: either the
    /// wrapper script or any marker file at the root.
    pub fn matches(&self, app_dir: &Path) -> bool {
        app_dir.join(self.wrapper()).is_file()
            || self.markers().iter().any(|m| app_dir.join(m).is_file())
    }
}

impl fmt::Display for BuildSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reports which build system a source tree uses, if any.
///
/// This is a pure read of the filesystem; a tree with no signals is a normal
/// `None`, not an error. Only the tree root is examined, so a Maven project
/// nested three directories down stays undetected on purpose.
pub fn detect(app_dir: &Path) -> Option<BuildSystemKind> {
    BuildSystemKind::ALL
        .into_iter()
        .find(|kind| kind.matches(app_dir))
}

/// Parses version strings the JVM ecosystem actually writes. Gradle
/// publishes two-component versions ("8.5"), which get padded to full
/// semver; trailing qualifiers are dropped.
pub(crate) fn lenient_version(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut parts = trimmed.splitn(3, '.');
    let major = leading_number(parts.next()?)?;
    let minor = parts.next().map_or(Some(0), leading_number)?;
    let patch = parts.next().map_or(Some(0), leading_number)?;
    Some(semver::Version::new(major, minor, patch))
}

fn leading_number(part: &str) -> Option<u64> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
