//! Build tool acquisition.
//!
//! Every build needs exactly one executable to run. A committed wrapper
//! script (`gradlew` / `mvnw`) always wins, because it pins the version the
//! project's developers actually use. Without one, the resolver provisions a
//! distribution from its release inventory into a cached layer: pick the
//! highest release satisfying whatever minimum the tree declares, download,
//! optionally verify, unpack. A layer left by a previous build is reused
//! when its recorded version still matches the selection.

use crate::archive::{self, ArchiveError};
use crate::layers::{LayerError, LayerFlags, LayerMetadata, Layers};
use semver::{Version, VersionReq};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use super::{gradle, maven, BuildSystemKind};

/// Metadata key recording which version a tool layer holds.
const VERSION_KEY: &str = "version";

/// Tool layers are needed by the build and worth keeping across builds, but
/// have no business in the launch image.
const TOOL_LAYER_FLAGS: LayerFlags = LayerFlags {
    build: true,
    cache: true,
    launch: false,
};

/// How the resolved executable came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOrigin {
    /// Wrapper script committed to the source tree.
    Wrapper,
    /// Distribution provisioned into a layer by the resolver.
    Provisioned,
}

/// The build tool chosen for one build. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct ToolReference {
    pub kind: BuildSystemKind,
    pub executable: PathBuf,
    /// Known version, when one could be determined. Wrapper scripts without
    /// readable wrapper properties resolve with `None`.
    pub version: Option<String>,
    pub origin: ToolOrigin,
}

/// Container format of a tool distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistArchive {
    Zip,
    TarGz,
}

/// One provisionable release of a build tool.
#[derive(Debug, Clone)]
pub struct ToolRelease {
    pub version: Version,
    pub uri: String,
    /// Lowercase hex digest to verify the download against, when pinned.
    pub sha256: Option<String>,
    pub archive: DistArchive,
}

impl ToolRelease {
    pub fn new(version: Version, uri: &str, archive: DistArchive) -> Self {
        Self {
            version,
            uri: uri.to_string(),
            sha256: None,
            archive,
        }
    }

    pub fn with_sha256(mut self, digest: &str) -> Self {
        self.sha256 = Some(digest.to_string());
        self
    }
}

/// The set of releases the resolver may provision, ordered newest first.
#[derive(Debug, Clone)]
pub struct Inventory {
    releases: Vec<ToolRelease>,
}

impl Inventory {
    /// The built-in releases for a build system.
    pub fn for_kind(kind: BuildSystemKind) -> Self {
        match kind {
            BuildSystemKind::Gradle => Self::from_releases(gradle::releases()),
            BuildSystemKind::Maven => Self::from_releases(maven::releases()),
        }
    }

    pub fn from_releases(mut releases: Vec<ToolRelease>) -> Self {
        releases.sort_by(|a, b| b.version.cmp(&a.version));
        Self { releases }
    }

    /// Highest release satisfying the requirement.
    pub fn select(&self, requirement: &VersionReq) -> Option<&ToolRelease> {
        self.releases
            .iter()
            .find(|release| requirement.matches(&release.version))
    }

    fn available(&self) -> String {
        if self.releases.is_empty() {
            return "none".to_string();
        }
        self.releases
            .iter()
            .map(|r| r.version.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Errors raised while acquiring a build tool.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The committed wrapper exists but cannot be run. Falling back to a
    /// provisioned tool here would silently build with a different version
    /// than the project pinned, so this is fatal instead.
    #[error("wrapper script {} is present but not executable", .path.display())]
    WrapperNotExecutable { path: PathBuf },

    #[error("no {kind} release satisfies {requirement} (available: {available})")]
    NoCompatibleVersion {
        kind: BuildSystemKind,
        requirement: VersionReq,
        available: String,
    },

    #[error("failed to download {uri}: {source}")]
    Download {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("checksum mismatch for {uri}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error("failed to unpack {uri}: {source}")]
    Unpack {
        uri: String,
        #[source]
        source: ArchiveError,
    },

    #[error("provisioned distribution has no launcher at {}", .path.display())]
    MissingLauncher { path: PathBuf },

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("tool resolution I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves the executable one build will run.
#[derive(Debug)]
pub struct ToolResolver<'a> {
    layers: &'a Layers,
    kind: BuildSystemKind,
    inventory: Inventory,
}

impl<'a> ToolResolver<'a> {
    pub fn new(layers: &'a Layers, kind: BuildSystemKind) -> Self {
        Self {
            layers,
            kind,
            inventory: Inventory::for_kind(kind),
        }
    }

    /// Same resolver with a caller-supplied inventory. Tests point this at
    /// a local HTTP server; operators could point it at a mirror.
    pub fn with_inventory(layers: &'a Layers, kind: BuildSystemKind, inventory: Inventory) -> Self {
        Self {
            layers,
            kind,
            inventory,
        }
    }

    /// Resolves the tool for the given source tree: committed wrapper first,
    /// provisioned distribution otherwise.
    pub fn resolve(&self, app_dir: &Path) -> Result<ToolReference, ResolveError> {
        let wrapper_path = app_dir.join(self.kind.wrapper());
        if wrapper_path.is_file() {
            ensure_executable(&wrapper_path)?;
            let version = self.wrapper_version(app_dir).map(|v| v.to_string());
            debug!(
                "Using committed wrapper {} (version: {})",
                wrapper_path.display(),
                version.as_deref().unwrap_or("unknown")
            );
            return Ok(ToolReference {
                kind: self.kind,
                executable: wrapper_path,
                version,
                origin: ToolOrigin::Wrapper,
            });
        }
        self.provision(app_dir)
    }

    fn provision(&self, app_dir: &Path) -> Result<ToolReference, ResolveError> {
        let requirement = self.declared_requirement(app_dir).unwrap_or(VersionReq::STAR);
        let release =
            self.inventory
                .select(&requirement)
                .ok_or_else(|| ResolveError::NoCompatibleVersion {
                    kind: self.kind,
                    requirement: requirement.clone(),
                    available: self.inventory.available(),
                })?;

        let layer = self.layers.layer(self.kind.tool_layer_name());
        let launcher = layer.path().join("bin").join(self.kind.tool_binary());
        let version = release.version.to_string();

        if let Some(existing) = layer.read_metadata()? {
            let same_version =
                existing.metadata.get(VERSION_KEY).map(String::as_str) == Some(version.as_str());
            if same_version && launcher.is_file() {
                info!("Reusing {} {} provisioned by a previous build", self.kind, version);
                return Ok(ToolReference {
                    kind: self.kind,
                    executable: launcher,
                    version: Some(version),
                    origin: ToolOrigin::Provisioned,
                });
            }
        }

        info!("Provisioning {} {}", self.kind, version);
        let download = self.download(release)?;

        // A stale layer holds a different version; replace it wholesale.
        layer.reset()?;
        layer.ensure_dir()?;
        let unpacked = match release.archive {
            DistArchive::Zip => archive::extract_zip(download.path(), layer.path(), 1),
            DistArchive::TarGz => archive::extract_tar_gz(download.path(), layer.path(), 1),
        };
        unpacked.map_err(|source| ResolveError::Unpack {
            uri: release.uri.clone(),
            source,
        })?;

        if !launcher.is_file() {
            return Err(ResolveError::MissingLauncher { path: launcher });
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Distributions assembled on Windows can ship without the bit.
            fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755))?;
        }

        layer.write_metadata(
            &LayerMetadata::new(TOOL_LAYER_FLAGS).with_entry(VERSION_KEY, version.clone()),
        )?;

        Ok(ToolReference {
            kind: self.kind,
            executable: launcher,
            version: Some(version),
            origin: ToolOrigin::Provisioned,
        })
    }

    fn download(&self, release: &ToolRelease) -> Result<NamedTempFile, ResolveError> {
        info!("Downloading {}", release.uri);
        let response = reqwest::blocking::get(&release.uri)
            .and_then(|response| response.error_for_status())
            .map_err(|source| ResolveError::Download {
                uri: release.uri.clone(),
                source,
            })?;
        let bytes = response.bytes().map_err(|source| ResolveError::Download {
            uri: release.uri.clone(),
            source,
        })?;

        if let Some(expected) = &release.sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ResolveError::ChecksumMismatch {
                    uri: release.uri.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
            debug!("Verified sha256 {}", actual);
        }

        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(file)
    }

    fn wrapper_version(&self, app_dir: &Path) -> Option<Version> {
        match self.kind {
            BuildSystemKind::Gradle => gradle::wrapper_version(app_dir),
            BuildSystemKind::Maven => maven::wrapper_version(app_dir),
        }
    }

    fn declared_requirement(&self, app_dir: &Path) -> Option<VersionReq> {
        match self.kind {
            BuildSystemKind::Gradle => gradle::declared_requirement(app_dir),
            BuildSystemKind::Maven => maven::declared_requirement(app_dir),
        }
    }
}

fn ensure_executable(path: &Path) -> Result<(), ResolveError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)?.permissions().mode();
        if mode & 0o111 == 0 {
            return Err(ResolveError::WrapperNotExecutable {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
