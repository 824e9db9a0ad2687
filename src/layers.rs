//! Layer directories managed for the host build lifecycle.
//!
//! A layer is a directory under the lifecycle-provided layers root plus a
//! sibling `<name>.toml` file. The TOML carries three independent booleans
//! the host reads to decide the directory's fate: `cache` persists it across
//! builds, `launch` ships it with the running application, and `build`
//! exposes it to later build steps. A free-form string table next to the
//! flags holds reuse records such as a provisioned tool version.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing layer state.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("failed to access layer '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode metadata for layer '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to decode metadata for layer '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: toml::de::Error,
    },
}

/// The three flags the host lifecycle honors for every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFlags {
    pub build: bool,
    pub cache: bool,
    pub launch: bool,
}

impl LayerFlags {
    /// A layer the host neither caches nor exposes anywhere. Used for pure
    /// record-keeping layers.
    pub const NONE: LayerFlags = LayerFlags {
        build: false,
        cache: false,
        launch: false,
    };
}

/// Contents of a layer's `<name>.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub build: bool,
    pub cache: bool,
    pub launch: bool,

    /// Free-form key/value records, kept sorted so the file is stable across
    /// rewrites.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LayerMetadata {
    pub fn new(flags: LayerFlags) -> Self {
        Self {
            build: flags.build,
            cache: flags.cache,
            launch: flags.launch,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn flags(&self) -> LayerFlags {
        LayerFlags {
            build: self.build,
            cache: self.cache,
            launch: self.launch,
        }
    }
}

/// The layers root handed to the build by the host lifecycle.
#[derive(Debug, Clone)]
pub struct Layers {
    root: PathBuf,
}

impl Layers {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle for the named layer. Nothing is created until the layer is
    /// written to.
    pub fn layer(&self, name: &str) -> Layer {
        Layer {
            path: self.root.join(name),
            metadata_path: self.root.join(format!("{}.toml", name)),
            name: name.to_string(),
        }
    }
}

/// A single named layer: its content directory and its metadata file.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    path: PathBuf,
    metadata_path: PathBuf,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The layer's content directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Creates the content directory (and the layers root) if absent.
    pub fn ensure_dir(&self) -> Result<(), LayerError> {
        fs::create_dir_all(&self.path).map_err(|source| LayerError::Io {
            name: self.name.clone(),
            source,
        })
    }

    /// Removes the content directory and metadata file if present.
    ///
    /// Used when a layer's contents are being replaced wholesale, never for
    /// dependency caches.
    pub fn reset(&self) -> Result<(), LayerError> {
        if self.path.exists() {
            fs::remove_dir_all(&self.path).map_err(|source| LayerError::Io {
                name: self.name.clone(),
                source,
            })?;
        }
        if self.metadata_path.exists() {
            fs::remove_file(&self.metadata_path).map_err(|source| LayerError::Io {
                name: self.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Writes flags and metadata, replacing any previous file.
    pub fn write_metadata(&self, metadata: &LayerMetadata) -> Result<(), LayerError> {
        let encoded = toml::to_string(metadata).map_err(|source| LayerError::Encode {
            name: self.name.clone(),
            source,
        })?;
        if let Some(parent) = self.metadata_path.parent() {
            fs::create_dir_all(parent).map_err(|source| LayerError::Io {
                name: self.name.clone(),
                source,
            })?;
        }
        fs::write(&self.metadata_path, encoded).map_err(|source| LayerError::Io {
            name: self.name.clone(),
            source,
        })
    }

    /// Reads the metadata file, or `None` when the layer has none yet.
    pub fn read_metadata(&self) -> Result<Option<LayerMetadata>, LayerError> {
        let raw = match fs::read_to_string(&self.metadata_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LayerError::Io {
                    name: self.name.clone(),
                    source,
                })
            }
        };
        let metadata = toml::from_str(&raw).map_err(|source| LayerError::Decode {
            name: self.name.clone(),
            source,
        })?;
        Ok(Some(metadata))
    }
}
