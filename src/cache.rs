//! Persistent dependency caches.
//!
//! Gradle and Maven keep downloaded dependencies under a home-relative
//! directory (`~/.gradle`, `~/.m2`). The build environment's home is
//! ephemeral, so that directory is swapped for a symlink into a layer the
//! host persists across builds: first build populates it, later builds of
//! anything resolving the same artifacts hit it.
//!
//! Cache content is additive only. Nothing here deletes or truncates a
//! cache layer; a stale entry costs disk, a wiped cache costs every
//! subsequent build minutes of re-downloading. Unbounded growth is the
//! accepted tradeoff and pruning is left to the host's layer eviction.

use crate::buildsystem::BuildSystemKind;
use crate::layers::{Layer, LayerError, LayerFlags, LayerMetadata, Layers};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Cache layers persist across builds and stay out of both the launch image
/// and downstream build steps.
const CACHE_LAYER_FLAGS: LayerFlags = LayerFlags {
    build: false,
    cache: true,
    launch: false,
};

/// Errors raised while wiring a dependency cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("failed to link cache home {} to layer {}: {source}", .home.display(), .layer.display())]
    Link {
        home: PathBuf,
        layer: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Wires one build system's dependency home to a persisted layer.
#[derive(Debug)]
pub struct DependencyCache<'a> {
    layers: &'a Layers,
    home: PathBuf,
}

impl<'a> DependencyCache<'a> {
    /// `home` is the build user's home directory, under which the tool
    /// expects its cache.
    pub fn new(layers: &'a Layers, home: impl Into<PathBuf>) -> Self {
        Self {
            layers,
            home: home.into(),
        }
    }

    /// Ensures the cache layer exists, links the tool's home directory to
    /// it, and marks it for persistence. Existing layer content is left
    /// exactly as the previous build wrote it.
    pub fn contribute(&self, kind: BuildSystemKind) -> Result<Layer, CacheError> {
        let layer = self.layers.layer(kind.cache_layer_name());
        layer.ensure_dir()?;

        let home_path = self.home.join(kind.cache_home());
        // symlink_metadata so a dangling link still counts as occupied.
        if fs::symlink_metadata(&home_path).is_ok() {
            debug!(
                "{} already exists, leaving it in place",
                home_path.display()
            );
        } else {
            if let Some(parent) = home_path.parent() {
                fs::create_dir_all(parent).map_err(|source| CacheError::Link {
                    home: home_path.clone(),
                    layer: layer.path().to_path_buf(),
                    source,
                })?;
            }
            link_home(&layer, &home_path)?;
            debug!(
                "Linked {} -> {}",
                home_path.display(),
                layer.path().display()
            );
        }

        layer.write_metadata(&LayerMetadata::new(CACHE_LAYER_FLAGS))?;
        info!("Contributed {} dependency cache", kind);
        Ok(layer)
    }
}

#[cfg(unix)]
fn link_home(layer: &Layer, home_path: &Path) -> Result<(), CacheError> {
    std::os::unix::fs::symlink(layer.path(), home_path).map_err(|source| CacheError::Link {
        home: home_path.to_path_buf(),
        layer: layer.path().to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn link_home(layer: &Layer, home_path: &Path) -> Result<(), CacheError> {
    // Hosts without symlinks get a plain directory; it works, it just does
    // not persist through the layer.
    fs::create_dir_all(home_path).map_err(|source| CacheError::Link {
        home: home_path.to_path_buf(),
        layer: layer.path().to_path_buf(),
        source,
    })
}
