//! kilnbox - buildpack for Gradle and Maven applications
//!
//! Given an application source tree, kilnbox works out which build system
//! the tree uses, acquires a matching build tool, wires a dependency cache
//! that survives across builds, runs the build, and finally replaces the
//! source tree with the contents of the single built artifact. What remains
//! is the exploded application, ready to be layered into a container image.
//!
//! # Pipeline
//!
//! - [`buildsystem::detect`]: pure filesystem check for Gradle or Maven
//!   signals at the source root
//! - [`buildsystem::tool::ToolResolver`]: committed wrapper script first,
//!   provisioned distribution otherwise
//! - [`cache::DependencyCache`]: `~/.gradle` / `~/.m2` symlinked into a
//!   layer the host persists across builds
//! - [`runner::Runner`]: executes the build, gates on exactly one artifact,
//!   and materializes it over the source tree
//!
//! The stages are deliberately independent: each takes explicit inputs and
//! touches the filesystem through the layer handles in [`layers`], and the
//! CLI in [`cli`] is only thin wiring around them.

// Public modules
pub mod archive;
pub mod buildsystem;
pub mod cache;
pub mod cli;
pub mod config;
pub mod layers;
pub mod runner;
pub mod util;

// Re-export key types for convenient access
pub use buildsystem::tool::{Inventory, ToolOrigin, ToolReference, ToolRelease, ToolResolver};
pub use buildsystem::{detect, BuildSystemKind};
pub use cache::DependencyCache;
pub use config::BuildConfig;
pub use layers::{Layer, LayerFlags, LayerMetadata, Layers};
pub use runner::{Executor, HostExecutor, Runner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_kilnbox() {
        assert_eq!(NAME, "kilnbox");
    }
}
