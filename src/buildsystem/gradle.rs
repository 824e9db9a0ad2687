//! Gradle specifics: markers, defaults and version inference.

use super::{lenient_version, tool::DistArchive, tool::ToolRelease};
use regex::Regex;
use semver::{Version, VersionReq};
use std::fs;
use std::path::Path;

pub const WRAPPER: &str = "gradlew";

pub const MARKERS: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
];

/// `build` with tests excluded; container image builds are not the place to
/// run a test suite.
pub const DEFAULT_ARGUMENTS: &[&str] = &["-x", "test", "build"];

pub const DEFAULT_ARTIFACT_GLOB: &str = "build/libs/*.jar";

pub const CACHE_HOME: &str = ".gradle";

/// Wrapper distribution pin, relative to the source root.
pub const WRAPPER_PROPERTIES: &str = "gradle/wrapper/gradle-wrapper.properties";

/// Distributions the resolver may provision, checksums unpinned. The
/// download is still refused on a non-success response; operators who want
/// integrity pinning can carry their own inventory.
pub fn releases() -> Vec<ToolRelease> {
    vec![
        ToolRelease::new(
            Version::new(8, 7, 0),
            "https://services.gradle.org/distributions/gradle-8.7-bin.zip",
            DistArchive::Zip,
        ),
        ToolRelease::new(
            Version::new(8, 5, 0),
            "https://services.gradle.org/distributions/gradle-8.5-bin.zip",
            DistArchive::Zip,
        ),
        ToolRelease::new(
            Version::new(7, 6, 4),
            "https://services.gradle.org/distributions/gradle-7.6.4-bin.zip",
            DistArchive::Zip,
        ),
    ]
}

/// The Gradle version the tree pins through its wrapper properties, when
/// that file exists and names a recognizable distribution.
pub fn wrapper_version(app_dir: &Path) -> Option<Version> {
    let properties = fs::read_to_string(app_dir.join(WRAPPER_PROPERTIES)).ok()?;
    distribution_version(&properties)
}

/// Minimum version a provisioned Gradle must satisfy. Trees without a
/// wrapper pin accept any release.
pub fn declared_requirement(app_dir: &Path) -> Option<VersionReq> {
    let version = wrapper_version(app_dir)?;
    VersionReq::parse(&format!(">={}", version)).ok()
}

fn distribution_version(properties: &str) -> Option<Version> {
    let pattern = Regex::new(r"gradle-(\d+(?:\.\d+)*)-(?:bin|all)\.zip").ok()?;
    let line = properties
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("distributionUrl"))?;
    let captures = pattern.captures(line)?;
    lenient_version(captures.get(1)?.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_distribution_version_bin() {
        let properties = "distributionBase=GRADLE_USER_HOME\n\
                          distributionUrl=https\\://services.gradle.org/distributions/gradle-8.5-bin.zip\n\
                          zipStoreBase=GRADLE_USER_HOME\n";
        assert_eq!(
            distribution_version(properties),
            Some(Version::new(8, 5, 0))
        );
    }

    #[test]
    fn test_distribution_version_all_flavor() {
        let properties =
            "distributionUrl=https\\://services.gradle.org/distributions/gradle-7.6.4-all.zip\n";
        assert_eq!(
            distribution_version(properties),
            Some(Version::new(7, 6, 4))
        );
    }

    #[test]
    fn test_distribution_version_absent() {
        assert_eq!(distribution_version("distributionBase=GRADLE_USER_HOME\n"), None);
        assert_eq!(
            distribution_version("distributionUrl=https\\://example.com/custom-dist.zip\n"),
            None
        );
    }

    #[test]
    fn test_declared_requirement_from_tree() {
        let temp = TempDir::new().unwrap();
        let wrapper_dir = temp.path().join("gradle/wrapper");
        std::fs::create_dir_all(&wrapper_dir).unwrap();
        std::fs::write(
            wrapper_dir.join("gradle-wrapper.properties"),
            "distributionUrl=https\\://services.gradle.org/distributions/gradle-8.5-bin.zip\n",
        )
        .unwrap();

        let requirement = declared_requirement(temp.path()).unwrap();
        assert!(requirement.matches(&Version::new(8, 5, 0)));
        assert!(requirement.matches(&Version::new(8, 7, 0)));
        assert!(!requirement.matches(&Version::new(7, 6, 4)));
    }

    #[test]
    fn test_declared_requirement_without_properties() {
        let temp = TempDir::new().unwrap();
        assert!(declared_requirement(temp.path()).is_none());
    }
}
