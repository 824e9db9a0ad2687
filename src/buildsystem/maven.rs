//! Maven specifics: markers, defaults and version inference.

use super::{lenient_version, tool::DistArchive, tool::ToolRelease};
use regex::Regex;
use semver::{Version, VersionReq};
use std::fs;
use std::path::Path;

pub const WRAPPER: &str = "mvnw";

pub const MARKERS: &[&str] = &["pom.xml"];

/// `package` with tests skipped, matching what CI images conventionally run.
pub const DEFAULT_ARGUMENTS: &[&str] = &["-Dmaven.test.skip=true", "package"];

pub const DEFAULT_ARTIFACT_GLOB: &str = "target/*.jar";

pub const CACHE_HOME: &str = ".m2";

/// Wrapper distribution pin, relative to the source root.
pub const WRAPPER_PROPERTIES: &str = ".mvn/wrapper/maven-wrapper.properties";

/// Distributions the resolver may provision, checksums unpinned.
pub fn releases() -> Vec<ToolRelease> {
    vec![
        ToolRelease::new(
            Version::new(3, 9, 6),
            "https://archive.apache.org/dist/maven/maven-3/3.9.6/binaries/apache-maven-3.9.6-bin.tar.gz",
            DistArchive::TarGz,
        ),
        ToolRelease::new(
            Version::new(3, 8, 8),
            "https://archive.apache.org/dist/maven/maven-3/3.8.8/binaries/apache-maven-3.8.8-bin.tar.gz",
            DistArchive::TarGz,
        ),
    ]
}

/// The Maven version the tree pins through its wrapper properties, when that
/// file exists and names a recognizable distribution.
pub fn wrapper_version(app_dir: &Path) -> Option<Version> {
    let properties = fs::read_to_string(app_dir.join(WRAPPER_PROPERTIES)).ok()?;
    distribution_version(&properties)
}

/// Minimum version a provisioned Maven must satisfy, taken from the pom's
/// `<prerequisites><maven>` element. Projects without one accept any
/// release.
pub fn declared_requirement(app_dir: &Path) -> Option<VersionReq> {
    let pom = fs::read_to_string(app_dir.join("pom.xml")).ok()?;
    let minimum = prerequisites_minimum(&pom)?;
    VersionReq::parse(&format!(">={}", minimum)).ok()
}

fn prerequisites_minimum(pom: &str) -> Option<Version> {
    let doc = roxmltree::Document::parse(pom).ok()?;
    doc.descendants()
        .find(|node| node.has_tag_name("prerequisites"))?
        .children()
        .find(|node| node.has_tag_name("maven"))
        .and_then(|node| node.text())
        .and_then(lenient_version)
}

fn distribution_version(properties: &str) -> Option<Version> {
    let pattern = Regex::new(r"apache-maven-(\d+(?:\.\d+)*)-bin").ok()?;
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

    const POM_WITH_PREREQUISITES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>com.example</groupId>
    <artifactId>demo</artifactId>
    <version>0.0.1-SNAPSHOT</version>
    <prerequisites>
        <maven>3.9</maven>
    </prerequisites>
</project>
"#;

    #[test]
    fn test_prerequisites_minimum() {
        assert_eq!(
            prerequisites_minimum(POM_WITH_PREREQUISITES),
            Some(Version::new(3, 9, 0))
        );
    }

    #[test]
    fn test_prerequisites_absent() {
        let pom = r#"<project><artifactId>demo</artifactId></project>"#;
        assert_eq!(prerequisites_minimum(pom), None);
    }

    #[test]
    fn test_prerequisites_in_malformed_pom() {
        assert_eq!(prerequisites_minimum("<project><prerequisites>"), None);
    }

    #[test]
    fn test_declared_requirement_from_tree() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("pom.xml"), POM_WITH_PREREQUISITES).unwrap();

        let requirement = declared_requirement(temp.path()).unwrap();
        assert!(requirement.matches(&Version::new(3, 9, 6)));
        assert!(!requirement.matches(&Version::new(3, 8, 8)));
    }

    #[test]
    fn test_wrapper_version_from_properties() {
        let temp = TempDir::new().unwrap();
        let wrapper_dir = temp.path().join(".mvn/wrapper");
        std::fs::create_dir_all(&wrapper_dir).unwrap();
        std::fs::write(
            wrapper_dir.join("maven-wrapper.properties"),
            "distributionUrl=https://repo.maven.apache.org/maven2/org/apache/maven/apache-maven/3.9.6/apache-maven-3.9.6-bin.zip\n",
        )
        .unwrap();

        assert_eq!(wrapper_version(temp.path()), Some(Version::new(3, 9, 6)));
    }
}
