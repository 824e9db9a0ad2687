//! Output formatting for detection reports.
//!
//! `detect` talks to two audiences: humans running the binary by hand and
//! the host lifecycle consuming JSON or a build plan file. The formatter
//! keeps stdout parseable; everything diagnostic goes through logging on
//! stderr instead.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::buildsystem::BuildSystemKind;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// Human-readable text
    Human,
}

/// What `detect` learned about a source tree.
#[derive(Debug, Clone, Serialize)]
pub struct DetectReport {
    pub app_dir: PathBuf,
    pub build_system: Option<BuildSystemKind>,
}

impl DetectReport {
    pub fn new(app_dir: &Path, build_system: Option<BuildSystemKind>) -> Self {
        Self {
            app_dir: app_dir.to_path_buf(),
            build_system,
        }
    }

    pub fn passed(&self) -> bool {
        self.build_system.is_some()
    }

    /// Build plan naming the detected system: one empty TOML table, keyed by
    /// the build system name, for the host lifecycle to match on.
    pub fn plan_toml(&self) -> Option<String> {
        let kind = self.build_system?;
        let mut plan = toml::value::Table::new();
        plan.insert(
            kind.name().to_string(),
            toml::Value::Table(toml::value::Table::new()),
        );
        toml::to_string(&plan).ok()
    }
}

/// Output formatter for detection reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, report: &DetectReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(report),
            OutputFormat::Human => Ok(self.format_human(report)),
        }
    }

    fn format_json(&self, report: &DetectReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize detection report to JSON")
    }

    fn format_human(&self, report: &DetectReport) -> String {
        match report.build_system {
            Some(kind) => format!(
                "{} build system detected in {}",
                kind,
                report.app_dir.display()
            ),
            None => format!(
                "no supported build system detected in {}",
                report.app_dir.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(build_system: Option<BuildSystemKind>) -> DetectReport {
        DetectReport::new(Path::new("/workspace"), build_system)
    }

    #[test]
    fn test_plan_toml_names_the_system() {
        let plan = report(Some(BuildSystemKind::Gradle)).plan_toml().unwrap();
        assert_eq!(plan, "[gradle]\n");
        assert!(report(None).plan_toml().is_none());
    }

    #[test]
    fn test_json_report() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let rendered = formatter.format(&report(Some(BuildSystemKind::Maven))).unwrap();
        assert!(rendered.contains("\"build_system\": \"maven\""));
        assert!(rendered.contains("/workspace"));

        let empty = formatter.format(&report(None)).unwrap();
        assert!(empty.contains("\"build_system\": null"));
    }

    #[test]
    fn test_human_report() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        assert_eq!(
            formatter.format(&report(Some(BuildSystemKind::Gradle))).unwrap(),
            "gradle build system detected in /workspace"
        );
        assert_eq!(
            formatter.format(&report(None)).unwrap(),
            "no supported build system detected in /workspace"
        );
    }
}
