//! Output formatting for multiple formats
//!
//! Run results, offline analysis reports, execution logs and tool checks can
//! be rendered as JSON, YAML or human-readable text. Command output goes to
//! stdout; tracing goes to stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::{DescriptorSource, ProjectDescriptor};
use crate::artifacts::{ArtifactKind, GenerationSource};
use crate::execution_log::{StepRecord, StepStatus};
use crate::pipeline::{PipelineResult, Recommendation};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Result of `deploybox analyze`
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub repository: String,
    pub revision: String,
    pub descriptor: ProjectDescriptor,
    pub descriptor_source: DescriptorSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub artifacts: Vec<ArtifactKind>,
    pub generation_source: GenerationSource,
    pub fixups_applied: Vec<&'static str>,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifact_locations: BTreeMap<ArtifactKind, String>,
}

/// Availability of one external tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    pub detail: String,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn serialize<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            OutputFormat::Json | OutputFormat::Human => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }

    pub fn format_result(&self, result: &PipelineResult) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_result_human(result)),
            _ => self.serialize(result, "pipeline result"),
        }
    }

    pub fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_analysis_human(report)),
            _ => self.serialize(report, "analysis report"),
        }
    }

    pub fn format_log(&self, records: &[StepRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_log_human(records)),
            _ => self.serialize(&records, "execution log"),
        }
    }

    pub fn format_health(&self, tools: &[ToolStatus]) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_health_human(tools)),
            _ => self.serialize(&tools, "tool status"),
        }
    }

    // Human-readable formatting methods

    fn format_result_human(&self, result: &PipelineResult) -> String {
        let mut output = String::new();

        if result.is_success() {
            output.push_str("\u{2713} Deployment Succeeded\n");
        } else {
            output.push_str("\u{2717} Deployment Failed\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Run:            {}\n", result.run_id));
        if let Some(image) = &result.image {
            output.push_str(&format!("Image:          {}\n", image));
        }
        if let Some(d) = &result.descriptor {
            output.push_str(&format!(
                "Project:        {}{} (port {}, tier {})\n",
                d.primary_language,
                d.primary_framework
                    .as_deref()
                    .map(|f| format!(" / {}", f))
                    .unwrap_or_default(),
                d.listen_port,
                d.resource_tier
            ));
            output.push_str(&format!("Confidence:     {}\n", d.confidence.as_str()));
        }
        output.push_str(&format!("Recommendation: {}\n", result.recommendation));

        if let Some(error) = &result.error {
            output.push_str(&format!(
                "\n\u{26A0} {} in step {}:\n  {}\n",
                error.kind, error.step, error.message
            ));
        }

        if !result.artifact_locations.is_empty() {
            output.push_str("\nArtifacts:\n");
            let count = result.artifact_locations.len();
            for (i, (kind, path)) in result.artifact_locations.iter().enumerate() {
                let connector = if i + 1 == count { "\u{2514}" } else { "\u{251C}" };
                output.push_str(&format!("{}\u{2500} {:<22} {}\n", connector, kind.as_str(), path));
            }
        }

        output.push_str(&format!(
            "\nExecution log: {} ({} records)\n",
            result.log_reference.location, result.log_reference.last_sequence
        ));
        if result.log_reference.unpersisted > 0 {
            output.push_str(&format!(
                "\u{26A0} {} log records were not persisted\n",
                result.log_reference.unpersisted
            ));
        }
        output
    }

    fn format_analysis_human(&self, report: &AnalysisReport) -> String {
        let d = &report.descriptor;
        let mut output = String::new();
        output.push_str(&format!("Project Analysis: {}@{}\n", report.repository, report.revision));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Language:       {}\n", d.primary_language));
        output.push_str(&format!(
            "Framework:      {}\n",
            d.primary_framework.as_deref().unwrap_or("(none)")
        ));
        output.push_str(&format!("Runtime:        {}\n", d.runtime_label));
        output.push_str(&format!("Port:           {}\n", d.listen_port));
        output.push_str(&format!(
            "Resources:      {} ({} CPU units, {} MiB)\n",
            d.resource_tier,
            d.resource_tier.cpu_units(),
            d.resource_tier.memory_mib()
        ));
        if let Some(db) = d.database_requirement {
            output.push_str(&format!("Database:       {}\n", db.as_str()));
        }
        output.push_str(&format!("Confidence:     {}\n", d.confidence.as_str()));
        output.push_str(&format!(
            "Descriptor:     {:?}\n",
            report.descriptor_source
        ));
        if let Some(note) = &report.note {
            output.push_str(&format!("Note:           {}\n", note));
        }

        output.push_str(&format!(
            "\nArtifacts ({:?}):\n",
            report.generation_source
        ));
        for kind in &report.artifacts {
            match report.artifact_locations.get(kind) {
                Some(path) => output.push_str(&format!("  - {:<22} {}\n", kind.as_str(), path)),
                None => output.push_str(&format!("  - {}\n", kind.as_str())),
            }
        }
        if !report.fixups_applied.is_empty() {
            output.push_str(&format!("Fix-ups:        {}\n", report.fixups_applied.join(", ")));
        }

        output.push_str(&format!("\nRecommendation: {}\n", report.recommendation));
        output
    }

    fn format_log_human(&self, records: &[StepRecord]) -> String {
        let mut output = String::new();
        for record in records {
            let marker = match record.status {
                StepStatus::Started => "\u{25B6}",
                StepStatus::Succeeded => "\u{2713}",
                StepStatus::Failed => "\u{2717}",
                StepStatus::Warning => "\u{26A0}",
                StepStatus::Info => "\u{2139}",
            };
            output.push_str(&format!(
                "{:>3} {} [{}] {} {:<18} {}\n",
                record.sequence,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.step_index,
                marker,
                record.label,
                record.message
            ));
        }
        output
    }

    fn format_health_human(&self, tools: &[ToolStatus]) -> String {
        let mut output = String::from("Tool Availability\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        for tool in tools {
            let marker = if tool.available { "\u{2713}" } else { "\u{2717}" };
            output.push_str(&format!("{} {:<8} {}\n", marker, tool.name, tool.detail));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(sequence: u64, status: StepStatus) -> StepRecord {
        StepRecord {
            run_id: "run-1".to_string(),
            sequence,
            step_index: 1,
            label: "Fetch".to_string(),
            status,
            message: "checked out".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_log_json_round_trip_fields() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let out = formatter
            .format_log(&[record(1, StepStatus::Started), record(2, StepStatus::Succeeded)])
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[1]["status"], "succeeded");
        assert_eq!(parsed[0]["sequence"], 1);
    }

    #[test]
    fn test_log_human_lists_every_record() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let out = formatter
            .format_log(&[record(1, StepStatus::Started), record(2, StepStatus::Failed)])
            .unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("\u{2717}"));
    }

    #[test]
    fn test_health_yaml() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let out = formatter
            .format_health(&[ToolStatus {
                name: "git".to_string(),
                available: true,
                detail: "git version 2.43.0".to_string(),
            }])
            .unwrap();
        assert!(out.contains("name: git"));
        assert!(out.contains("available: true"));
    }
}
