//! FILENAME: app/backend/src/settings.rs
// PURPOSE: Application settings loaded from a JSON file.
// CONTEXT: Every field has a default, so a partial file (or none) is valid.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use connector::{ConfigSource, FileConfigSource, HttpConfigSource, StaticConfigSource};
use grid_engine::{
    ChartStyle, DraftRetention, ExportOptions, PicklistOption, ReportKind, SessionOptions,
    TotalsLabels,
};
use serde::{Deserialize, Serialize};

/// Where configuration bundles are fetched from. Endpoint wins over file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceSettings {
    pub endpoint: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Record the viewers and reports are bound to
    pub owner_id: String,
    pub labels: TotalsLabels,
    pub export: ExportOptions,
    pub draft_retention: DraftRetention,
    /// Options of the mapping editor's report-type picklist
    pub report_type_options: Vec<PicklistOption>,
    /// Permission to show/hide viewer columns
    pub allow_column_toggle: bool,
    pub source: SourceSettings,
    pub chart_id_prefix: String,
    pub log_file: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            owner_id: String::new(),
            labels: TotalsLabels::default(),
            export: ExportOptions::default(),
            draft_retention: DraftRetention::default(),
            report_type_options: default_report_type_options(),
            allow_column_toggle: true,
            source: SourceSettings::default(),
            chart_id_prefix: "chart".to_string(),
            log_file: None,
        }
    }
}

fn default_report_type_options() -> Vec<PicklistOption> {
    [
        ReportKind::Sum,
        ReportKind::Average,
        ReportKind::GroupBy(ChartStyle::Bar),
        ReportKind::GroupBy(ChartStyle::Donut),
    ]
    .iter()
    .map(|kind| PicklistOption {
        label: kind.picklist_value().to_string(),
        value: kind.picklist_value().to_string(),
    })
    .collect()
}

impl AppSettings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            labels: self.labels.clone(),
            export: self.export.clone(),
            draft_retention: self.draft_retention,
        }
    }

    /// Builds the configured bundle source. With neither an endpoint nor a
    /// file configured, an empty in-memory source is used.
    pub fn build_source(&self) -> Result<Arc<dyn ConfigSource>, String> {
        if let Some(endpoint) = self.source.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            let source = HttpConfigSource::new(endpoint).map_err(|e| e.to_string())?;
            return Ok(Arc::new(source));
        }
        if let Some(file) = &self.source.file {
            return Ok(Arc::new(FileConfigSource::new(file.clone())));
        }
        Ok(Arc::new(StaticConfigSource::default()))
    }
}

/// Reads settings. A missing file gives the defaults; an unreadable or
/// invalid one is an error.
pub fn load_settings(path: &Path) -> Result<AppSettings, String> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings {:?}: {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid settings {:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings(Path::new("/no/such/settings.json")).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.report_type_options.len(), 4);
        assert_eq!(settings.labels.marker, "Totals");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ownerId":"001","allowColumnToggle":false,"labels":{{"marker":"Total"}}}}"#).unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.owner_id, "001");
        assert!(!settings.allow_column_toggle);
        assert_eq!(settings.labels.marker, "Total");
        assert_eq!(settings.labels.sum, "Sum");
        assert_eq!(settings.export.identity_field, "Id");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();
        assert!(load_settings(file.path()).unwrap_err().starts_with("Invalid settings"));
    }
}
