//! FILENAME: core/connector/src/bundle.rs
//! PURPOSE: Configuration bundles and their tolerant wire decoding.
//! CONTEXT: A fetch returns an array of bundles, one per active configuration.
//! Each one is decoded on its own: a bundle that does not match the expected
//! shape turns into an error bundle with no rows or mappings, and the bundles
//! around it still load. Mapping keys may carry the managed-package namespace
//! prefix (`JisrTest__Field_Label__c`) or not (`Field_Label__c`).

use grid_engine::{FieldMap, FieldMapping, FieldValue, ReportKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SourceError;

// ============================================================================
// DECODED BUNDLE
// ============================================================================

/// One configuration with its data rows and field mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBundle {
    pub config_id: String,
    pub display_name: String,
    #[serde(default)]
    pub connection_name: Option<String>,
    #[serde(default)]
    pub rows: Vec<FieldMap>,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    /// Set when the server reported a failure for this configuration or the
    /// bundle could not be decoded.
    #[serde(default)]
    pub error: Option<String>,
}

impl ConfigBundle {
    pub fn failed(config_id: impl Into<String>, error: impl Into<String>) -> Self {
        let config_id = config_id.into();
        ConfigBundle {
            display_name: default_display_name(&config_id),
            config_id,
            connection_name: None,
            rows: Vec::new(),
            mappings: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn default_display_name(config_id: &str) -> String {
    format!("Config {}", config_id)
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBundle {
    #[serde(default)]
    config_id: Option<Value>,
    #[serde(default)]
    config_name: Option<String>,
    #[serde(default)]
    connection_name: Option<String>,
    #[serde(default)]
    data: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    mapping_fields: Option<Vec<WireMapping>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMapping {
    #[serde(rename = "Field_JSON_Path__c", alias = "JisrTest__Field_JSON_Path__c", default)]
    path: Option<String>,
    #[serde(rename = "Field_Label__c", alias = "JisrTest__Field_Label__c", default)]
    label: Option<String>,
    #[serde(rename = "Report_Type__c", alias = "JisrTest__Report_Type__c", default)]
    report_type: Option<String>,
}

impl WireMapping {
    /// Mappings without a label have no column to feed and are dropped.
    fn into_mapping(self) -> Option<FieldMapping> {
        let label = self.label.unwrap_or_default();
        if label.trim().is_empty() {
            return None;
        }
        Some(FieldMapping::new(
            self.path.unwrap_or_default(),
            label,
            ReportKind::from_picklist(self.report_type.as_deref().unwrap_or("")),
        ))
    }
}

/// Scalar JSON becomes the matching field value; nested values are kept as
/// their JSON text.
pub fn field_value_from_json(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Empty,
        Value::Bool(b) => FieldValue::Boolean(b),
        Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Number)
            .unwrap_or_else(|| FieldValue::Text(n.to_string())),
        Value::String(s) => FieldValue::Text(s),
        other => FieldValue::Text(other.to_string()),
    }
}

fn record_from_json(object: Map<String, Value>) -> FieldMap {
    object
        .into_iter()
        .map(|(key, value)| (key, field_value_from_json(value)))
        .collect()
}

fn id_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Decodes one bundle. Never fails: problems become an error bundle.
/// `position` names bundles that carry no id of their own.
pub fn decode_bundle(raw: Value, position: usize) -> ConfigBundle {
    let fallback_id = id_text(raw.get("configId")).unwrap_or_else(|| format!("#{}", position));

    let wire: WireBundle = match serde_json::from_value(raw) {
        Ok(wire) => wire,
        Err(e) => {
            return ConfigBundle::failed(fallback_id, format!("Malformed configuration bundle: {}", e));
        }
    };

    let config_id = id_text(wire.config_id.as_ref()).unwrap_or(fallback_id);
    let display_name = wire
        .config_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default_display_name(&config_id));

    ConfigBundle {
        display_name,
        connection_name: wire.connection_name,
        rows: wire
            .data
            .unwrap_or_default()
            .into_iter()
            .map(record_from_json)
            .collect(),
        mappings: wire
            .mapping_fields
            .unwrap_or_default()
            .into_iter()
            .filter_map(WireMapping::into_mapping)
            .collect(),
        error: wire.error.filter(|e| !e.trim().is_empty()),
        config_id,
    }
}

/// Decodes a response body. Only a body that is not an array (or a single
/// bundle object) is an error; individual bundles never fail the batch.
pub fn decode_bundles(body: Value) -> Result<Vec<ConfigBundle>, SourceError> {
    match body {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| decode_bundle(item, i))
            .collect()),
        Value::Object(_) => Ok(vec![decode_bundle(body, 0)]),
        other => Err(SourceError::Malformed(format!(
            "expected an array of configuration bundles, got {}",
            json_kind(&other)
        ))),
    }
}

pub fn decode_bundles_str(text: &str) -> Result<Vec<ConfigBundle>, SourceError> {
    let body: Value = serde_json::from_str(text)?;
    decode_bundles(body)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
