//! FILENAME: core/grid-engine/src/mapping.rs
//! PURPOSE: Field mappings and the report behavior declared for each field.
//! CONTEXT: Mappings come from configuration. They name the record key a
//! column reads, its display label, the JSON path it was extracted from, and
//! whether the field is summed, averaged or grouped for charting.

use serde::{Deserialize, Serialize};

// ============================================================================
// REPORT KIND
// ============================================================================

/// Visualization used for a grouped-count field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartStyle {
    Bar,
    Donut,
}

/// Aggregation or grouping declared for a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    /// Displayed only
    None,
    /// Summed into the totals row
    Sum,
    /// Averaged into the totals row
    Average,
    /// Counted per distinct value for a chart
    GroupBy(ChartStyle),
}

impl Default for ReportKind {
    fn default() -> Self {
        ReportKind::None
    }
}

impl ReportKind {
    /// Reads a report-type picklist value (`SUM`, `Average`,
    /// `Group By - Bar`, `Group By - donut`). Unknown or empty values are
    /// `None`.
    pub fn from_picklist(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "sum" => ReportKind::Sum,
            "average" | "avg" => ReportKind::Average,
            "group by - bar" => ReportKind::GroupBy(ChartStyle::Bar),
            "group by - donut" => ReportKind::GroupBy(ChartStyle::Donut),
            _ => ReportKind::None,
        }
    }

    /// Canonical picklist value, the inverse of `from_picklist`.
    pub fn picklist_value(&self) -> &'static str {
        match self {
            ReportKind::None => "",
            ReportKind::Sum => "SUM",
            ReportKind::Average => "Average",
            ReportKind::GroupBy(ChartStyle::Bar) => "Group By - Bar",
            ReportKind::GroupBy(ChartStyle::Donut) => "Group By - donut",
        }
    }

    /// True for kinds that contribute to the totals row.
    pub fn is_totaled(&self) -> bool {
        matches!(self, ReportKind::Sum | ReportKind::Average)
    }
}

// ============================================================================
// FIELD MAPPING
// ============================================================================

/// One configured column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Key under which the value appears in row records
    pub field: String,
    /// Display label
    pub label: String,
    /// Path the value was extracted from in the external payload
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub report_kind: ReportKind,
}

impl FieldMapping {
    /// Mapping whose records are keyed by the display label, which is how the
    /// external integration shapes its rows.
    pub fn new(source_path: impl Into<String>, label: impl Into<String>, report_kind: ReportKind) -> Self {
        let label = label.into();
        FieldMapping {
            field: label.clone(),
            label,
            source_path: source_path.into(),
            report_kind,
        }
    }

    /// Overrides the record key, for records keyed by something other than
    /// the label (e.g. API field names).
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}
