//! FILENAME: core/grid-engine/src/columns.rs
//! PURPOSE: Full column set, visible subset, and the display projection.
//! CONTEXT: Columns come from declared mappings and from the keys of the
//! first row that has fields. Inference only looks at that one row: keys that
//! first appear in later rows do not become columns.

use serde::{Deserialize, Serialize};

use crate::aggregate::TotalsRow;
use crate::mapping::{FieldMapping, ReportKind};
use crate::row::{Row, TOTALS_ROW_KEY};

/// Row-identity key an embedded cell editor reports back with.
pub const ROW_CORRELATION_KEY: &str = "tempId";

// ============================================================================
// COLUMN
// ============================================================================

/// One selectable option of a picklist cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicklistOption {
    pub label: String,
    pub value: String,
}

/// How a cell of the column should be rendered and edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RenderHint {
    Text { editable: bool },
    Picklist { options: Vec<PicklistOption> },
    /// Per-row action button (e.g. delete); carries no field value.
    RowAction { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub label: String,
    pub field: String,
    pub visible: bool,
    #[serde(default)]
    pub report_kind: ReportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<RenderHint>,
    /// Set on mapping-driven columns so a cell editor can say which row it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_key: Option<String>,
}

impl Column {
    pub fn new(label: impl Into<String>, field: impl Into<String>) -> Self {
        Column {
            label: label.into(),
            field: field.into(),
            visible: true,
            report_kind: ReportKind::None,
            hint: None,
            correlation_key: None,
        }
    }

    pub fn with_hint(mut self, hint: RenderHint) -> Self {
        self.hint = Some(hint);
        self
    }

    fn from_mapping(mapping: &FieldMapping) -> Self {
        Column {
            label: mapping.label.clone(),
            field: mapping.field.clone(),
            visible: true,
            report_kind: mapping.report_kind,
            hint: None,
            correlation_key: Some(ROW_CORRELATION_KEY.to_string()),
        }
    }

    /// Action columns render per-row buttons and hold no data.
    pub fn is_action(&self) -> bool {
        matches!(self.hint, Some(RenderHint::RowAction { .. }))
    }
}

// ============================================================================
// DISPLAY PROJECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayCell {
    pub key: String,
    pub value: String,
}

/// A row as rendered: one cell per visible column, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub key: String,
    pub cells: Vec<DisplayCell>,
    pub is_totals: bool,
}

impl DisplayRow {
    pub fn value(&self, field: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|cell| cell.key == field)
            .map(|cell| cell.value.as_str())
    }
}

// ============================================================================
// PROJECTION
// ============================================================================

/// Full column list plus the visible subsequence.
#[derive(Debug, Clone, Default)]
pub struct ColumnProjection {
    columns: Vec<Column>,
    /// Indices into `columns` of the visible ones, ascending.
    visible: Vec<usize>,
}

impl ColumnProjection {
    /// Wraps an explicit column list (e.g. a fixed editor layout).
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut projection = ColumnProjection {
            columns,
            visible: Vec::new(),
        };
        projection.recompute_visible();
        projection
    }

    /// One column per mapping, in mapping order.
    pub fn from_mappings(mappings: &[FieldMapping]) -> Self {
        Self::from_columns(mappings.iter().map(Column::from_mapping).collect())
    }

    /// Keys of the first row that has any field, in that row's key order.
    pub fn from_sample(rows: &[Row]) -> Self {
        let columns = rows
            .iter()
            .find(|row| row.has_fields())
            .map(|row| {
                row.fields
                    .keys()
                    .map(|key| Column::new(key.clone(), key.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self::from_columns(columns)
    }

    /// Schema-or-infer: a declared mapping is authoritative for its field,
    /// the sample row supplies order and the unmapped columns, and mapped
    /// fields the sample lacks are appended in mapping order.
    pub fn derive(mappings: &[FieldMapping], rows: &[Row]) -> Self {
        let Some(sample) = rows.iter().find(|row| row.has_fields()) else {
            return Self::from_mappings(mappings);
        };

        let mut columns: Vec<Column> = sample
            .fields
            .keys()
            .map(|key| match mappings.iter().find(|m| &m.field == key) {
                Some(mapping) => Column::from_mapping(mapping),
                None => Column::new(key.clone(), key.clone()),
            })
            .collect();
        for mapping in mappings {
            if !columns.iter().any(|c| c.field == mapping.field) {
                columns.push(Column::from_mapping(mapping));
            }
        }
        Self::from_columns(columns)
    }

    /// Shows or hides a column. Returns true when the visible set changed.
    pub fn set_visibility(&mut self, field: &str, visible: bool) -> bool {
        let Some(column) = self.columns.iter_mut().find(|c| c.field == field) else {
            return false;
        };
        if column.visible == visible {
            return false;
        }
        column.visible = visible;
        self.recompute_visible();
        true
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.visible.iter().map(move |&i| &self.columns[i])
    }

    pub fn visible_fields(&self) -> Vec<&str> {
        self.visible_columns().map(|c| c.field.as_str()).collect()
    }

    pub fn first_field(&self) -> Option<&str> {
        self.columns.first().map(|c| c.field.as_str())
    }

    /// Data-carrying fields of the full set (action columns excluded).
    pub fn data_fields(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.is_action())
            .map(|c| c.field.as_str())
            .collect()
    }

    /// Builds display rows for the visible columns, totals row last.
    pub fn project(&self, rows: &[Row], totals: Option<&TotalsRow>) -> Vec<DisplayRow> {
        let visible: Vec<&Column> = self.visible_columns().filter(|c| !c.is_action()).collect();

        let mut display: Vec<DisplayRow> = rows
            .iter()
            .map(|row| DisplayRow {
                key: row.id.to_string(),
                cells: visible
                    .iter()
                    .map(|col| DisplayCell {
                        key: col.field.clone(),
                        value: row.get(&col.field).display_text(),
                    })
                    .collect(),
                is_totals: false,
            })
            .collect();

        if let Some(totals) = totals {
            display.push(DisplayRow {
                key: TOTALS_ROW_KEY.to_string(),
                cells: visible
                    .iter()
                    .map(|col| DisplayCell {
                        key: col.field.clone(),
                        value: totals.get(&col.field).to_string(),
                    })
                    .collect(),
                is_totals: true,
            });
        }

        display
    }

    fn recompute_visible(&mut self) {
        self.visible = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible)
            .map(|(i, _)| i)
            .collect();
    }
}
