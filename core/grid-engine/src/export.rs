//! FILENAME: core/grid-engine/src/export.rs
//! PURPOSE: Turns rows plus pending drafts into the payload handed to persistence.
//! CONTEXT: Rows the user added but never filled are dropped, internal-only
//! fields are stripped, and identity decides create vs update: temporary rows
//! go out without an identity field, durable rows keep theirs unchanged.

use serde::{Deserialize, Serialize};

use crate::draft::DraftOverlay;
use crate::row::{FieldMap, Row, RowId};
use crate::value::FieldValue;

/// Shape of the exported records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Field name the durable id is written under
    pub identity_field: String,
    /// Fields never exported (editor bookkeeping)
    pub internal_fields: Vec<String>,
    /// Fields checked by the empty-row filter. Empty means every field of the row.
    pub tracked_fields: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            identity_field: "Id".to_string(),
            internal_fields: vec!["tempId".to_string(), "picklistOptions".to_string()],
            tracked_fields: Vec::new(),
        }
    }
}

/// Records to create or update, plus durable ids to delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub records: Vec<FieldMap>,
    pub deleted_ids: Vec<String>,
}

impl ExportPayload {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.deleted_ids.is_empty()
    }
}

/// True when every tracked field of the row is blank.
pub fn is_empty_row(row: &Row, tracked_fields: &[String]) -> bool {
    if tracked_fields.is_empty() {
        row.fields.values().all(FieldValue::is_blank)
    } else {
        tracked_fields.iter().all(|field| row.get(field).is_blank())
    }
}

/// Flat record for one row, identity first when durable.
pub fn export_record(row: &Row, options: &ExportOptions) -> FieldMap {
    let mut record = FieldMap::new();
    if let RowId::Durable(id) = &row.id {
        record.insert(options.identity_field.clone(), FieldValue::text(id.clone()));
    }
    for (field, value) in &row.fields {
        if field == &options.identity_field || options.internal_fields.contains(field) {
            continue;
        }
        record.insert(field.clone(), value.clone());
    }
    record
}

/// Merges drafts into `rows`, drops empty rows and shapes the payload.
/// Pure: the same inputs always give the same payload.
pub fn prepare_export(
    rows: &[Row],
    drafts: &DraftOverlay,
    deleted_ids: &[String],
    options: &ExportOptions,
) -> ExportPayload {
    let records = drafts
        .merge_into(rows)
        .iter()
        .filter(|row| !is_empty_row(row, &options.tracked_fields))
        .map(|row| export_record(row, options))
        .collect();

    ExportPayload {
        records,
        deleted_ids: deleted_ids.to_vec(),
    }
}
