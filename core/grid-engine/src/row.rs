//! FILENAME: core/grid-engine/src/row.rs
//! PURPOSE: Row identity and the row record itself.
//! CONTEXT: A row is either already persisted (durable id handed out by the
//! persistence layer) or newly added in this session (temporary id handed out
//! by the row store). The two id spaces are separate enum variants so they
//! can never collide, whatever a durable id happens to look like.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Prefix used when a temporary id is rendered as text.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Identity rendered for the synthetic totals row.
pub const TOTALS_ROW_KEY: &str = "totals-placeholder";

/// Ordered field name -> value map. Insertion order is the record's key order.
pub type FieldMap = IndexMap<String, FieldValue>;

/// Identity of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowId {
    /// Assigned by the persistence layer, stable across sessions.
    Durable(String),
    /// Assigned by the row store for a row that has not been saved yet.
    Temporary(u64),
}

impl RowId {
    pub fn durable(id: impl Into<String>) -> Self {
        RowId::Durable(id.into())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, RowId::Temporary(_))
    }

    pub fn as_durable(&self) -> Option<&str> {
        match self {
            RowId::Durable(id) => Some(id),
            RowId::Temporary(_) => None,
        }
    }

    /// Reads an identity reported back by a cell editor as text.
    ///
    /// `temp-N` maps to a temporary id; any other non-blank text is durable.
    /// The totals row key names no row. A durable id that itself reads as
    /// `temp-N` is only recovered by `GridSession::resolve_row_key`, which
    /// knows the loaded rows.
    pub fn parse(text: &str) -> Option<RowId> {
        let text = text.trim();
        if text.is_empty() || text == TOTALS_ROW_KEY {
            return None;
        }
        if let Some(n) = text
            .strip_prefix(TEMP_ID_PREFIX)
            .and_then(|rest| rest.parse::<u64>().ok())
        {
            return Some(RowId::Temporary(n));
        }
        Some(RowId::Durable(text.to_string()))
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Durable(id) => write!(f, "{}", id),
            RowId::Temporary(n) => write!(f, "{}{}", TEMP_ID_PREFIX, n),
        }
    }
}

/// One row of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    pub fields: FieldMap,
}

impl Row {
    pub fn new(id: RowId, fields: FieldMap) -> Self {
        Row { id, fields }
    }

    /// Builds a row from a flat record.
    ///
    /// A non-blank value under `identity_field` becomes the durable id and is
    /// taken out of the field map. Records without one, or whose id is the
    /// reserved totals row key, get an id from `fallback`.
    pub fn from_record(
        mut record: FieldMap,
        identity_field: &str,
        fallback: impl FnOnce() -> RowId,
    ) -> Self {
        let id = match record.shift_remove(identity_field).and_then(|value| durable_text(&value)) {
            Some(id) => RowId::Durable(id),
            None => fallback(),
        };
        Row { id, fields: record }
    }

    /// Value of a field; absent fields read as `Empty`.
    pub fn get(&self, field: &str) -> &FieldValue {
        static EMPTY: FieldValue = FieldValue::Empty;
        self.fields.get(field).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// True when the row carries at least one field.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Durable id carried by an identity value, if it is usable as one.
pub(crate) fn durable_text(value: &FieldValue) -> Option<String> {
    if value.is_blank() {
        return None;
    }
    let text = value.display_text();
    (text != TOTALS_ROW_KEY).then_some(text)
}
