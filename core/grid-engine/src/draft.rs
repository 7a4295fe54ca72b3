//! FILENAME: core/grid-engine/src/draft.rs
//! PURPOSE: Pending per-cell edits kept apart from the row store.
//! CONTEXT: Edits are recorded field by field. A second edit to the same row
//! only overwrites the fields it names, so an edit to field A never erases a
//! pending edit to field B. Drafts are folded into a copy of the rows on
//! demand; committing the merged rows is the caller's decision.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::row::{FieldMap, Row, RowId};
use crate::value::FieldValue;

/// A single cell edit reported by an editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommand {
    pub identity: RowId,
    pub field: String,
    pub value: FieldValue,
}

impl EditCommand {
    pub fn new(identity: RowId, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        EditCommand {
            identity,
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Uncommitted partial row: the fields edited so far for one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEntry {
    pub identity: RowId,
    pub fields: FieldMap,
}

impl DraftEntry {
    pub fn new(identity: RowId) -> Self {
        DraftEntry {
            identity,
            fields: FieldMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}

/// Draft entries in arrival order, at most one per identity.
#[derive(Debug, Clone, Default)]
pub struct DraftOverlay {
    entries: Vec<DraftEntry>,
    index: FxHashMap<RowId, usize>,
}

impl DraftOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field of the identity's draft, creating the draft if needed.
    pub fn record_edit(&mut self, command: EditCommand) {
        let entry = self.entry_mut(command.identity);
        entry.fields.insert(command.field, command.value);
    }

    /// Folds a batch of partial rows into the overlay, field by field.
    pub fn record_entries(&mut self, entries: impl IntoIterator<Item = DraftEntry>) {
        for incoming in entries {
            let entry = self.entry_mut(incoming.identity);
            for (field, value) in incoming.fields {
                entry.fields.insert(field, value);
            }
        }
    }

    /// Returns a copy of `rows` with every matching draft applied. Rows without
    /// drafts pass through unchanged; the input is not touched.
    pub fn merge_into(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter()
            .map(|row| {
                let mut merged = row.clone();
                for entry in self.entries_for(&row.id) {
                    for (field, value) in &entry.fields {
                        merged.fields.insert(field.clone(), value.clone());
                    }
                }
                merged
            })
            .collect()
    }

    /// Drafts for `identity`, in arrival order.
    pub fn entries_for<'a>(&'a self, identity: &'a RowId) -> impl Iterator<Item = &'a DraftEntry> + 'a {
        self.entries.iter().filter(move |entry| &entry.identity == identity)
    }

    pub fn get(&self, identity: &RowId) -> Option<&DraftEntry> {
        self.index.get(identity).map(|&i| &self.entries[i])
    }

    /// Drafts whose identity matches none of `rows`. They are kept until a
    /// matching row shows up or the overlay is cleared.
    pub fn orphans<'a>(&'a self, rows: &[Row]) -> Vec<&'a DraftEntry> {
        self.entries
            .iter()
            .filter(|entry| !rows.iter().any(|row| row.id == entry.identity))
            .collect()
    }

    /// Moves the draft of a row that was just promoted to a durable id.
    pub fn rekey(&mut self, from: &RowId, to: RowId) {
        let Some(i) = self.index.remove(from) else {
            return;
        };
        let moved = self.entries.remove(i);
        self.reindex();
        let entry = self.entry_mut(to);
        for (field, value) in moved.fields {
            entry.fields.insert(field, value);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn entries(&self) -> &[DraftEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, identity: RowId) -> &mut DraftEntry {
        let i = match self.index.get(&identity) {
            Some(&i) => i,
            None => {
                self.entries.push(DraftEntry::new(identity.clone()));
                let i = self.entries.len() - 1;
                self.index.insert(identity, i);
                i
            }
        };
        &mut self.entries[i]
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.identity.clone(), i))
            .collect();
    }
}
