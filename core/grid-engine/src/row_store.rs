//! FILENAME: core/grid-engine/src/row_store.rs
//! PURPOSE: Owns the canonical ordered sequence of rows.
//! CONTEXT: Rows are either seeded from the external source (`replace_all`)
//! or appended by the user (`add_row`). Deleting a persisted row records its
//! durable id so the save step can hand it to the persistence layer.

use rustc_hash::FxHashSet;

use crate::row::{FieldMap, Row, RowId};

/// The ordered row set of one grid.
#[derive(Debug, Clone)]
pub struct RowStore {
    rows: Vec<Row>,
    /// Next temporary id to hand out. Only ever grows.
    next_temp_id: u64,
    /// Durable ids of deleted rows, in deletion order, without duplicates.
    pending_deletes: Vec<String>,
    /// Bumped on every mutation of the row sequence.
    generation: u64,
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RowStore {
    pub fn new() -> Self {
        RowStore {
            rows: Vec::new(),
            next_temp_id: 1,
            pending_deletes: Vec::new(),
            generation: 0,
        }
    }

    /// Issues a fresh temporary id without adding a row.
    /// Numbers whose text matches a durable id in the store are skipped.
    pub fn issue_temp_id(&mut self) -> RowId {
        let durable: FxHashSet<String> = self
            .rows
            .iter()
            .filter_map(|row| row.id.as_durable().map(str::to_string))
            .collect();
        self.issue_temp_id_avoiding(&durable)
    }

    /// Issues a fresh temporary id whose text is not in `durable_ids`.
    /// Used when seeding records before they are in the store.
    pub fn issue_temp_id_avoiding(&mut self, durable_ids: &FxHashSet<String>) -> RowId {
        loop {
            let id = RowId::Temporary(self.next_temp_id);
            self.next_temp_id += 1;
            if !durable_ids.contains(&id.to_string()) {
                return id;
            }
        }
    }

    /// Appends a new row with a fresh temporary id and returns that id.
    pub fn add_row(&mut self, defaults: FieldMap) -> RowId {
        let id = self.issue_temp_id();
        self.rows.push(Row::new(id.clone(), defaults));
        self.generation += 1;
        id
    }

    /// Removes the row with `id`. Durable ids are queued for deletion.
    /// Returns false (and changes nothing) when no such row exists.
    pub fn delete_row(&mut self, id: &RowId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let removed = self.rows.remove(index);
        if let RowId::Durable(durable) = removed.id {
            if !self.pending_deletes.contains(&durable) {
                self.pending_deletes.push(durable);
            }
        }
        self.generation += 1;
        true
    }

    /// Current ordered rows.
    pub fn snapshot(&self) -> &[Row] {
        &self.rows
    }

    /// Seeds the store from a load. Pending deletions belong to the previous
    /// dataset and are dropped. The temporary counter moves past any temporary
    /// id present in `rows` so later `add_row` calls cannot duplicate them.
    pub fn replace_all(&mut self, rows: Vec<Row>) {
        let max_temp = rows
            .iter()
            .filter_map(|row| match row.id {
                RowId::Temporary(n) => Some(n),
                RowId::Durable(_) => None,
            })
            .max();
        if let Some(max_temp) = max_temp {
            self.next_temp_id = self.next_temp_id.max(max_temp + 1);
        }
        self.rows = rows;
        self.pending_deletes.clear();
        self.generation += 1;
    }

    /// Replaces the row sequence with a merged result of the same rows
    /// (after folding drafts in). Deletions and the id counter are kept.
    pub fn commit(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.generation += 1;
    }

    /// Turns a temporary id into the durable id the persistence layer
    /// assigned on save. Returns false when `temp` is not a live temporary row.
    pub fn promote(&mut self, temp: &RowId, durable: impl Into<String>) -> bool {
        if !temp.is_temporary() {
            return false;
        }
        match self.rows.iter_mut().find(|row| &row.id == temp) {
            Some(row) => {
                row.id = RowId::Durable(durable.into());
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    pub fn pending_deletes(&self) -> &[String] {
        &self.pending_deletes
    }

    /// Forgets queued deletions once the persistence layer has applied them.
    pub fn clear_pending_deletes(&mut self) {
        self.pending_deletes.clear();
    }

    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.rows.iter().find(|row| &row.id == id)
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn position(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|row| &row.id == id)
    }
}
