//! FILENAME: core/grid-engine/src/session.rs
//! PURPOSE: The editable grid: row store, drafts, columns and aggregates together.
//! CONTEXT: A host keeps one `GridSession` per table it shows. Every
//! operation runs to completion and leaves the session consistent: any change
//! to the row sequence or the mappings regenerates the totals row and the
//! grouped series, visibility changes only touch the projection. `version()`
//! increases on every observable change so hosts know when to re-render.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::aggregate::{compute_group_series, compute_totals_row, ChartSeries, TotalsLabels, TotalsRow};
use crate::columns::{Column, ColumnProjection, DisplayRow};
use crate::draft::{DraftEntry, DraftOverlay, EditCommand};
use crate::export::{prepare_export, ExportOptions, ExportPayload};
use crate::mapping::{ChartStyle, FieldMapping};
use crate::row::{durable_text, FieldMap, Row, RowId};
use crate::row_store::RowStore;
use crate::value::FieldValue;

// ============================================================================
// OPTIONS
// ============================================================================

/// What happens to pending drafts once `save` has committed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftRetention {
    /// Drafts are folded into the rows and dropped.
    ClearOnSave,
    /// Drafts stay until the host clears them.
    Retain,
}

impl Default for DraftRetention {
    fn default() -> Self {
        DraftRetention::ClearOnSave
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    pub labels: TotalsLabels,
    pub export: ExportOptions,
    pub draft_retention: DraftRetention,
}

/// Visible columns and display rows, totals last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTable {
    pub columns: Vec<Column>,
    pub rows: Vec<DisplayRow>,
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone)]
pub struct GridSession {
    store: RowStore,
    drafts: DraftOverlay,
    projection: ColumnProjection,
    mappings: Vec<FieldMapping>,
    /// Set when the column layout was given explicitly and must survive loads.
    fixed_layout: bool,
    totals: Option<TotalsRow>,
    series: FxHashMap<ChartStyle, Vec<ChartSeries>>,
    options: SessionOptions,
    version: u64,
}

impl GridSession {
    pub fn new(options: SessionOptions) -> Self {
        GridSession {
            store: RowStore::new(),
            drafts: DraftOverlay::new(),
            projection: ColumnProjection::default(),
            mappings: Vec::new(),
            fixed_layout: false,
            totals: None,
            series: FxHashMap::default(),
            options,
            version: 0,
        }
    }

    /// Session with a fixed column layout (e.g. an editor form).
    pub fn with_layout(columns: Vec<Column>, options: SessionOptions) -> Self {
        let mut session = Self::new(options);
        session.projection = ColumnProjection::from_columns(columns);
        session.fixed_layout = true;
        session
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Seeds the session from flat records. A record's identity field becomes
    /// its durable id; records without one get a temporary id.
    pub fn load(&mut self, records: Vec<FieldMap>, mappings: Vec<FieldMapping>) {
        let identity_field = self.options.export.identity_field.clone();
        let durable: FxHashSet<String> = records
            .iter()
            .filter_map(|record| record.get(&identity_field).and_then(durable_text))
            .collect();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let store = &mut self.store;
            rows.push(Row::from_record(record, &identity_field, || {
                store.issue_temp_id_avoiding(&durable)
            }));
        }
        self.load_rows(rows, mappings);
    }

    pub fn load_rows(&mut self, rows: Vec<Row>, mappings: Vec<FieldMapping>) {
        self.store.replace_all(rows);
        self.mappings = mappings;
        if !self.fixed_layout {
            self.projection = ColumnProjection::derive(&self.mappings, self.store.snapshot());
        }
        self.refresh_aggregates();
    }

    /// Replaces the mappings. Columns are re-derived (unless the layout is
    /// fixed) and columns that were hidden stay hidden.
    pub fn set_mappings(&mut self, mappings: Vec<FieldMapping>) {
        self.mappings = mappings;
        if !self.fixed_layout {
            let hidden: Vec<String> = self
                .projection
                .columns()
                .iter()
                .filter(|c| !c.visible)
                .map(|c| c.field.clone())
                .collect();
            self.projection = ColumnProjection::derive(&self.mappings, self.store.snapshot());
            for field in &hidden {
                self.projection.set_visibility(field, false);
            }
        }
        self.refresh_aggregates();
    }

    // ------------------------------------------------------------------------
    // Row edits
    // ------------------------------------------------------------------------

    pub fn add_row(&mut self, defaults: FieldMap) -> RowId {
        let id = self.store.add_row(defaults);
        self.refresh_aggregates();
        id
    }

    /// Adds a row with an empty string for every data column.
    pub fn add_blank_row(&mut self) -> RowId {
        let defaults: FieldMap = self
            .projection
            .data_fields()
            .into_iter()
            .map(|field| (field.to_string(), FieldValue::text("")))
            .collect();
        self.add_row(defaults)
    }

    /// Removes a row; unknown identities are ignored.
    pub fn delete_row(&mut self, id: &RowId) -> bool {
        let removed = self.store.delete_row(id);
        if removed {
            self.refresh_aggregates();
        }
        removed
    }

    /// Identity of the row a host names by its display key. A loaded durable
    /// id takes precedence over the `temp-N` reading of the same text.
    pub fn resolve_row_key(&self, key: &str) -> Option<RowId> {
        let durable = RowId::durable(key.trim());
        if self.store.contains(&durable) {
            return Some(durable);
        }
        RowId::parse(key)
    }

    pub fn record_edit(&mut self, command: EditCommand) {
        self.drafts.record_edit(command);
        self.version += 1;
    }

    pub fn record_entries(&mut self, entries: Vec<DraftEntry>) {
        self.drafts.record_entries(entries);
        self.version += 1;
    }

    /// Rows with pending drafts applied; the store is not touched.
    pub fn merged_rows(&self) -> Vec<Row> {
        self.drafts.merge_into(self.store.snapshot())
    }

    /// Writes the merged rows back into the store. Drafts are kept.
    pub fn commit_drafts(&mut self) {
        let merged = self.merged_rows();
        self.store.commit(merged);
        self.refresh_aggregates();
    }

    pub fn clear_drafts(&mut self) {
        self.drafts.clear();
        self.version += 1;
    }

    // ------------------------------------------------------------------------
    // Columns and display
    // ------------------------------------------------------------------------

    /// Shows or hides a column. Aggregates are not recomputed.
    pub fn set_column_visibility(&mut self, field: &str, visible: bool) -> bool {
        let changed = self.projection.set_visibility(field, visible);
        if changed {
            self.version += 1;
        }
        changed
    }

    /// Visible columns and rows (drafts applied), totals row last.
    pub fn display(&self) -> DisplayTable {
        let rows = self.merged_rows();
        DisplayTable {
            columns: self.projection.visible_columns().cloned().collect(),
            rows: self.projection.project(&rows, self.totals.as_ref()),
        }
    }

    pub fn totals_row(&self) -> Option<&TotalsRow> {
        self.totals.as_ref()
    }

    pub fn group_series(&self, style: ChartStyle) -> &[ChartSeries] {
        self.series.get(&style).map(Vec::as_slice).unwrap_or(&[])
    }

    // ------------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------------

    /// Payload for the current rows and drafts. Does not change the session.
    pub fn prepare_export(&self) -> ExportPayload {
        let options = self.effective_export_options();
        prepare_export(
            self.store.snapshot(),
            &self.drafts,
            self.store.pending_deletes(),
            &options,
        )
    }

    /// Builds the payload, commits the merged rows and applies the draft
    /// retention policy. Temporary ids stay temporary until `acknowledge_save`.
    pub fn save(&mut self) -> ExportPayload {
        let payload = self.prepare_export();
        let merged = self.merged_rows();
        self.store.commit(merged);
        if self.options.draft_retention == DraftRetention::ClearOnSave {
            self.drafts.clear();
        }
        self.refresh_aggregates();
        payload
    }

    /// Applies the outcome of a successful save: each temporary id becomes
    /// the durable id persistence assigned, and queued deletions are dropped.
    pub fn acknowledge_save(&mut self, assigned: &[(RowId, String)]) {
        for (temp, durable) in assigned {
            if self.store.promote(temp, durable.clone()) {
                self.drafts.rekey(temp, RowId::Durable(durable.clone()));
            }
        }
        self.store.clear_pending_deletes();
        self.refresh_aggregates();
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn rows(&self) -> &[Row] {
        self.store.snapshot()
    }

    pub fn columns(&self) -> &[Column] {
        self.projection.columns()
    }

    pub fn visible_fields(&self) -> Vec<&str> {
        self.projection.visible_fields()
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn drafts(&self) -> &DraftOverlay {
        &self.drafts
    }

    pub fn pending_deletes(&self) -> &[String] {
        self.store.pending_deletes()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Tracked fields default to the mapped fields. A fixed layout without
    /// mappings tracks its data columns; inferred grids check every field.
    fn effective_export_options(&self) -> ExportOptions {
        let mut options = self.options.export.clone();
        if !options.tracked_fields.is_empty() {
            return options;
        }
        if !self.mappings.is_empty() {
            options.tracked_fields = self.mappings.iter().map(|m| m.field.clone()).collect();
        } else if self.fixed_layout {
            options.tracked_fields = self
                .projection
                .data_fields()
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        options
    }

    fn refresh_aggregates(&mut self) {
        let rows = self.store.snapshot();
        let columns = self.projection.data_fields();
        self.totals = compute_totals_row(rows, &self.mappings, &columns, &self.options.labels);

        self.series.clear();
        for style in [ChartStyle::Bar, ChartStyle::Donut] {
            let series = compute_group_series(rows, &self.mappings, style);
            if !series.is_empty() {
                self.series.insert(style, series);
            }
        }
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EMPTY_CATEGORY;
    use crate::mapping::ReportKind;
    use crate::row::TOTALS_ROW_KEY;

    fn record(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::text(*v)))
            .collect()
    }

    fn sales_session() -> GridSession {
        let mut session = GridSession::new(SessionOptions::default());
        session.load(
            vec![
                record(&[("Name", "A"), ("Amount", "10")]),
                record(&[("Name", "B"), ("Amount", "20")]),
            ],
            Vec::new(),
        );
        session.set_mappings(vec![FieldMapping::new("$.amount", "Amount", ReportKind::Sum)]);
        session
    }

    #[test]
    fn test_sum_then_hide_column() {
        let mut session = GridSession::new(SessionOptions::default());
        session.load(
            vec![
                record(&[("Name", "A"), ("Amount", "10")]),
                record(&[("Name", "B"), ("Amount", "20")]),
            ],
            vec![FieldMapping::new("$.amount", "Amount", ReportKind::Sum)],
        );

        let display = session.display();
        assert_eq!(display.rows.len(), 3);
        let totals = display.rows.last().unwrap();
        assert_eq!(totals.value("Name"), Some("Totals"));
        assert_eq!(totals.value("Amount"), Some("Sum: 30"));

        session.set_column_visibility("Amount", false);
        let display = session.display();
        for row in &display.rows {
            let keys: Vec<&str> = row.cells.iter().map(|c| c.key.as_str()).collect();
            assert_eq!(keys, vec!["Name"]);
        }
        assert_eq!(display.columns.len(), 1);
    }

    #[test]
    fn test_totals_row_follows_rows() {
        let mut session = sales_session();
        assert_eq!(session.totals_row().unwrap().get("Amount"), "Sum: 30");

        session.add_row(record(&[("Name", "C"), ("Amount", "5")]));
        assert_eq!(session.totals_row().unwrap().get("Amount"), "Sum: 35");

        let first = session.rows()[0].id.clone();
        session.delete_row(&first);
        assert_eq!(session.totals_row().unwrap().get("Amount"), "Sum: 25");
    }

    #[test]
    fn test_visibility_does_not_recompute_aggregates() {
        let mut session = sales_session();
        let before = session.totals_row().cloned();
        assert!(session.set_column_visibility("Amount", false));
        assert_eq!(session.totals_row().cloned(), before);

        let display = session.display();
        let last = display.rows.last().unwrap();
        assert!(last.is_totals);
        assert_eq!(last.key, TOTALS_ROW_KEY);
        assert_eq!(last.cells.len(), 1);
    }

    #[test]
    fn test_drafts_shown_but_totals_wait_for_commit() {
        let mut session = sales_session();
        let id = session.rows()[0].id.clone();
        session.record_edit(EditCommand::new(id, "Amount", "100"));

        assert_eq!(session.display().rows[0].value("Amount"), Some("100"));
        assert_eq!(session.totals_row().unwrap().get("Amount"), "Sum: 30");

        session.commit_drafts();
        assert_eq!(session.totals_row().unwrap().get("Amount"), "Sum: 120");
    }

    #[test]
    fn test_save_clears_drafts_by_default() {
        let mut session = sales_session();
        let id = session.rows()[0].id.clone();
        session.record_edit(EditCommand::new(id.clone(), "Name", "Z"));

        let payload = session.save();
        assert_eq!(payload.records[0].get("Name"), Some(&FieldValue::text("Z")));
        assert!(session.drafts().is_empty());
        assert_eq!(session.rows()[0].get("Name"), &FieldValue::text("Z"));
    }

    #[test]
    fn test_save_retains_drafts_when_configured() {
        let mut session = GridSession::new(SessionOptions {
            draft_retention: DraftRetention::Retain,
            ..Default::default()
        });
        session.load(vec![record(&[("Name", "A")])], Vec::new());
        let id = session.rows()[0].id.clone();
        session.record_edit(EditCommand::new(id, "Name", "Z"));

        session.save();
        assert_eq!(session.drafts().len(), 1);
    }

    #[test]
    fn test_save_twice_is_identical() {
        let mut session = sales_session();
        let id = session.rows()[1].id.clone();
        session.record_edit(EditCommand::new(id, "Amount", "21"));

        let first = session.save();
        let second = session.save();
        assert_eq!(first, second);
    }

    #[test]
    fn test_acknowledge_save_promotes_ids() {
        let mut session = GridSession::new(SessionOptions::default());
        session.set_mappings(vec![FieldMapping::new("", "Label", ReportKind::None)]);
        let temp = session.add_blank_row();
        session.record_edit(EditCommand::new(temp.clone(), "Label", "x"));
        let payload = session.save();
        assert!(!payload.records[0].contains_key("Id"));

        session.acknowledge_save(&[(temp.clone(), "a01".to_string())]);
        assert_eq!(session.rows()[0].id, RowId::durable("a01"));
        let payload = session.prepare_export();
        assert_eq!(payload.records[0].get("Id"), Some(&FieldValue::text("a01")));
    }

    #[test]
    fn test_blank_row_is_not_exported() {
        let mut session = sales_session();
        session.add_blank_row();
        assert_eq!(session.prepare_export().records.len(), 2);
    }

    #[test]
    fn test_row_with_only_unmapped_fields_is_not_exported() {
        let mut session = GridSession::new(SessionOptions::default());
        session.load(
            vec![record(&[("Name", "A"), ("Amount", "10")])],
            vec![FieldMapping::new("$.amount", "Amount", ReportKind::Sum)],
        );
        session.add_row(record(&[("Name", "C"), ("Amount", "")]));

        let payload = session.prepare_export();
        assert_eq!(payload.records.len(), 1);
        assert_eq!(payload.records[0].get("Name"), Some(&FieldValue::text("A")));
    }

    #[test]
    fn test_durable_id_reading_like_temp_id_resolves_to_saved_row() {
        let mut session = GridSession::new(SessionOptions::default());
        session.load(
            vec![
                record(&[("Id", "temp-1"), ("Name", "Saved")]),
                record(&[("Name", "Unsaved")]),
            ],
            Vec::new(),
        );

        assert_eq!(session.rows()[0].id, RowId::durable("temp-1"));
        assert_eq!(session.rows()[1].id, RowId::Temporary(2));
        assert_eq!(session.resolve_row_key("temp-1"), Some(RowId::durable("temp-1")));
        assert_eq!(session.resolve_row_key("temp-2"), Some(RowId::Temporary(2)));
    }

    #[test]
    fn test_totals_key_never_names_a_data_row() {
        let mut session = sales_session();
        session.load(
            vec![record(&[("Id", TOTALS_ROW_KEY), ("Name", "A"), ("Amount", "5")])],
            vec![FieldMapping::new("$.amount", "Amount", ReportKind::Sum)],
        );

        assert!(session.rows()[0].id.is_temporary());
        let display = session.display();
        let keys: Vec<&str> = display.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.iter().filter(|k| **k == TOTALS_ROW_KEY).count(), 1);
        assert_eq!(session.resolve_row_key(TOTALS_ROW_KEY), None);
    }

    #[test]
    fn test_group_series_cached_per_style() {
        let mut session = GridSession::new(SessionOptions::default());
        session.load(
            vec![record(&[("City", "Paris")]), record(&[("City", "")]), record(&[("City", "Paris")])],
            vec![FieldMapping::new("", "City", ReportKind::GroupBy(ChartStyle::Donut))],
        );
        assert!(session.group_series(ChartStyle::Bar).is_empty());
        let series = session.group_series(ChartStyle::Donut);
        assert_eq!(series[0].labels, vec!["Paris", EMPTY_CATEGORY]);
        assert_eq!(series[0].counts, vec![2, 1]);
    }

    #[test]
    fn test_set_mappings_keeps_hidden_columns_hidden() {
        let mut session = sales_session();
        session.set_column_visibility("Name", false);
        session.set_mappings(vec![
            FieldMapping::new("", "Name", ReportKind::None),
            FieldMapping::new("", "Amount", ReportKind::Average),
        ]);
        assert_eq!(session.visible_fields(), vec!["Amount"]);
        assert_eq!(session.totals_row().unwrap().get("Amount"), "Average: 15.00");
    }

    #[test]
    fn test_version_increases() {
        let mut session = sales_session();
        let v = session.version();
        session.set_column_visibility("Name", false);
        assert!(session.version() > v);
        let v = session.version();
        session.set_column_visibility("Name", false);
        assert_eq!(session.version(), v);
    }
}
