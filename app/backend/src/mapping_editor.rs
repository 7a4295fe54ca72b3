//! FILENAME: app/backend/src/mapping_editor.rs
// PURPOSE: Field-mapping editor: rows of (JSON path, label, report type).
// CONTEXT: The editor has a fixed layout. New rows get temporary ids that the
// cell editors report back (`tempId`), edits are kept as drafts until save,
// and deleting a saved row queues its id for deletion.

use grid_engine::{
    Column, DisplayTable, DraftEntry, EditCommand, FieldMap, FieldMapping, FieldValue,
    GridSession, PicklistOption, RenderHint, ReportKind, RowId, ROW_CORRELATION_KEY,
};
use serde::{Deserialize, Serialize};

use crate::{lock, log_debug, log_info, AppSettings, AppState};

pub const FIELD_JSON_PATH: &str = "Field_JSON_Path__c";
pub const FIELD_LABEL: &str = "Field_Label__c";
pub const FIELD_REPORT_TYPE: &str = "Report_Type__c";
pub const DELETE_ACTION: &str = "delete";

/// Fixed editor layout: two text columns, the report-type picklist and a
/// delete button.
pub fn editor_columns(report_type_options: &[PicklistOption]) -> Vec<Column> {
    let mut report_type = Column::new("Report Type", FIELD_REPORT_TYPE).with_hint(RenderHint::Picklist {
        options: report_type_options.to_vec(),
    });
    report_type.correlation_key = Some(ROW_CORRELATION_KEY.to_string());

    vec![
        Column::new("JSON Path", FIELD_JSON_PATH).with_hint(RenderHint::Text { editable: true }),
        Column::new("Label", FIELD_LABEL).with_hint(RenderHint::Text { editable: true }),
        report_type,
        Column::new("", DELETE_ACTION).with_hint(RenderHint::RowAction {
            name: DELETE_ACTION.to_string(),
        }),
    ]
}

// ============================================================================
// EDITOR EVENTS
// ============================================================================

/// A batch entry from the inline cell editor: the row key plus changed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDraft {
    #[serde(rename = "Id")]
    pub row_key: String,
    #[serde(flatten)]
    pub values: FieldMap,
}

/// A change reported by the report-type picklist cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicklistChange {
    pub record_id: String,
    pub field_name: String,
    pub value: String,
}

/// Durable id persistence assigned to a row saved under a temporary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedId {
    pub temp_id: String,
    pub id: String,
}

// ============================================================================
// EDITOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct MappingEditor {
    session: GridSession,
    report_type_options: Vec<PicklistOption>,
}

impl MappingEditor {
    pub fn new(settings: &AppSettings) -> Self {
        let mut editor = MappingEditor {
            session: GridSession::with_layout(
                editor_columns(&settings.report_type_options),
                settings.session_options(),
            ),
            report_type_options: settings.report_type_options.clone(),
        };
        editor.open(Vec::new());
        editor
    }

    /// Starts editing `existing` mapping records (durable when they carry an
    /// id). With nothing to edit, one blank row is added.
    pub fn open(&mut self, existing: Vec<FieldMap>) {
        let empty = existing.is_empty();
        self.session.clear_drafts();
        self.session.load(existing, Vec::new());
        if empty {
            self.session.add_blank_row();
        }
    }

    pub fn add_row(&mut self) -> RowId {
        self.session.add_blank_row()
    }

    /// Handles a row button. Only `delete` is known; unknown rows are ignored.
    pub fn handle_row_action(&mut self, action: &str, row_key: &str) -> Result<bool, String> {
        if action != DELETE_ACTION {
            return Err(format!("Unknown row action: {}", action));
        }
        let id = self.row_id(row_key)?;
        Ok(self.session.delete_row(&id))
    }

    pub fn handle_cell_change(&mut self, drafts: Vec<CellDraft>) -> Result<(), String> {
        let mut entries = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let mut entry = DraftEntry::new(self.row_id(&draft.row_key)?);
            entry.fields = draft.values;
            entries.push(entry);
        }
        self.session.record_entries(entries);
        Ok(())
    }

    /// Records a picklist change. The value must be one of the options or empty.
    pub fn handle_picklist_change(&mut self, change: PicklistChange) -> Result<(), String> {
        if !change.value.is_empty() && !self.report_type_options.iter().any(|o| o.value == change.value) {
            return Err(format!("Unknown report type: {}", change.value));
        }
        let id = self.row_id(&change.record_id)?;
        self.session
            .record_edit(EditCommand::new(id, change.field_name, FieldValue::text(change.value)));
        Ok(())
    }

    /// Mappings as they would be after save, rows without a label skipped.
    pub fn preview_mappings(&self) -> Vec<FieldMapping> {
        self.session
            .merged_rows()
            .iter()
            .filter(|row| !row.get(FIELD_LABEL).is_blank())
            .map(|row| {
                FieldMapping::new(
                    row.get(FIELD_JSON_PATH).display_text(),
                    row.get(FIELD_LABEL).display_text(),
                    ReportKind::from_picklist(&row.get(FIELD_REPORT_TYPE).display_text()),
                )
            })
            .collect()
    }

    pub fn snapshot(&self) -> MappingSnapshot {
        MappingSnapshot {
            table: self.session.display(),
            draft_count: self.session.drafts().len(),
            deleted_ids: self.session.pending_deletes().to_vec(),
            version: self.session.version(),
        }
    }

    fn row_id(&self, key: &str) -> Result<RowId, String> {
        self.session.resolve_row_key(key).ok_or_else(|| "Missing row id".to_string())
    }

    pub fn session(&self) -> &GridSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GridSession {
        &mut self.session
    }
}

fn parse_temp_key(key: &str) -> Result<RowId, String> {
    match RowId::parse(key) {
        Some(id) if id.is_temporary() => Ok(id),
        _ => Err(format!("Not a temporary row id: {}", key)),
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSnapshot {
    pub table: DisplayTable,
    pub draft_count: usize,
    pub deleted_ids: Vec<String>,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<MappingSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MappingResult {
    pub fn ok(snapshot: MappingSnapshot) -> Self {
        Self {
            success: true,
            snapshot: Some(snapshot),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            snapshot: None,
            error: Some(message.into()),
        }
    }
}

/// What the editor hands to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSaveResult {
    pub success: bool,
    pub records_to_create: Vec<FieldMap>,
    pub deleted_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MappingSaveResult {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            records_to_create: Vec::new(),
            deleted_ids: Vec::new(),
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn with_editor<F>(state: &AppState, f: F) -> MappingResult
where
    F: FnOnce(&mut MappingEditor) -> Result<(), String>,
{
    let result = lock(&state.mapping_editor, "mapping editor").and_then(|mut editor| {
        f(&mut *editor)?;
        Ok(editor.snapshot())
    });
    match result {
        Ok(snapshot) => MappingResult::ok(snapshot),
        Err(e) => MappingResult::err(e),
    }
}

pub fn open_mapping_editor(state: &AppState, existing: Vec<FieldMap>) -> MappingResult {
    log_info!("MAPPING", "open_mapping_editor records={}", existing.len());
    with_editor(state, |editor| {
        editor.open(existing);
        Ok(())
    })
}

pub fn get_mapping_editor(state: &AppState) -> MappingResult {
    with_editor(state, |_| Ok(()))
}

pub fn add_mapping_row(state: &AppState) -> MappingResult {
    with_editor(state, |editor| {
        let id = editor.add_row();
        log_debug!("MAPPING", "add_mapping_row id={}", id);
        Ok(())
    })
}

pub fn mapping_row_action(state: &AppState, action: &str, row_key: &str) -> MappingResult {
    with_editor(state, |editor| {
        let removed = editor.handle_row_action(action, row_key)?;
        log_debug!("MAPPING", "row action={} row={} removed={}", action, row_key, removed);
        Ok(())
    })
}

pub fn update_mapping_cells(state: &AppState, drafts: Vec<CellDraft>) -> MappingResult {
    with_editor(state, |editor| editor.handle_cell_change(drafts))
}

pub fn update_mapping_picklist(state: &AppState, change: PicklistChange) -> MappingResult {
    with_editor(state, |editor| editor.handle_picklist_change(change))
}

/// Builds the save payload: filled rows (temporary ones without an id) and
/// the ids of deleted saved rows.
pub fn save_mappings(state: &AppState) -> MappingSaveResult {
    let mut editor = match lock(&state.mapping_editor, "mapping editor") {
        Ok(editor) => editor,
        Err(e) => return MappingSaveResult::err(e),
    };
    let payload = editor.session_mut().save();
    log_info!(
        "MAPPING",
        "save_mappings records={} deleted={}",
        payload.records.len(),
        payload.deleted_ids.len()
    );
    MappingSaveResult {
        success: true,
        records_to_create: payload.records,
        deleted_ids: payload.deleted_ids,
        error: None,
    }
}

/// Applies the ids persistence assigned after a successful save.
pub fn acknowledge_mapping_save(state: &AppState, assigned: Vec<AssignedId>) -> MappingResult {
    with_editor(state, |editor| {
        let mut pairs = Vec::with_capacity(assigned.len());
        for item in assigned {
            pairs.push((parse_temp_key(&item.temp_id)?, item.id));
        }
        editor.session_mut().acknowledge_save(&pairs);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> MappingEditor {
        MappingEditor::new(&AppSettings::default())
    }

    #[test]
    fn test_new_editor_has_one_blank_row() {
        let editor = editor();
        let snapshot = editor.snapshot();
        assert_eq!(snapshot.table.rows.len(), 1);
        assert_eq!(snapshot.table.rows[0].key, "temp-1");
        assert_eq!(snapshot.table.columns.len(), 4);
        assert!(editor.session().totals_row().is_none());
    }

    #[test]
    fn test_picklist_value_must_be_known() {
        let mut editor = editor();
        let change = PicklistChange {
            record_id: "temp-1".to_string(),
            field_name: FIELD_REPORT_TYPE.to_string(),
            value: "Median".to_string(),
        };
        assert!(editor.handle_picklist_change(change).is_err());
    }

    #[test]
    fn test_preview_mappings() {
        let mut editor = editor();
        editor
            .handle_cell_change(vec![CellDraft {
                row_key: "temp-1".to_string(),
                values: [
                    (FIELD_JSON_PATH.to_string(), FieldValue::text("$.amount")),
                    (FIELD_LABEL.to_string(), FieldValue::text("Amount")),
                ]
                .into_iter()
                .collect(),
            }])
            .unwrap();
        editor
            .handle_picklist_change(PicklistChange {
                record_id: "temp-1".to_string(),
                field_name: FIELD_REPORT_TYPE.to_string(),
                value: "SUM".to_string(),
            })
            .unwrap();

        let mappings = editor.preview_mappings();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].label, "Amount");
        assert_eq!(mappings[0].report_kind, ReportKind::Sum);
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let mut editor = editor();
        assert!(editor.handle_row_action("edit", "temp-1").is_err());
        assert!(editor.handle_row_action(DELETE_ACTION, " ").is_err());
        assert_eq!(editor.handle_row_action(DELETE_ACTION, "temp-99"), Ok(false));
    }

    #[test]
    fn test_saved_id_reading_like_temp_key_targets_saved_row() {
        let mut editor = editor();
        let mut saved = FieldMap::new();
        saved.insert("Id".to_string(), FieldValue::text("temp-1"));
        saved.insert(FIELD_LABEL.to_string(), FieldValue::text("Amount"));
        editor.open(vec![saved]);
        let added = editor.add_row();
        assert_ne!(added.to_string(), "temp-1");

        assert_eq!(editor.handle_row_action(DELETE_ACTION, "temp-1"), Ok(true));
        assert_eq!(editor.snapshot().deleted_ids, vec!["temp-1".to_string()]);
    }

    #[test]
    fn test_cell_draft_wire_shape() {
        let draft: CellDraft =
            serde_json::from_str(r#"{"Id":"temp-2","Field_Label__c":"City"}"#).unwrap();
        assert_eq!(draft.row_key, "temp-2");
        assert_eq!(draft.values.get(FIELD_LABEL), Some(&FieldValue::text("City")));
    }
}
