//! FILENAME: app/backend/tests/test_viewer.rs
//! PURPOSE: Tests for the external-data viewers.

mod common;

use app_lib::viewer::{
    apply_loaded_configs, get_config_tables, get_selected_table, load_all_configs,
    load_selected_config, toggle_column, toggle_selected_column, STALE_LOAD,
};
use common::{sample_bundles, TestHarness};
use connector::{decode_bundles, SourceError};
use grid_engine::TOTALS_ROW_KEY;
use serde_json::json;

// ============================================================================
// ALL CONFIGURATIONS
// ============================================================================

#[test]
fn test_load_all_configs_builds_tables() {
    let harness = TestHarness::with_sample_configs();
    let result = TestHarness::runtime().block_on(load_all_configs(&harness.state));

    assert!(result.success);
    assert_eq!(result.tables.len(), 2);

    let sales = &result.tables[0];
    assert_eq!(sales.display_name, "Sales");
    assert_eq!(sales.connection_name.as_deref(), Some("ERP"));
    let fields: Vec<&str> = sales.available_columns.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["Name", "Amount", "Region"]);

    let totals = sales.table.rows.last().unwrap();
    assert_eq!(totals.key, TOTALS_ROW_KEY);
    assert_eq!(totals.value("Name"), Some("Totals"));
    assert_eq!(totals.value("Amount"), Some("Sum: 30"));
    assert_eq!(totals.value("Region"), Some(""));
}

#[test]
fn test_average_counts_rows_that_do_not_parse() {
    let harness = TestHarness::with_sample_configs();
    let result = TestHarness::runtime().block_on(load_all_configs(&harness.state));

    let contacts = &result.tables[1];
    let totals = contacts.table.rows.last().unwrap();
    // (30 + 40 + 0) / 3
    assert_eq!(totals.value("Age"), Some("Average: 23.33"));
}

#[test]
fn test_fetch_failure_empties_viewer() {
    let harness = TestHarness::with_sample_configs();
    let runtime = TestHarness::runtime();
    runtime.block_on(load_all_configs(&harness.state));

    harness.source.set_failure(Some("callout timed out".to_string()));
    let result = runtime.block_on(load_all_configs(&harness.state));

    assert!(!result.success);
    assert!(result.error.unwrap().contains("callout timed out"));
    assert!(get_config_tables(&harness.state).tables.is_empty());
}

#[test]
fn test_stale_response_is_discarded() {
    let harness = TestHarness::with_sample_configs();
    let older = harness.state.viewer_loads.begin();
    let newer = harness.state.viewer_loads.begin();

    let only_contacts = sample_bundles().into_iter().skip(1).collect();
    let applied = apply_loaded_configs(&harness.state, newer, Ok(only_contacts));
    assert!(applied.success);

    let late = apply_loaded_configs(&harness.state, older, Ok(sample_bundles()));
    assert!(!late.success);
    assert!(late.is_stale());
    assert_eq!(late.error.as_deref(), Some(STALE_LOAD));

    let tables = get_config_tables(&harness.state).tables;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].config_id, "cfg-contacts");
}

#[test]
fn test_stale_failure_does_not_clear_viewer() {
    let harness = TestHarness::with_sample_configs();
    let older = harness.state.viewer_loads.begin();
    let newer = harness.state.viewer_loads.begin();
    apply_loaded_configs(&harness.state, newer, Ok(sample_bundles()));

    let late = apply_loaded_configs(&harness.state, older, Err(SourceError::Malformed("late".into())));
    assert!(late.is_stale());
    assert_eq!(get_config_tables(&harness.state).tables.len(), 2);
}

#[test]
fn test_failed_bundle_sits_beside_good_ones() {
    let bundles = decode_bundles(json!([
        {"configId": "broken", "data": {"not": "a list"}},
        {"configId": "ok", "configName": "Fine", "data": [{"A": "1"}]}
    ]))
    .unwrap();
    let harness = TestHarness::with_settings(Default::default(), bundles);
    let result = TestHarness::runtime().block_on(load_all_configs(&harness.state));

    assert!(result.success);
    assert!(result.tables[0].error.is_some());
    assert!(result.tables[0].table.rows.is_empty());
    assert_eq!(result.tables[1].table.rows.len(), 1);
}

// ============================================================================
// COLUMN TOGGLES
// ============================================================================

#[test]
fn test_toggle_column_hides_and_restores() {
    let harness = TestHarness::with_sample_configs();
    TestHarness::runtime().block_on(load_all_configs(&harness.state));

    let hidden = toggle_column(&harness.state, "cfg-sales", "Amount", false);
    assert!(hidden.success);
    let table = &hidden.tables[0].table;
    for row in &table.rows {
        assert!(row.value("Amount").is_none());
    }
    assert_eq!(table.rows.last().unwrap().value("Name"), Some("Totals"));

    let shown = toggle_column(&harness.state, "cfg-sales", "Amount", true);
    let fields: Vec<&str> = shown.tables[0].table.columns.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["Name", "Amount", "Region"]);
}

#[test]
fn test_toggle_column_unknown_config() {
    let harness = TestHarness::with_sample_configs();
    TestHarness::runtime().block_on(load_all_configs(&harness.state));

    let result = toggle_column(&harness.state, "nope", "Amount", false);
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Configuration not found: nope"));
}

#[test]
fn test_toggle_column_requires_permission() {
    let harness = TestHarness::with_column_toggle_denied();
    TestHarness::runtime().block_on(load_all_configs(&harness.state));

    let result = toggle_column(&harness.state, "cfg-sales", "Amount", false);
    assert!(!result.success);

    let tables = get_config_tables(&harness.state).tables;
    assert!(tables[0].available_columns.iter().all(|c| c.visible));
}

// ============================================================================
// SINGLE CONFIGURATION
// ============================================================================

#[test]
fn test_load_selected_config() {
    let harness = TestHarness::with_sample_configs();
    let runtime = TestHarness::runtime();

    let result = runtime.block_on(load_selected_config(&harness.state, "cfg-contacts"));
    assert!(result.success);
    assert_eq!(result.tables[0].config_id, "cfg-contacts");

    let toggled = toggle_selected_column(&harness.state, "City", false);
    assert!(toggled.tables[0].table.rows[0].value("City").is_none());
    assert_eq!(get_selected_table(&harness.state).tables.len(), 1);
}

#[test]
fn test_load_selected_config_missing() {
    let harness = TestHarness::with_sample_configs();
    let runtime = TestHarness::runtime();

    let empty = runtime.block_on(load_selected_config(&harness.state, ""));
    assert_eq!(empty.error.as_deref(), Some("No configuration selected"));

    let missing = runtime.block_on(load_selected_config(&harness.state, "cfg-none"));
    assert!(!missing.success);
    assert!(get_selected_table(&harness.state).tables.is_empty());
}
