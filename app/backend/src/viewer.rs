//! FILENAME: app/backend/src/viewer.rs
// PURPOSE: External-data viewers: all configurations of a record, or one.
// CONTEXT: Each configuration becomes a GridSession. Columns come from the
// configuration's mappings plus the first record's keys; totals follow the
// Sum/Average mappings. Loads are tagged with a LoadToken so a slow response
// never replaces a newer one.

use connector::{ConfigBundle, LoadToken, SourceError};
use grid_engine::{Column, DisplayTable, GridSession, SessionOptions};
use serde::{Deserialize, Serialize};

use crate::{lock, log_error, log_info, log_warn, settings_snapshot, AppState};

/// Returned when a response arrives after a newer load was started.
pub const STALE_LOAD: &str = "Superseded by a newer load";

// ============================================================================
// TYPES
// ============================================================================

/// One configuration held by a viewer.
#[derive(Debug, Clone)]
pub struct ConfigView {
    pub config_id: String,
    pub display_name: String,
    pub connection_name: Option<String>,
    pub error: Option<String>,
    pub session: GridSession,
}

impl ConfigView {
    pub fn from_bundle(bundle: ConfigBundle, options: SessionOptions) -> Self {
        let mut session = GridSession::new(options);
        session.load(bundle.rows, bundle.mappings);
        ConfigView {
            config_id: bundle.config_id,
            display_name: bundle.display_name,
            connection_name: bundle.connection_name,
            error: bundle.error,
            session,
        }
    }

    pub fn table(&self) -> ConfigTable {
        ConfigTable {
            config_id: self.config_id.clone(),
            display_name: self.display_name.clone(),
            connection_name: self.connection_name.clone(),
            error: self.error.clone(),
            available_columns: self.session.columns().to_vec(),
            table: self.session.display(),
            version: self.session.version(),
        }
    }
}

/// Render-ready view of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigTable {
    pub config_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every column with its visibility, for the settings panel
    pub available_columns: Vec<Column>,
    pub table: DisplayTable,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerResult {
    pub success: bool,
    pub tables: Vec<ConfigTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ViewerResult {
    pub fn ok(tables: Vec<ConfigTable>) -> Self {
        Self {
            success: true,
            tables,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            tables: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.error.as_deref() == Some(STALE_LOAD)
    }
}

fn into_result(result: Result<Vec<ConfigTable>, String>) -> ViewerResult {
    match result {
        Ok(tables) => ViewerResult::ok(tables),
        Err(e) => ViewerResult::err(e),
    }
}

// ============================================================================
// ALL CONFIGURATIONS
// ============================================================================

/// Fetches every active configuration of the owner record and replaces the
/// viewer contents.
pub async fn load_all_configs(state: &AppState) -> ViewerResult {
    let owner_id = match settings_snapshot(state) {
        Ok(settings) => settings.owner_id,
        Err(e) => return ViewerResult::err(e),
    };
    let token = state.viewer_loads.begin();
    log_info!("VIEWER", "load_all_configs owner={} token={}", owner_id, token.value());

    let fetched = state.source.fetch_all(&owner_id).await;
    apply_loaded_configs(state, token, fetched)
}

/// Applies a fetch result if `token` is still the latest viewer load.
/// A failed fetch empties the viewer and reports the error.
pub fn apply_loaded_configs(
    state: &AppState,
    token: LoadToken,
    fetched: Result<Vec<ConfigBundle>, SourceError>,
) -> ViewerResult {
    if !state.viewer_loads.is_current(token) {
        log_warn!("VIEWER", "discarding stale load token={}", token.value());
        return ViewerResult::err(STALE_LOAD);
    }
    into_result(apply_loaded_configs_inner(state, fetched))
}

fn apply_loaded_configs_inner(
    state: &AppState,
    fetched: Result<Vec<ConfigBundle>, SourceError>,
) -> Result<Vec<ConfigTable>, String> {
    let options = settings_snapshot(state)?.session_options();
    let mut viewers = lock(&state.viewers, "viewers")?;

    let bundles = match fetched {
        Ok(bundles) => bundles,
        Err(e) => {
            log_error!("VIEWER", "Error loading config data: {}", e);
            viewers.clear();
            return Err(format!("Error loading config data: {}", e));
        }
    };

    *viewers = bundles
        .into_iter()
        .map(|bundle| ConfigView::from_bundle(bundle, options.clone()))
        .collect();
    log_info!("VIEWER", "loaded {} configurations", viewers.len());
    Ok(viewers.iter().map(ConfigView::table).collect())
}

pub fn get_config_tables(state: &AppState) -> ViewerResult {
    into_result(lock(&state.viewers, "viewers").map(|viewers| viewers.iter().map(ConfigView::table).collect()))
}

/// Shows or hides one column of one configuration. Needs the column-toggle
/// permission; unknown configurations or fields change nothing.
pub fn toggle_column(state: &AppState, config_id: &str, field: &str, visible: bool) -> ViewerResult {
    into_result(toggle_column_inner(state, config_id, field, visible))
}

fn toggle_column_inner(
    state: &AppState,
    config_id: &str,
    field: &str,
    visible: bool,
) -> Result<Vec<ConfigTable>, String> {
    ensure_toggle_allowed(state)?;
    let mut viewers = lock(&state.viewers, "viewers")?;
    let view = viewers
        .iter_mut()
        .find(|view| view.config_id == config_id)
        .ok_or_else(|| format!("Configuration not found: {}", config_id))?;

    if view.session.set_column_visibility(field, visible) {
        log_info!("VIEWER", "toggle_column config={} field={} visible={}", config_id, field, visible);
    }
    Ok(vec![view.table()])
}

fn ensure_toggle_allowed(state: &AppState) -> Result<(), String> {
    if settings_snapshot(state)?.allow_column_toggle {
        Ok(())
    } else {
        Err("Not permitted to change column visibility".to_string())
    }
}

// ============================================================================
// SINGLE CONFIGURATION
// ============================================================================

/// Fetches one configuration into the single-configuration viewer.
pub async fn load_selected_config(state: &AppState, config_id: &str) -> ViewerResult {
    if config_id.trim().is_empty() {
        return ViewerResult::err("No configuration selected");
    }
    let owner_id = match settings_snapshot(state) {
        Ok(settings) => settings.owner_id,
        Err(e) => return ViewerResult::err(e),
    };
    let token = state.selected_loads.begin();
    log_info!("VIEWER", "load_selected_config config={} token={}", config_id, token.value());

    let fetched = state.source.fetch_one(config_id, &owner_id).await;
    apply_selected_config(state, token, fetched)
}

pub fn apply_selected_config(
    state: &AppState,
    token: LoadToken,
    fetched: Result<ConfigBundle, SourceError>,
) -> ViewerResult {
    if !state.selected_loads.is_current(token) {
        log_warn!("VIEWER", "discarding stale selected load token={}", token.value());
        return ViewerResult::err(STALE_LOAD);
    }
    into_result(apply_selected_inner(state, fetched))
}

fn apply_selected_inner(
    state: &AppState,
    fetched: Result<ConfigBundle, SourceError>,
) -> Result<Vec<ConfigTable>, String> {
    let options = settings_snapshot(state)?.session_options();
    let mut selected = lock(&state.selected, "selected")?;

    match fetched {
        Ok(bundle) => {
            let view = ConfigView::from_bundle(bundle, options);
            let table = view.table();
            *selected = Some(view);
            Ok(vec![table])
        }
        Err(e) => {
            log_error!("VIEWER", "Error loading selected config: {}", e);
            *selected = None;
            Err(format!("Error loading selected config: {}", e))
        }
    }
}

pub fn get_selected_table(state: &AppState) -> ViewerResult {
    into_result(lock(&state.selected, "selected").map(|selected| {
        selected.iter().map(ConfigView::table).collect()
    }))
}

pub fn toggle_selected_column(state: &AppState, field: &str, visible: bool) -> ViewerResult {
    into_result(toggle_selected_inner(state, field, visible))
}

fn toggle_selected_inner(state: &AppState, field: &str, visible: bool) -> Result<Vec<ConfigTable>, String> {
    ensure_toggle_allowed(state)?;
    let mut selected = lock(&state.selected, "selected")?;
    let view = selected.as_mut().ok_or("No configuration loaded")?;
    view.session.set_column_visibility(field, visible);
    Ok(vec![view.table()])
}
