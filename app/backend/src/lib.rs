//! FILENAME: app/backend/src/lib.rs
// PURPOSE: Backend library entry point: shared state and command modules.
// CONTEXT: Commands take `&AppState` and return result structs the host
// serializes. Grid sessions live behind mutexes; the only awaits are fetches,
// and no lock is held across them.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use connector::{ConfigSource, LoadTracker};
use grid_engine::ChartStyle;
use indexmap::IndexMap;

pub mod logging;
pub mod mapping_editor;
pub mod reports;
pub mod settings;
pub mod status;
pub mod viewer;

pub use logging::{get_log_path, init_log_file, next_seq, sort_log_file, write_log};
pub use mapping_editor::{
    AssignedId, CellDraft, MappingEditor, MappingResult, MappingSaveResult, MappingSnapshot,
    PicklistChange,
};
pub use reports::{ChartRenderer, ChartSpec, GroupedReport, ReportResult};
pub use settings::{load_settings, AppSettings, SourceSettings};
pub use status::{status_banner, ConnectionStatus, StatusBanner, StatusTone};
pub use viewer::{ConfigTable, ConfigView, ViewerResult};

// ============================================================================
// APPLICATION STATE
// ============================================================================

pub struct AppState {
    pub settings: Mutex<AppSettings>,
    pub source: Arc<dyn ConfigSource>,
    /// One view per active configuration, in load order
    pub viewers: Mutex<Vec<ConfigView>>,
    /// The single-configuration viewer
    pub selected: Mutex<Option<ConfigView>>,
    pub mapping_editor: Mutex<MappingEditor>,
    /// Grouped reports per chart style
    pub reports: Mutex<IndexMap<ChartStyle, Vec<GroupedReport>>>,
    pub viewer_loads: LoadTracker,
    pub selected_loads: LoadTracker,
    pub bar_report_loads: LoadTracker,
    pub donut_report_loads: LoadTracker,
}

impl AppState {
    /// Load tracker of the reports of one chart style. Bar and donut reports
    /// load independently.
    pub fn report_loads(&self, style: ChartStyle) -> &LoadTracker {
        match style {
            ChartStyle::Bar => &self.bar_report_loads,
            ChartStyle::Donut => &self.donut_report_loads,
        }
    }
}

/// State backed by the source the settings name.
pub fn create_app_state(settings: AppSettings) -> Result<AppState, String> {
    let source = settings.build_source()?;
    Ok(create_app_state_with_source(settings, source))
}

pub fn create_app_state_with_source(settings: AppSettings, source: Arc<dyn ConfigSource>) -> AppState {
    log_info!("SYS", "Creating AppState owner={}", settings.owner_id);
    let editor = MappingEditor::new(&settings);
    AppState {
        settings: Mutex::new(settings),
        source,
        viewers: Mutex::new(Vec::new()),
        selected: Mutex::new(None),
        mapping_editor: Mutex::new(editor),
        reports: Mutex::new(IndexMap::new()),
        viewer_loads: LoadTracker::new(),
        selected_loads: LoadTracker::new(),
        bar_report_loads: LoadTracker::new(),
        donut_report_loads: LoadTracker::new(),
    }
}

/// Locks a state field, turning a poisoned lock into an error message.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, String> {
    mutex.lock().map_err(|e| format!("{} lock poisoned: {}", what, e))
}

pub(crate) fn settings_snapshot(state: &AppState) -> Result<AppSettings, String> {
    Ok(lock(&state.settings, "settings")?.clone())
}

// ============================================================================
// CONSOLE ENTRY
// ============================================================================

/// Console run: `record-viewer [settings.json] [bundles.json]`.
/// Loads every configuration and prints the display tables and both report
/// kinds as JSON.
pub fn run(args: Vec<String>) -> Result<(), String> {
    let settings_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("record-viewer.json"));
    let mut settings = load_settings(&settings_path)?;
    if let Some(bundles) = args.get(2) {
        settings.source.endpoint = None;
        settings.source.file = Some(PathBuf::from(bundles));
    }

    if let Some(path) = settings.log_file.clone() {
        match init_log_file(&path) {
            Ok(path) => log_info!("SYS", "Backend starting, log={}", path.display()),
            Err(e) => eprintln!("[LOG_INIT] FAILED: {}", e),
        }
    }

    let state = create_app_state(settings)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    let (tables, bar, donut) = runtime.block_on(async {
        let tables = viewer::load_all_configs(&state).await;
        let bar = reports::load_grouped_reports(&state, ChartStyle::Bar).await;
        let donut = reports::load_grouped_reports(&state, ChartStyle::Donut).await;
        (tables, bar, donut)
    });

    let output = serde_json::json!({
        "tables": tables,
        "barReports": bar,
        "donutReports": donut,
    });
    let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{}", text);

    if logging::get_log_path().is_some() {
        sort_log_file()?;
    }
    Ok(())
}
