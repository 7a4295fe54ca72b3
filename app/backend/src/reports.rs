//! FILENAME: app/backend/src/reports.rs
// PURPOSE: Grouped-count reports (bar and donut) over every configuration.
// CONTEXT: A report holds one chart per "Group By" mapping of the requested
// style. Drawing is handed to a ChartRenderer and nothing comes back from it.

use connector::{ConfigBundle, LoadToken, SourceError};
use grid_engine::{ChartSeries, ChartStyle, GridSession, ReportKind, SessionOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::viewer::STALE_LOAD;
use crate::{lock, log_error, log_info, log_warn, settings_snapshot, AppState};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Mount id of a chart: `{prefix}-{configId}-{field}`, whitespace runs in the
/// field replaced by `_`.
pub fn chart_id(prefix: &str, config_id: &str, field: &str) -> String {
    format!("{}-{}-{}", prefix, config_id, WHITESPACE_RUN.replace_all(field, "_"))
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_id: String,
    pub field: String,
    pub title: String,
    pub style: ChartStyle,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

impl ChartSpec {
    pub fn from_series(prefix: &str, config_id: &str, series: &ChartSeries, style: ChartStyle) -> Self {
        ChartSpec {
            chart_id: chart_id(prefix, config_id, &series.field),
            field: series.field.clone(),
            title: series.label.clone(),
            style,
            labels: series.labels.clone(),
            values: series.counts.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedReport {
    pub config_id: String,
    pub config_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub charts: Vec<ChartSpec>,
}

impl GroupedReport {
    pub fn from_bundle(bundle: ConfigBundle, style: ChartStyle, options: SessionOptions, prefix: &str) -> Self {
        let mut session = GridSession::new(options);
        session.load(bundle.rows, bundle.mappings);
        let charts = session
            .group_series(style)
            .iter()
            .map(|series| ChartSpec::from_series(prefix, &bundle.config_id, series, style))
            .collect();
        GroupedReport {
            config_id: bundle.config_id,
            config_name: bundle.display_name,
            connection_name: bundle.connection_name,
            error: bundle.error,
            charts,
        }
    }
}

/// Draws one chart into a mount point. Fire-and-forget.
pub trait ChartRenderer {
    fn render(&self, mount_id: &str, spec: &ChartSpec, style: ChartStyle);
}

/// Renders every chart of every report; returns how many were handed over.
pub fn render_reports(reports: &[GroupedReport], renderer: &dyn ChartRenderer) -> usize {
    let mut count = 0;
    for chart in reports.iter().flat_map(|report| report.charts.iter()) {
        renderer.render(&chart.chart_id, chart, chart.style);
        count += 1;
    }
    count
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub success: bool,
    pub reports: Vec<GroupedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportResult {
    pub fn ok(reports: Vec<GroupedReport>) -> Self {
        Self {
            success: true,
            reports,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            reports: Vec::new(),
            error: Some(message.into()),
        }
    }
}

fn into_result(result: Result<Vec<GroupedReport>, String>) -> ReportResult {
    match result {
        Ok(reports) => ReportResult::ok(reports),
        Err(e) => ReportResult::err(e),
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

pub async fn load_grouped_reports(state: &AppState, style: ChartStyle) -> ReportResult {
    let owner_id = match settings_snapshot(state) {
        Ok(settings) => settings.owner_id,
        Err(e) => return ReportResult::err(e),
    };
    let token = state.report_loads(style).begin();
    log_info!("REPORTS", "load_grouped_reports style={:?} token={}", style, token.value());

    let fetched = state.source.fetch_all(&owner_id).await;
    apply_grouped_reports(state, token, style, fetched)
}

pub fn apply_grouped_reports(
    state: &AppState,
    token: LoadToken,
    style: ChartStyle,
    fetched: Result<Vec<ConfigBundle>, SourceError>,
) -> ReportResult {
    if !state.report_loads(style).is_current(token) {
        log_warn!("REPORTS", "discarding stale load token={}", token.value());
        return ReportResult::err(STALE_LOAD);
    }
    into_result(apply_grouped_inner(state, style, fetched))
}

fn apply_grouped_inner(
    state: &AppState,
    style: ChartStyle,
    fetched: Result<Vec<ConfigBundle>, SourceError>,
) -> Result<Vec<GroupedReport>, String> {
    let settings = settings_snapshot(state)?;
    let mut reports = lock(&state.reports, "reports")?;

    let bundles = match fetched {
        Ok(bundles) => bundles,
        Err(e) => {
            log_error!("REPORTS", "Error loading grouped data: {}", e);
            reports.shift_remove(&style);
            return Err(format!("Error loading grouped data: {}", e));
        }
    };

    let built: Vec<GroupedReport> = bundles
        .into_iter()
        .map(|bundle| {
            GroupedReport::from_bundle(bundle, style, settings.session_options(), &settings.chart_id_prefix)
        })
        .collect();
    reports.insert(style, built.clone());
    Ok(built)
}

pub fn get_grouped_reports(state: &AppState, style: ChartStyle) -> ReportResult {
    into_result(lock(&state.reports, "reports").map(|reports| reports.get(&style).cloned().unwrap_or_default()))
}

/// Single-field report. Bar unless the field is grouped as a donut.
pub async fn load_field_report(state: &AppState, config_id: &str, field: &str) -> ReportResult {
    let settings = match settings_snapshot(state) {
        Ok(settings) => settings,
        Err(e) => return ReportResult::err(e),
    };
    let bundle = match state.source.fetch_one(config_id, &settings.owner_id).await {
        Ok(bundle) => bundle,
        Err(e) => {
            log_error!("REPORTS", "Error loading report data: {}", e);
            return ReportResult::err(format!("Error loading report data: {}", e));
        }
    };

    let Some(mapping) = bundle.mappings.iter().find(|m| m.field == field || m.label == field).cloned() else {
        return ReportResult::err(format!("Field not mapped: {}", field));
    };
    let style = match mapping.report_kind {
        ReportKind::GroupBy(style) => style,
        _ => ChartStyle::Bar,
    };

    let mut session = GridSession::new(settings.session_options());
    let grouped = grid_engine::FieldMapping {
        report_kind: ReportKind::GroupBy(style),
        ..mapping
    };
    session.load(bundle.rows, vec![grouped]);

    let charts = session
        .group_series(style)
        .iter()
        .map(|series| {
            let mut spec = ChartSpec::from_series(&settings.chart_id_prefix, &bundle.config_id, series, style);
            spec.title = format!("{} - {}", bundle.display_name, series.label);
            spec
        })
        .collect();

    ReportResult::ok(vec![GroupedReport {
        config_id: bundle.config_id,
        config_name: bundle.display_name,
        connection_name: bundle.connection_name,
        error: bundle.error,
        charts,
    }])
}
