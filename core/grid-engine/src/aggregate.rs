//! FILENAME: core/grid-engine/src/aggregate.rs
//! PURPOSE: Totals row (sum/average) and grouped counts for charts.
//! CONTEXT: Both are computed from the real rows only. The totals row is a
//! separate type and is never fed back into the row store, so it cannot be
//! edited, deleted, grouped or exported.
//!
//! Average policy: the sum of numeric parses divided by the number of real
//! rows. A value that fails to parse contributes 0 but its row still counts,
//! so [10, "abc", 20] averages to 10. Zero rows average to 0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::mapping::{ChartStyle, FieldMapping, ReportKind};
use crate::row::{Row, TOTALS_ROW_KEY};
use crate::value::format_number;

/// Category label used for missing or blank values in grouped counts.
pub const EMPTY_CATEGORY: &str = "∅ (empty)";

// ============================================================================
// TOTALS ROW
// ============================================================================

/// Text used when rendering the totals row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TotalsLabels {
    /// Placed in the first column
    pub marker: String,
    pub sum: String,
    pub average: String,
    /// Decimal places of averages
    pub average_precision: usize,
}

impl Default for TotalsLabels {
    fn default() -> Self {
        TotalsLabels {
            marker: "Totals".to_string(),
            sum: "Sum".to_string(),
            average: "Average".to_string(),
            average_precision: 2,
        }
    }
}

/// The synthetic summary row shown after the real rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsRow {
    pub fields: IndexMap<String, String>,
}

impl TotalsRow {
    pub fn key(&self) -> &'static str {
        TOTALS_ROW_KEY
    }

    /// Text of a field; unaggregated or unknown fields are empty.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }
}

/// Sum of the numeric parses of `field` over `rows`; failures count as 0.
pub fn sum_field(rows: &[Row], field: &str) -> f64 {
    rows.iter()
        .map(|row| row.get(field).parse_number().unwrap_or(0.0))
        .sum()
}

/// `sum_field` divided by the number of rows, 0 when there are no rows.
pub fn average_field(rows: &[Row], field: &str) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    sum_field(rows, field) / rows.len() as f64
}

/// Builds the totals row, or `None` when no mapping is summed or averaged.
///
/// `columns` is the full column field list: the first one carries the marker,
/// the rest start empty. Aggregated fields that are not among the columns are
/// appended.
pub fn compute_totals_row(
    rows: &[Row],
    mappings: &[FieldMapping],
    columns: &[&str],
    labels: &TotalsLabels,
) -> Option<TotalsRow> {
    if !mappings.iter().any(|m| m.report_kind.is_totaled()) {
        return None;
    }

    let mut fields: IndexMap<String, String> = columns
        .iter()
        .map(|field| (field.to_string(), String::new()))
        .collect();
    if let Some(first) = columns.first() {
        fields.insert(first.to_string(), labels.marker.clone());
    }

    for mapping in mappings.iter().filter(|m| m.report_kind == ReportKind::Sum) {
        let total = sum_field(rows, &mapping.field);
        fields.insert(
            mapping.field.clone(),
            format!("{}: {}", labels.sum, format_number(total)),
        );
    }

    for mapping in mappings.iter().filter(|m| m.report_kind == ReportKind::Average) {
        let average = average_field(rows, &mapping.field);
        fields.insert(
            mapping.field.clone(),
            format!(
                "{}: {:.*}",
                labels.average,
                labels.average_precision,
                if average == 0.0 { 0.0 } else { average }
            ),
        );
    }

    Some(TotalsRow { fields })
}

// ============================================================================
// GROUPED COUNTS
// ============================================================================

/// Count of rows per distinct value of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub field: String,
    pub label: String,
    /// Distinct values in first-seen order
    pub labels: Vec<String>,
    /// Parallel to `labels`
    pub counts: Vec<u64>,
}

impl ChartSeries {
    pub fn count_of(&self, category: &str) -> Option<u64> {
        self.labels
            .iter()
            .position(|l| l == category)
            .map(|i| self.counts[i])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Counts values of one field in first-seen order, blanks under `EMPTY_CATEGORY`.
pub fn group_counts(rows: &[Row], field: &str) -> IndexMap<String, u64> {
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for row in rows {
        let value = row.get(field);
        let category = if value.is_blank() {
            EMPTY_CATEGORY.to_string()
        } else {
            value.display_text()
        };
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}

/// One series per mapping grouped with `style`, in mapping order.
pub fn compute_group_series(
    rows: &[Row],
    mappings: &[FieldMapping],
    style: ChartStyle,
) -> Vec<ChartSeries> {
    mappings
        .iter()
        .filter(|m| m.report_kind == ReportKind::GroupBy(style))
        .map(|mapping| {
            let counts = group_counts(rows, &mapping.field);
            ChartSeries {
                field: mapping.field.clone(),
                label: mapping.label.clone(),
                labels: counts.keys().cloned().collect(),
                counts: counts.values().copied().collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{FieldMap, RowId};
    use crate::value::FieldValue;

    fn amount_rows(values: &[FieldValue]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut fields = FieldMap::new();
                fields.insert("Name".to_string(), FieldValue::text(format!("R{}", i)));
                fields.insert("Amount".to_string(), v.clone());
                Row::new(RowId::durable(format!("{}", i)), fields)
            })
            .collect()
    }

    #[test]
    fn test_sum_ignores_parse_failures() {
        let rows = amount_rows(&[
            FieldValue::text("10"),
            FieldValue::text("abc"),
            FieldValue::Number(20.0),
        ]);
        assert_eq!(sum_field(&rows, "Amount"), 30.0);
    }

    #[test]
    fn test_average_counts_every_real_row() {
        let rows = amount_rows(&[
            FieldValue::text("10"),
            FieldValue::text("abc"),
            FieldValue::text("20"),
        ]);
        assert_eq!(average_field(&rows, "Amount"), 10.0);
        assert_eq!(average_field(&[], "Amount"), 0.0);
    }

    #[test]
    fn test_totals_row_text() {
        let rows = amount_rows(&[FieldValue::text("10"), FieldValue::text("abc"), FieldValue::text("20")]);
        let mappings = vec![
            FieldMapping::new("$.amount", "Amount", ReportKind::Sum),
            FieldMapping::new("$.avg", "Avg", ReportKind::Average).with_field("Amount2"),
        ];
        let totals = compute_totals_row(&rows, &mappings, &["Name", "Amount"], &TotalsLabels::default())
            .unwrap();

        assert_eq!(totals.get("Name"), "Totals");
        assert_eq!(totals.get("Amount"), "Sum: 30");
        // Field missing from every row: all parses fail, average over 3 rows is 0.
        assert_eq!(totals.get("Amount2"), "Average: 0.00");
        assert_eq!(totals.fields.keys().last().map(String::as_str), Some("Amount2"));
    }

    #[test]
    fn test_totals_row_average_with_zero_rows() {
        let mappings = vec![FieldMapping::new("", "Amount", ReportKind::Average)];
        let totals = compute_totals_row(&[], &mappings, &["Name", "Amount"], &TotalsLabels::default())
            .unwrap();
        assert_eq!(totals.get("Amount"), "Average: 0.00");
    }

    #[test]
    fn test_no_totals_without_aggregated_mapping() {
        let rows = amount_rows(&[FieldValue::text("10")]);
        let mappings = vec![FieldMapping::new("", "Amount", ReportKind::None)];
        assert!(compute_totals_row(&rows, &mappings, &["Name"], &TotalsLabels::default()).is_none());
    }

    #[test]
    fn test_group_series_first_seen_order_and_empty_sentinel() {
        let rows = amount_rows(&[
            FieldValue::text("b"),
            FieldValue::text("a"),
            FieldValue::Empty,
            FieldValue::text("b"),
            FieldValue::text("  "),
        ]);
        let mappings = vec![
            FieldMapping::new("", "Amount", ReportKind::GroupBy(ChartStyle::Bar)),
            FieldMapping::new("", "Name", ReportKind::GroupBy(ChartStyle::Donut)),
        ];
        let series = compute_group_series(&rows, &mappings, ChartStyle::Bar);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].labels, vec!["b", "a", EMPTY_CATEGORY]);
        assert_eq!(series[0].counts, vec![2, 1, 2]);
        assert_eq!(series[0].total(), rows.len() as u64);
    }

    #[test]
    fn test_group_series_numbers_use_display_text() {
        let rows = amount_rows(&[FieldValue::Number(3.0), FieldValue::text("3")]);
        let mappings = vec![FieldMapping::new("", "Amount", ReportKind::GroupBy(ChartStyle::Donut))];
        let series = compute_group_series(&rows, &mappings, ChartStyle::Donut);
        assert_eq!(series[0].count_of("3"), Some(2));
    }
}
