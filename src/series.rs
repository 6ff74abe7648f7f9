// Chart-ready series.
//
// Everything here is a pure function of rows that have already been
// normalized and selected; no row is dropped at this stage, so each
// series has exactly one point per input row, in input order.

use serde::Serialize;

use crate::categorizer::CategoryCounts;
use crate::colorizer::{colorize, FULL_CAPACITY};
use crate::layout::{Palette, ReportLayout};
use crate::resolver::{read_metric, MetricReading};
use crate::types::{Category, FieldPair, ReportRow, Rgb, Status};

pub const DONE_LABEL: &str = "Выполнено";
pub const REMAINDER_LABEL: &str = "Остаток";
pub const ACTUAL_LABEL: &str = "Фактические";
pub const PLAN_LABEL: &str = "Плановые";

/// Two-slot "done vs. remainder" series for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularSeries {
    pub label: String,
    pub title: String,
    pub slot_labels: [&'static str; 2],
    pub data: [f64; 2],
    pub colors: [Rgb; 2],
    pub status: Status,
    pub plan: f64,
}

impl CircularSeries {
    pub fn new(label: impl Into<String>, reading: MetricReading, palette: &Palette) -> Self {
        let MetricReading { actual, plan } = reading;
        let (status, color) = colorize(actual, plan, palette);
        Self {
            label: label.into(),
            title: format!(
                "Фактический процент сдачи на склад: {}%, Плановый процент сдачи на склад: {}%",
                actual, plan
            ),
            slot_labels: [DONE_LABEL, REMAINDER_LABEL],
            data: [actual, (FULL_CAPACITY - actual).max(0.0)],
            colors: [color, palette.remainder],
            status,
            plan,
        }
    }
}

/// One circular series per row, labelled by the row's category name.
pub fn circular_series(
    rows: &[ReportRow],
    fields: &FieldPair,
    fallback_plan: Option<f64>,
    layout: &ReportLayout,
) -> Vec<CircularSeries> {
    rows.iter()
        .map(|row| {
            CircularSeries::new(
                row_label(row, layout),
                read_metric(row, fields, fallback_plan),
                &layout.palette,
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: &'static str,
    pub data: Vec<f64>,
    /// One colour per point.
    pub colors: Vec<Rgb>,
}

/// Actual vs. plan bars across all summary rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSeries {
    pub labels: Vec<String>,
    pub statuses: Vec<Status>,
    pub actual: Dataset,
    pub plan: Dataset,
}

impl GroupedSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn grouped_series(
    rows: &[ReportRow],
    fields: &FieldPair,
    fallback_plan: Option<f64>,
    layout: &ReportLayout,
) -> GroupedSeries {
    let palette = &layout.palette;
    let mut labels = Vec::with_capacity(rows.len());
    let mut statuses = Vec::with_capacity(rows.len());
    let mut actual = Vec::with_capacity(rows.len());
    let mut actual_colors = Vec::with_capacity(rows.len());
    let mut plan = Vec::with_capacity(rows.len());

    for row in rows {
        let reading = read_metric(row, fields, fallback_plan);
        let (status, color) = colorize(reading.actual, reading.plan, palette);
        labels.push(row_label(row, layout));
        statuses.push(status);
        actual.push(reading.actual);
        actual_colors.push(color);
        plan.push(reading.plan);
    }

    GroupedSeries {
        labels,
        statuses,
        actual: Dataset {
            label: ACTUAL_LABEL,
            data: actual,
            colors: actual_colors,
        },
        plan: Dataset {
            label: PLAN_LABEL,
            colors: vec![palette.plan; plan.len()],
            data: plan,
        },
    }
}

/// Row counts per band, for the supply distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySeries {
    pub labels: Vec<&'static str>,
    pub categories: Vec<Category>,
    pub data: Vec<usize>,
    pub colors: Vec<Rgb>,
}

pub fn category_series(counts: &CategoryCounts, palette: &Palette) -> CategorySeries {
    CategorySeries {
        labels: Category::ALL.iter().map(Category::label).collect(),
        categories: Category::ALL.to_vec(),
        data: Category::ALL.iter().map(|c| counts.get(*c)).collect(),
        colors: vec![palette.low, palette.medium, palette.high],
    }
}

fn row_label(row: &ReportRow, layout: &ReportLayout) -> String {
    row.text(&layout.name_column).unwrap_or_default().to_string()
}
