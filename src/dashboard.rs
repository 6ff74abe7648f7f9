// Dashboard session state.
//
// The session owns exactly three inputs: the current report (replaced as a
// whole on every upload) and the two independent factory selectors. Every
// view is recomputed from those inputs on request and holds no state of
// its own.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::categorizer::{actual_percent, categorize, classify, column_percent, Categorized};
use crate::colorizer::status;
use crate::error::{EngineError, SourceError};
use crate::layout::ReportLayout;
use crate::loader::{ReportData, ReportSource};
use crate::normalizer::ensure_grand_total;
use crate::resolver::{read_metric, resolve_fields};
use crate::series::{
    category_series, circular_series, grouped_series, CategorySeries, CircularSeries,
    GroupedSeries,
};
use crate::summary::{find_row, select_summary_rows};
use crate::types::{
    Category, ClassifiedRow, FactorySelector, FieldPair, MetricClass, ReportRow, Status,
};
use crate::util::format_number;

/// Immutable snapshot of one upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSet {
    /// Rows exactly as received in `summary`.
    pub raw: Vec<ReportRow>,
    /// Normalized and filtered summary rows.
    pub summary: Vec<ReportRow>,
    pub all_data: Vec<ReportRow>,
    pub plan_percent: Option<f64>,
}

impl ReportSet {
    pub fn build(data: ReportData, layout: &ReportLayout) -> Self {
        let normalized = ensure_grand_total(&data.summary, layout);
        let summary = select_summary_rows(&normalized, layout);
        Self {
            raw: data.summary,
            summary,
            all_data: data.all_data,
            plan_percent: data.plan_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardState {
    Empty,
    Loading,
    Ready,
    NoData { reason: String },
}

/// Handle for one upload; only the newest ticket may install its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// A view that is either computed or explains why there is nothing to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    NoData { reason: String },
}

impl<T> Panel<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Panel::Ready(v) => Some(v),
            Panel::NoData { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Panel::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Panel<U> {
        match self {
            Panel::Ready(v) => Panel::Ready(f(v)),
            Panel::NoData { reason } => Panel::NoData { reason },
        }
    }
}

/// Per-row classification under the percent selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowClassification {
    pub name: String,
    pub actual: f64,
    pub plan: f64,
    pub category: Category,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Local>,
    #[serde(flatten)]
    pub state: DashboardState,
    pub percent_selector: FactorySelector,
    pub units_selector: FactorySelector,
    pub plan_percent: Option<f64>,
    pub summary: Vec<ReportRow>,
    pub classifications: Panel<Vec<RowClassification>>,
    pub percent: Panel<Vec<CircularSeries>>,
    pub units: Panel<GroupedSeries>,
    pub supply: Panel<CategorySeries>,
}

pub struct Dashboard {
    layout: Arc<ReportLayout>,
    report: Arc<ReportSet>,
    percent_selector: FactorySelector,
    units_selector: FactorySelector,
    issued: u64,
    state: DashboardState,
}

impl Dashboard {
    /// Session over `layout`; a layout that fails `validate()` is rejected.
    pub fn new(layout: ReportLayout) -> Result<Self, EngineError> {
        layout.validate()?;
        Ok(Self::with_layout(layout))
    }

    fn with_layout(layout: ReportLayout) -> Self {
        Self {
            layout: Arc::new(layout),
            report: Arc::new(ReportSet::default()),
            percent_selector: FactorySelector::Aggregate,
            units_selector: FactorySelector::Aggregate,
            issued: 0,
            state: DashboardState::Empty,
        }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Current report; readers keep their `Arc` even if a newer upload lands.
    pub fn report(&self) -> Arc<ReportSet> {
        Arc::clone(&self.report)
    }

    pub fn percent_selector(&self) -> &FactorySelector {
        &self.percent_selector
    }

    pub fn units_selector(&self) -> &FactorySelector {
        &self.units_selector
    }

    pub fn set_percent_selector(&mut self, selector: FactorySelector) {
        debug!(%selector, "percent selector changed");
        self.percent_selector = selector;
    }

    pub fn set_units_selector(&mut self, selector: FactorySelector) {
        debug!(%selector, "units selector changed");
        self.units_selector = selector;
    }

    /// Starts an upload. Any earlier ticket becomes stale.
    pub fn begin_upload(&mut self) -> UploadTicket {
        self.issued += 1;
        self.state = DashboardState::Loading;
        UploadTicket(self.issued)
    }

    /// Installs an upload result. Returns `false` when `ticket` was
    /// superseded by a newer upload; the result is then discarded.
    pub fn apply_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<ReportData, SourceError>,
    ) -> bool {
        if ticket.0 != self.issued {
            info!(ticket = ticket.0, newest = self.issued, "discarding superseded upload");
            return false;
        }
        match result {
            Ok(data) => {
                let set = ReportSet::build(data, &self.layout);
                info!(
                    raw_rows = set.raw.len(),
                    summary_rows = set.summary.len(),
                    "report installed"
                );
                self.report = Arc::new(set);
                self.state = DashboardState::Ready;
            }
            Err(err) => {
                warn!(error = %err, "upload failed");
                self.report = Arc::new(ReportSet::default());
                self.state = DashboardState::NoData {
                    reason: err.to_string(),
                };
            }
        }
        true
    }

    /// Fetches from `source` and installs the result.
    pub fn load(&mut self, source: &dyn ReportSource) -> bool {
        let ticket = self.begin_upload();
        self.apply_upload(ticket, source.fetch())
    }

    fn fields(&self, class: MetricClass) -> Result<FieldPair, String> {
        if let DashboardState::NoData { reason } = &self.state {
            return Err(reason.clone());
        }
        let selector = match class {
            MetricClass::Percent => &self.percent_selector,
            MetricClass::Units => &self.units_selector,
        };
        resolve_fields(&self.layout.mapping, selector, class)
            .cloned()
            .map_err(|e| e.to_string())
    }

    /// Circular series for the rows of interest (subtotals, then grand
    /// total) under the percent selector.
    pub fn percent_panel(&self) -> Panel<Vec<CircularSeries>> {
        let fields = match self.fields(MetricClass::Percent) {
            Ok(f) => f,
            Err(reason) => return Panel::NoData { reason },
        };
        let report = self.report();
        let rows: Vec<ReportRow> = self
            .layout
            .summary_labels()
            .filter_map(|label| find_row(&report.summary, label, &self.layout))
            .cloned()
            .collect();
        Panel::Ready(circular_series(&rows, &fields, report.plan_percent, &self.layout))
    }

    /// Actual vs. plan bars over all summary rows under the units selector.
    pub fn units_panel(&self) -> Panel<GroupedSeries> {
        let fields = match self.fields(MetricClass::Units) {
            Ok(f) => f,
            Err(reason) => return Panel::NoData { reason },
        };
        let report = self.report();
        Panel::Ready(grouped_series(&report.summary, &fields, None, &self.layout))
    }

    pub fn classifications(&self) -> Panel<Vec<RowClassification>> {
        let fields = match self.fields(MetricClass::Percent) {
            Ok(f) => f,
            Err(reason) => return Panel::NoData { reason },
        };
        let report = self.report();
        let rows = report
            .summary
            .iter()
            .map(|row| {
                let reading = read_metric(row, &fields, report.plan_percent);
                RowClassification {
                    name: row.text(&self.layout.name_column).unwrap_or_default().to_string(),
                    actual: reading.actual,
                    plan: reading.plan,
                    category: classify(reading.actual, &self.layout.thresholds),
                    status: status(reading.actual, reading.plan),
                }
            })
            .collect();
        Panel::Ready(rows)
    }

    /// Summary rows bucketed by the actual percentage under the percent selector.
    pub fn summary_categories(&self) -> Panel<Categorized> {
        let fields = match self.fields(MetricClass::Percent) {
            Ok(f) => f,
            Err(reason) => return Panel::NoData { reason },
        };
        let report = self.report();
        Panel::Ready(categorize(
            &report.summary,
            &self.layout.thresholds,
            actual_percent(&fields),
        ))
    }

    /// Supply-report rows bucketed by their provision percentage. Only rows
    /// that carry the provision column take part, so a production report
    /// has no supply view.
    pub fn supply_categories(&self) -> Panel<Categorized> {
        if let DashboardState::NoData { reason } = &self.state {
            return Panel::NoData {
                reason: reason.clone(),
            };
        }
        let report = self.report();
        let column = &self.layout.supply.percent;
        let source = if report.all_data.is_empty() {
            &report.raw
        } else {
            &report.all_data
        };
        let rows: Vec<ReportRow> = source.iter().filter(|row| row.has(column)).cloned().collect();
        if rows.is_empty() {
            debug!(column = %column, "no supply rows in report");
            return Panel::NoData {
                reason: format!("no rows with column \"{}\"", column),
            };
        }
        Panel::Ready(categorize(&rows, &self.layout.thresholds, column_percent(column)))
    }

    pub fn supply_series(&self) -> Panel<CategorySeries> {
        self.supply_categories()
            .map(|cats| category_series(&cats.counts(), &self.layout.palette))
    }

    /// Classification table rows with formatted numbers, for export.
    pub fn classified_rows(&self) -> Vec<ClassifiedRow> {
        self.classifications()
            .ready()
            .unwrap_or_default()
            .into_iter()
            .map(|c| ClassifiedRow {
                name: c.name,
                actual: format_number(c.actual, 2),
                plan: format_number(c.plan, 2),
                category: c.category.to_string(),
                status: c.status.to_string(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let report = self.report();
        DashboardSnapshot {
            generated_at: Local::now(),
            state: self.state.clone(),
            percent_selector: self.percent_selector.clone(),
            units_selector: self.units_selector.clone(),
            plan_percent: report.plan_percent,
            summary: report.summary.clone(),
            classifications: self.classifications(),
            percent: self.percent_panel(),
            units: self.units_panel(),
            supply: self.supply_series(),
        }
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::with_layout(ReportLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "Наименование продукции";

    fn production_row(name: &str, total_pct: f64, marx_units: f64) -> ReportRow {
        ReportRow::new()
            .with(NAME, name)
            .with("Фактический % выполнения плана - всего", total_pct)
            .with("Плановый % сдачи на склад", 90.0)
            .with("Сдача на склад сбыта - всего", total_pct * 10.0)
            .with("Сдача на склад сбыта - Маркс", marx_units)
            .with("Плановый % сдачи на склад - Маркс", 50.0)
    }

    fn data(rows: Vec<ReportRow>) -> ReportData {
        ReportData {
            summary: rows,
            ..Default::default()
        }
    }

    #[test]
    fn stale_upload_is_discarded() {
        let mut dash = Dashboard::default();
        let first = dash.begin_upload();
        let second = dash.begin_upload();

        assert!(dash.apply_upload(second, Ok(data(vec![production_row("ВСЕГО", 70.0, 1.0)]))));
        assert!(!dash.apply_upload(first, Ok(data(vec![]))));
        assert_eq!(dash.report().summary.len(), 1);
        assert_eq!(dash.state(), &DashboardState::Ready);
    }

    #[test]
    fn upload_replaces_report_wholesale() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(t, Ok(data(vec![production_row("Итого (однофазные)", 40.0, 1.0)])));
        let before = dash.report();

        let t = dash.begin_upload();
        dash.apply_upload(t, Ok(data(vec![production_row("Итого (трехфазные)", 65.0, 2.0)])));
        let after = dash.report();

        assert_eq!(before.summary[0].text(NAME), Some("Итого (однофазные)"));
        assert_eq!(after.summary[0].text(NAME), Some("Итого (трехфазные)"));
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn failure_maps_to_no_data() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(t, Err(SourceError::Status(502)));
        assert!(matches!(dash.state(), DashboardState::NoData { .. }));
        assert!(!dash.percent_panel().is_ready());
        assert!(!dash.units_panel().is_ready());
        assert!(dash.report().summary.is_empty());
    }

    #[test]
    fn selectors_are_independent() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(t, Ok(data(vec![production_row("ВСЕГО", 80.0, 30.0)])));

        dash.set_units_selector(FactorySelector::factory("Маркс"));
        assert_eq!(dash.percent_selector(), &FactorySelector::Aggregate);

        let units = dash.units_panel().ready().unwrap();
        assert_eq!(units.actual.data, [30.0]);
        assert_eq!(units.plan.data, [50.0]);
        assert_eq!(units.statuses, [Status::Behind]);

        let pct = dash.percent_panel().ready().unwrap();
        assert_eq!(pct[0].data, [80.0, 20.0]);
        assert_eq!(pct[0].status, Status::Behind);
    }

    #[test]
    fn unknown_selector_is_visible_no_data() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(t, Ok(data(vec![production_row("ВСЕГО", 80.0, 30.0)])));
        dash.set_percent_selector(FactorySelector::factory("Тула"));

        match dash.percent_panel() {
            Panel::NoData { reason } => assert!(reason.contains("Тула")),
            Panel::Ready(_) => panic!("expected no data"),
        }
        assert!(dash.units_panel().is_ready());
    }

    #[test]
    fn percent_panel_follows_fixed_order() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(
            t,
            Ok(data(vec![
                production_row("ВСЕГО", 75.0, 0.0),
                production_row("Итого (трехфазные)", 65.0, 0.0),
                production_row("Итого (однофазные)", 40.0, 0.0),
            ])),
        );
        let labels: Vec<String> = dash
            .percent_panel()
            .ready()
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, ["Итого (однофазные)", "Итого (трехфазные)", "ВСЕГО"]);
    }

    #[test]
    fn global_plan_fills_missing_plan_column() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        let row = ReportRow::new()
            .with(NAME, "ВСЕГО")
            .with("Фактический % выполнения плана - всего", 95.0);
        dash.apply_upload(
            t,
            Ok(ReportData {
                summary: vec![row],
                all_data: vec![],
                plan_percent: Some(97.0),
            }),
        );
        let pct = dash.percent_panel().ready().unwrap();
        assert_eq!(pct[0].plan, 97.0);
        assert_eq!(pct[0].status, Status::Behind);
    }

    #[test]
    fn supply_report_categorizes_raw_rows() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        let rows = [10.0, 35.0, 59.0, 60.0, 100.0]
            .iter()
            .map(|p| {
                ReportRow::new()
                    .with("Дефицитная номенклатура", "Плата")
                    .with("% обеспеченности", *p)
            })
            .collect();
        dash.apply_upload(t, Ok(data(rows)));

        let cats = dash.supply_categories().ready().unwrap();
        assert_eq!(cats.bucket(Category::Low).len(), 1);
        assert_eq!(cats.bucket(Category::Medium).len(), 2);
        assert_eq!(cats.bucket(Category::High).len(), 2);
        assert_eq!(dash.supply_series().ready().unwrap().data, [1, 2, 2]);
    }

    #[test]
    fn production_report_has_no_supply_view() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(
            t,
            Ok(data(vec![
                production_row("Итого (однофазные)", 85.0, 3.0),
                production_row("ВСЕГО", 85.0, 3.0),
            ])),
        );
        assert!(dash.percent_panel().is_ready());
        assert!(!dash.supply_categories().is_ready());
        assert!(!dash.supply_series().is_ready());

        let json = serde_json::to_value(dash.snapshot()).unwrap();
        assert_eq!(json["supply"]["kind"], "no_data");
    }

    #[test]
    fn supply_skips_rows_without_provision_column() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        let rows = vec![
            ReportRow::new()
                .with("Дефицитная номенклатура", "Плата")
                .with("% обеспеченности", 75.0),
            ReportRow::new().with("Дефицитная номенклатура", "Итого"),
        ];
        dash.apply_upload(t, Ok(data(rows)));
        assert_eq!(dash.supply_series().ready().unwrap().data, [0, 0, 1]);
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let mut layout = ReportLayout::default();
        layout.thresholds.medium_from = 70.0;
        assert!(matches!(Dashboard::new(layout), Err(EngineError::Layout(_))));

        let dash = Dashboard::new(ReportLayout::default()).unwrap();
        assert_eq!(dash.state(), &DashboardState::Empty);
    }

    #[test]
    fn snapshot_serializes() {
        let mut dash = Dashboard::default();
        let t = dash.begin_upload();
        dash.apply_upload(t, Ok(data(vec![production_row("Итого (однофазные)", 85.0, 3.0)])));
        let json = serde_json::to_value(dash.snapshot()).unwrap();
        assert_eq!(json["state"], "ready");
        assert_eq!(json["percent_selector"], "всего");
        assert_eq!(json["percent"]["kind"], "ready");
        assert_eq!(json["summary"].as_array().unwrap().len(), 2);
        assert_eq!(dash.classified_rows().len(), 2);
    }
}
