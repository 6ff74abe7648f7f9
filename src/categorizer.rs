use serde::Serialize;

use crate::layout::CategoryThresholds;
use crate::types::{Category, FieldPair, ReportRow};

/// Band for a percentage. Non-finite input counts as `0`.
pub fn classify(percent: f64, thresholds: &CategoryThresholds) -> Category {
    let p = if percent.is_finite() { percent } else { 0.0 };
    if p < thresholds.medium_from {
        Category::Low
    } else if p < thresholds.high_from {
        Category::Medium
    } else {
        Category::High
    }
}

/// Rows partitioned into the three bands; every input row lands in exactly one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Categorized {
    pub low: Vec<ReportRow>,
    pub medium: Vec<ReportRow>,
    pub high: Vec<ReportRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Low => self.low,
            Category::Medium => self.medium,
            Category::High => self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

impl Categorized {
    /// Rows of one band, for drill-down tables.
    pub fn bucket(&self, category: Category) -> &[ReportRow] {
        match category {
            Category::Low => &self.low,
            Category::Medium => &self.medium,
            Category::High => &self.high,
        }
    }

    pub fn counts(&self) -> CategoryCounts {
        CategoryCounts {
            low: self.low.len(),
            medium: self.medium.len(),
            high: self.high.len(),
        }
    }

    fn push(&mut self, category: Category, row: ReportRow) {
        match category {
            Category::Low => self.low.push(row),
            Category::Medium => self.medium.push(row),
            Category::High => self.high.push(row),
        }
    }
}

/// Buckets `rows` by the percentage `extract` reads from each row.
pub fn categorize<F>(rows: &[ReportRow], thresholds: &CategoryThresholds, extract: F) -> Categorized
where
    F: Fn(&ReportRow) -> f64,
{
    let mut out = Categorized::default();
    for row in rows {
        out.push(classify(extract(row), thresholds), row.clone());
    }
    out
}

/// Extractor reading a plain percentage column (e.g. `% обеспеченности`).
pub fn column_percent(label: &str) -> impl Fn(&ReportRow) -> f64 + '_ {
    move |row: &ReportRow| row.number(label)
}

/// Extractor reading the actual side of a resolved pair; the plan is ignored.
pub fn actual_percent(fields: &FieldPair) -> impl Fn(&ReportRow) -> f64 + '_ {
    move |row: &ReportRow| row.number(&fields.actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> CategoryThresholds {
        CategoryThresholds::default()
    }

    #[test]
    fn boundaries() {
        assert_eq!(classify(29.999, &t()), Category::Low);
        assert_eq!(classify(30.0, &t()), Category::Medium);
        assert_eq!(classify(59.999, &t()), Category::Medium);
        assert_eq!(classify(60.0, &t()), Category::High);
        assert_eq!(classify(250.0, &t()), Category::High);
        assert_eq!(classify(-5.0, &t()), Category::Low);
        assert_eq!(classify(f64::NAN, &t()), Category::Low);
    }

    #[test]
    fn partitions_every_row_once() {
        let rows: Vec<ReportRow> = [0.0, 12.0, 30.0, 45.5, 60.0, 99.0]
            .iter()
            .map(|p| ReportRow::new().with("% обеспеченности", *p))
            .chain(std::iter::once(
                ReportRow::new().with("% обеспеченности", "нет данных"),
            ))
            .chain(std::iter::once(ReportRow::new()))
            .collect();

        let cats = categorize(&rows, &t(), column_percent("% обеспеченности"));
        let counts = cats.counts();
        assert_eq!(counts, CategoryCounts { low: 4, medium: 2, high: 2 });
        assert_eq!(counts.total(), rows.len());

        let mut rejoined: Vec<ReportRow> = Category::ALL
            .iter()
            .flat_map(|c| cats.bucket(*c).to_vec())
            .collect();
        let mut original = rows.clone();
        let key = |r: &ReportRow| format!("{:?}", r);
        rejoined.sort_by_key(key);
        original.sort_by_key(key);
        assert_eq!(rejoined, original);
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        let cats = categorize(&[], &t(), |_| 50.0);
        assert_eq!(cats.counts().total(), 0);
    }

    #[test]
    fn actual_extractor_ignores_plan() {
        let fields = FieldPair::new("a", "p");
        let row = ReportRow::new().with("a", 85.0).with("p", 90.0);
        let cats = categorize(std::slice::from_ref(&row), &t(), actual_percent(&fields));
        assert_eq!(cats.high, vec![row]);
    }
}
