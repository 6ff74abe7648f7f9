// Report layout: every column label, marker, threshold and colour the
// engine reads. The built-in layout matches the production summary
// ("Сводка по сбыту") and supply reports; a JSON file can override any part.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::types::{FieldPair, Rgb};

/// Environment variable naming an optional layout override file.
pub const LAYOUT_ENV: &str = "REPORT_LAYOUT";

pub static DEFAULT_LAYOUT: Lazy<ReportLayout> = Lazy::new(ReportLayout::builtin);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    /// Column carrying the product / category name of each row.
    pub name_column: String,
    /// Category name of the grand-total row.
    pub grand_total: String,
    /// Category names of the subtotal rows, in display order.
    pub subtotals: Vec<String>,
    pub mapping: MetricMapping,
    pub thresholds: CategoryThresholds,
    pub supply: SupplyColumns,
    pub palette: Palette,
}

/// Field pairs for one factory scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryFields {
    pub percent: FieldPair,
    pub units: FieldPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryEntry {
    /// Selector key, e.g. `Маркс`.
    pub key: String,
    /// Human-readable option label, e.g. `Счетчики (Маркс)`.
    pub label: String,
    #[serde(flatten)]
    pub fields: FactoryFields,
}

/// The single declaration of which columns hold actual and plan values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMapping {
    pub aggregate: FactoryFields,
    pub factories: Vec<FactoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    /// Lowest percentage that counts as `medium`.
    pub medium_from: f64,
    /// Lowest percentage that counts as `high`.
    pub high_from: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            medium_from: 30.0,
            high_from: 60.0,
        }
    }
}

/// Columns of the supply (provision) report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyColumns {
    pub item: String,
    pub percent: String,
    pub demand: String,
    pub forecast_deficit: String,
    pub responsible: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub behind: Rgb,
    pub on_track: Rgb,
    pub met: Rgb,
    pub remainder: Rgb,
    pub plan: Rgb,
    pub low: Rgb,
    pub medium: Rgb,
    pub high: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            behind: Rgb(252, 0, 0),
            on_track: Rgb(251, 255, 0),
            met: Rgb(0, 255, 42),
            remainder: Rgb(200, 200, 200),
            plan: Rgb(0, 26, 255),
            low: Rgb(252, 0, 0),
            medium: Rgb(255, 205, 86),
            high: Rgb(0, 255, 42),
        }
    }
}

impl Default for SupplyColumns {
    fn default() -> Self {
        Self {
            item: "Дефицитная номенклатура".into(),
            percent: "% обеспеченности".into(),
            demand: "Потребность".into(),
            forecast_deficit: "Прогнозный дефицит".into(),
            responsible: "Ответственное лицо".into(),
        }
    }
}

impl Default for MetricMapping {
    fn default() -> Self {
        let factory = |key: &str| FactoryEntry {
            key: key.to_string(),
            label: format!("Счетчики ({})", key),
            fields: FactoryFields {
                percent: FieldPair::new(
                    format!("Фактический % выполнения плана - {}", key),
                    format!("Плановый % сдачи на склад - {}", key),
                ),
                units: FieldPair::new(
                    format!("Сдача на склад сбыта - {}", key),
                    format!("Плановый % сдачи на склад - {}", key),
                ),
            },
        };
        Self {
            aggregate: FactoryFields {
                percent: FieldPair::new(
                    "Фактический % выполнения плана - всего",
                    "Плановый % сдачи на склад",
                ),
                units: FieldPair::new("Сдача на склад сбыта - всего", "Плановый % сдачи на склад"),
            },
            factories: vec![factory("Маркс"), factory("ОП Москва")],
        }
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReportLayout {
    fn builtin() -> Self {
        Self {
            name_column: "Наименование продукции".into(),
            grand_total: "ВСЕГО".into(),
            subtotals: vec![
                "Итого (однофазные)".into(),
                "Итого (трехфазные)".into(),
                "Итого (перепрошивка)".into(),
            ],
            mapping: MetricMapping::default(),
            thresholds: CategoryThresholds::default(),
            supply: SupplyColumns::default(),
            palette: Palette::default(),
        }
    }

    /// Reads a JSON override. Missing keys fall back to the built-in values;
    /// a missing file yields the built-in layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "layout file not found, using built-in layout");
            return Ok(DEFAULT_LAYOUT.clone());
        }
        let content = std::fs::read_to_string(path)?;
        let layout: ReportLayout = serde_json::from_str(&content)?;
        layout.validate()?;
        debug!(path = %path.display(), factories = layout.mapping.factories.len(), "layout loaded");
        Ok(layout)
    }

    /// Layout named by `REPORT_LAYOUT`, or the built-in one.
    pub fn from_env() -> Result<Self> {
        match std::env::var(LAYOUT_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(DEFAULT_LAYOUT.clone()),
        }
    }

    /// Summary-row labels: subtotals first, grand total last.
    pub fn summary_labels(&self) -> impl Iterator<Item = &str> {
        self.subtotals
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.grand_total.as_str()))
    }

    pub fn is_summary_label(&self, name: &str) -> bool {
        self.summary_labels().any(|label| label == name)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(EngineError::Layout(msg));

        if self.name_column.trim().is_empty() {
            return bad("name_column is empty".into());
        }
        if self.grand_total.trim().is_empty() {
            return bad("grand_total is empty".into());
        }
        if self.subtotals.iter().any(|s| s == &self.grand_total) {
            return bad(format!("`{}` is both a subtotal and the grand total", self.grand_total));
        }

        let t = self.thresholds;
        if !(t.medium_from.is_finite() && t.high_from.is_finite()) || t.medium_from >= t.high_from {
            return bad(format!(
                "thresholds must satisfy medium_from < high_from (got {} / {})",
                t.medium_from, t.high_from
            ));
        }

        check_fields("aggregate", &self.mapping.aggregate)?;
        let mut seen = HashSet::new();
        for entry in &self.mapping.factories {
            let key = entry.key.trim();
            if key.is_empty() {
                return bad("factory key is empty".into());
            }
            if key.to_lowercase() == crate::types::FactorySelector::AGGREGATE_KEY {
                return bad(format!("factory key `{}` is reserved for the aggregate", key));
            }
            if !seen.insert(key) {
                return bad(format!("factory `{}` is declared twice", key));
            }
            check_fields(key, &entry.fields)?;
        }
        Ok(())
    }
}

fn check_fields(scope: &str, fields: &FactoryFields) -> Result<()> {
    for pair in [&fields.percent, &fields.units] {
        if pair.actual.trim().is_empty() || pair.plan.trim().is_empty() {
            return Err(EngineError::Layout(format!("{}: empty field label", scope)));
        }
    }
    if fields.percent == fields.units {
        return Err(EngineError::Layout(format!(
            "{}: percent and units read the same columns",
            scope
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_layout_is_valid() {
        DEFAULT_LAYOUT.validate().unwrap();
        let labels: Vec<&str> = DEFAULT_LAYOUT.summary_labels().collect();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.last(), Some(&"ВСЕГО"));
    }

    #[test]
    fn missing_file_gives_default() {
        let layout = ReportLayout::load("/definitely/not/here.json").unwrap();
        assert_eq!(layout, *DEFAULT_LAYOUT);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"grand_total": "Итого по заводу"}}"#).unwrap();
        let layout = ReportLayout::load(file.path()).unwrap();
        assert_eq!(layout.grand_total, "Итого по заводу");
        assert_eq!(layout.name_column, DEFAULT_LAYOUT.name_column);
        assert_eq!(layout.mapping, DEFAULT_LAYOUT.mapping);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut layout = ReportLayout::default();
        layout.thresholds.medium_from = 70.0;
        assert!(matches!(layout.validate(), Err(EngineError::Layout(_))));
    }

    #[test]
    fn rejects_identical_percent_and_units_pairs() {
        let mut layout = ReportLayout::default();
        layout.mapping.factories[0].fields.units = layout.mapping.factories[0].fields.percent.clone();
        assert!(layout.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_factories() {
        let mut layout = ReportLayout::default();
        let dup = layout.mapping.factories[0].clone();
        layout.mapping.factories.push(dup);
        assert!(layout.validate().is_err());
    }

    #[test]
    fn palette_round_trips_as_css_strings() {
        let json = serde_json::to_string(&Palette::default()).unwrap();
        assert!(json.contains("\"behind\":\"rgb(252, 0, 0)\""));
        let back: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Palette::default());
    }
}
