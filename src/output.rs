use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::categorizer::Categorized;
use crate::layout::SupplyColumns;
use crate::types::{Category, CellValue, ReportRow};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of at most `max_rows` rows.
pub fn render_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table_rows(rows, max_rows));
}

/// Drill-down row of the supply report.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SupplyItemRow {
    #[serde(rename = "Название")]
    #[tabled(rename = "Название")]
    pub item: String,
    #[serde(rename = "% Обеспеченности")]
    #[tabled(rename = "% Обеспеченности")]
    pub percent: String,
    #[serde(rename = "Потребность")]
    #[tabled(rename = "Потребность")]
    pub demand: String,
    #[serde(rename = "Прогнозный дефицит")]
    #[tabled(rename = "Прогнозный дефицит")]
    pub forecast_deficit: String,
    #[serde(rename = "Ответственное лицо")]
    #[tabled(rename = "Ответственное лицо")]
    pub responsible: String,
}

/// Rows of one supply band, with missing cells shown as `-`.
pub fn supply_items(cats: &Categorized, category: Category, columns: &SupplyColumns) -> Vec<SupplyItemRow> {
    let cell = |row: &ReportRow, label: &str| -> String {
        match row.get(label) {
            Some(CellValue::Text(s)) => s.clone(),
            Some(CellValue::Number(n)) => n.to_string(),
            Some(CellValue::Bool(b)) => b.to_string(),
            Some(CellValue::Empty) | None => "-".to_string(),
        }
    };
    cats.bucket(category)
        .iter()
        .map(|row| SupplyItemRow {
            item: cell(row, &columns.item),
            percent: cell(row, &columns.percent),
            demand: cell(row, &columns.demand),
            forecast_deficit: cell(row, &columns.forecast_deficit),
            responsible: cell(row, &columns.responsible),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::{categorize, column_percent};
    use crate::layout::DEFAULT_LAYOUT;

    #[test]
    fn supply_drill_down_fills_missing_cells() {
        let rows = vec![
            ReportRow::new()
                .with("Дефицитная номенклатура", "Корпус")
                .with("% обеспеченности", 12.0)
                .with("Ответственное лицо", "Иванов"),
            ReportRow::new()
                .with("Дефицитная номенклатура", "Плата")
                .with("% обеспеченности", 75.0),
        ];
        let supply = &DEFAULT_LAYOUT.supply;
        let cats = categorize(&rows, &DEFAULT_LAYOUT.thresholds, column_percent(&supply.percent));
        let low = supply_items(&cats, Category::Low, supply);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].item, "Корпус");
        assert_eq!(low[0].percent, "12");
        assert_eq!(low[0].demand, "-");
        assert_eq!(low[0].responsible, "Иванов");
    }

    #[test]
    fn renders_markdown_and_empty_marker() {
        let rows: Vec<SupplyItemRow> = Vec::new();
        assert_eq!(render_table_rows(&rows, 5), "(no rows)");
        let rows = vec![SupplyItemRow {
            item: "Плата".into(),
            percent: "75".into(),
            demand: "10".into(),
            forecast_deficit: "0".into(),
            responsible: "-".into(),
        }];
        let table = render_table_rows(&rows, 5);
        assert!(table.contains("| Плата"));
        assert!(table.lines().count() >= 3);
    }

    #[test]
    fn writes_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![SupplyItemRow {
            item: "Плата".into(),
            percent: "75".into(),
            demand: "10".into(),
            forecast_deficit: "0".into(),
            responsible: "-".into(),
        }];
        let csv_path = dir.path().join("items.csv");
        write_csv(&csv_path, &rows).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("Название,"));

        let json_path = dir.path().join("items.json");
        write_json(&json_path, &rows).unwrap();
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(back[0]["Название"], "Плата");
    }
}
