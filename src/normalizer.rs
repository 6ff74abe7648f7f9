use tracing::debug;

use crate::layout::ReportLayout;
use crate::types::{CellValue, ReportRow};

/// Returns a row set that contains a grand-total row.
///
/// If no row is named with the grand-total marker, a copy of the last row is
/// renamed to the marker and appended. When several rows carry the marker
/// only the first is kept. The input is never modified, an already-normalized
/// set comes back unchanged, and an empty set stays empty.
pub fn ensure_grand_total(rows: &[ReportRow], layout: &ReportLayout) -> Vec<ReportRow> {
    if has_grand_total(rows, layout) {
        let mut seen = false;
        let out: Vec<ReportRow> = rows
            .iter()
            .filter(|row| !is_grand_total(row, layout) || !std::mem::replace(&mut seen, true))
            .cloned()
            .collect();
        if out.len() < rows.len() {
            debug!(dropped = rows.len() - out.len(), marker = %layout.grand_total, "dropped duplicate grand-total rows");
        }
        return out;
    }
    let mut out = rows.to_vec();
    let Some(last) = rows.last() else {
        return out;
    };
    let total = last
        .clone()
        .with(layout.name_column.as_str(), CellValue::Text(layout.grand_total.clone()));
    debug!(rows = rows.len(), marker = %layout.grand_total, "synthesized grand-total row from last row");
    out.push(total);
    out
}

pub fn has_grand_total(rows: &[ReportRow], layout: &ReportLayout) -> bool {
    rows.iter().any(|row| is_grand_total(row, layout))
}

fn is_grand_total(row: &ReportRow, layout: &ReportLayout) -> bool {
    row.text(&layout.name_column) == Some(layout.grand_total.as_str())
}
