use tracing::debug;

use crate::layout::ReportLayout;
use crate::types::ReportRow;

/// Keeps only subtotal and grand-total rows, in their original order.
///
/// Line-item rows are dropped without error.
pub fn select_summary_rows(rows: &[ReportRow], layout: &ReportLayout) -> Vec<ReportRow> {
    let selected: Vec<ReportRow> = rows
        .iter()
        .filter(|row| is_summary_row(row, layout))
        .cloned()
        .collect();
    debug!(
        kept = selected.len(),
        dropped = rows.len() - selected.len(),
        "selected summary rows"
    );
    selected
}

pub fn is_summary_row(row: &ReportRow, layout: &ReportLayout) -> bool {
    row.text(&layout.name_column)
        .is_some_and(|name| layout.is_summary_label(name))
}

/// First row named `label`, if any.
pub fn find_row<'a>(rows: &'a [ReportRow], label: &str, layout: &ReportLayout) -> Option<&'a ReportRow> {
    rows.iter()
        .find(|row| row.text(&layout.name_column) == Some(label))
}
