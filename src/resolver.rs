// Factory metric resolution.
//
// Every read of an actual/plan value goes through `resolve_fields`, so the
// percent and units views can never disagree about which column a factory's
// plan lives in.

use serde::Serialize;
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::layout::MetricMapping;
use crate::types::{FactorySelector, FieldPair, MetricClass, ReportRow};

/// Column pair for `selector` and `class`, or [`EngineError::Unresolved`]
/// when the mapping has no entry for the selector.
pub fn resolve_fields<'a>(
    mapping: &'a MetricMapping,
    selector: &FactorySelector,
    class: MetricClass,
) -> Result<&'a FieldPair> {
    let fields = match selector {
        FactorySelector::Aggregate => Some(&mapping.aggregate),
        FactorySelector::Factory(name) => mapping
            .factories
            .iter()
            .find(|entry| entry.key == *name)
            .map(|entry| &entry.fields),
    };
    match fields {
        Some(fields) => Ok(match class {
            MetricClass::Percent => &fields.percent,
            MetricClass::Units => &fields.units,
        }),
        None => {
            warn!(%selector, %class, "factory selector has no field mapping");
            Err(EngineError::Unresolved {
                selector: selector.clone(),
                class,
            })
        }
    }
}

/// Actual and plan values read from one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReading {
    pub actual: f64,
    pub plan: f64,
}

/// Reads a resolved pair from `row`.
///
/// Non-numeric cells read as `0`. When the row has no plan column at all,
/// `fallback_plan` (the report-wide plan percentage) is used instead.
pub fn read_metric(row: &ReportRow, fields: &FieldPair, fallback_plan: Option<f64>) -> MetricReading {
    let plan = if row.has(&fields.plan) {
        row.number(&fields.plan)
    } else {
        fallback_plan.unwrap_or(0.0)
    };
    MetricReading {
        actual: row.number(&fields.actual),
        plan,
    }
}

/// Selector choices for a picker: the aggregate first, then each factory.
pub fn factory_options(mapping: &MetricMapping) -> Vec<(FactorySelector, String)> {
    std::iter::once((FactorySelector::Aggregate, "Всего".to_string()))
        .chain(
            mapping
                .factories
                .iter()
                .map(|entry| (FactorySelector::factory(entry.key.clone()), entry.label.clone())),
        )
        .collect()
}
