use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

use crate::util::coerce_number;

/// One scalar cell of a parsed report row.
///
/// Upstream parsing hands over whatever the spreadsheet contained, so a
/// cell can be a number, free text, a boolean flag or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// A single report row: column label -> cell.
///
/// Column labels are whatever the report header said (usually Russian),
/// and the set of columns depends on the report type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRow {
    cells: BTreeMap<String, CellValue>,
}

impl ReportRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter; returns a new row with `label` set to `value`.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(label.into(), value.into());
        self
    }

    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.cells.get(label)
    }

    pub fn has(&self, label: &str) -> bool {
        self.cells.contains_key(label)
    }

    /// Text content of a cell, if the cell holds text.
    pub fn text(&self, label: &str) -> Option<&str> {
        match self.cells.get(label) {
            Some(CellValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric content of a cell. Missing and non-numeric cells read as `0`.
    pub fn number(&self, label: &str) -> f64 {
        self.cells.get(label).map(coerce_number).unwrap_or(0.0)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for ReportRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Whether a lookup targets the percentage-of-plan view or the unit-count view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricClass {
    Percent,
    Units,
}

impl fmt::Display for MetricClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricClass::Percent => write!(f, "percent"),
            MetricClass::Units => write!(f, "units"),
        }
    }
}

/// Scope for reading actual/plan values: all factories combined, or one factory.
///
/// Serialized as its key (`"всего"` or the factory name), the same form
/// `from_key` reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FactorySelector {
    #[default]
    Aggregate,
    Factory(String),
}

impl FactorySelector {
    /// Key used by the upload UI for the aggregate choice.
    pub const AGGREGATE_KEY: &'static str = "всего";

    pub fn factory(name: impl Into<String>) -> Self {
        FactorySelector::Factory(name.into())
    }

    /// Parses a selector key as sent by the presentation layer.
    pub fn from_key(key: &str) -> Self {
        let key = key.trim();
        if key.is_empty() || key.to_lowercase() == Self::AGGREGATE_KEY {
            FactorySelector::Aggregate
        } else {
            FactorySelector::Factory(key.to_string())
        }
    }
}

impl fmt::Display for FactorySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorySelector::Aggregate => write!(f, "{}", Self::AGGREGATE_KEY),
            FactorySelector::Factory(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for FactorySelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FactorySelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(FactorySelector::from_key(&key))
    }
}

/// Column labels to read the actual and the planned value from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPair {
    pub actual: String,
    pub plan: String,
}

impl FieldPair {
    pub fn new(actual: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            actual: actual.into(),
            plan: plan.into(),
        }
    }
}

// ==========================================
// Classifications
// ==========================================

/// Percentage band of a row: `< 30` low, `30..60` medium, `>= 60` high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Low,
    Medium,
    High,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Low, Category::Medium, Category::High];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Low => "Низкий процент",
            Category::Medium => "Средний процент",
            Category::High => "Высокий процент",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Low => write!(f, "low"),
            Category::Medium => write!(f, "medium"),
            Category::High => write!(f, "high"),
        }
    }
}

/// Actual-vs-plan standing. Independent from [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Behind,
    OnTrack,
    Met,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Behind => write!(f, "behind"),
            Status::OnTrack => write!(f, "on-track"),
            Status::Met => write!(f, "met"),
        }
    }
}

/// Opaque chart colour, rendered as `rgb(r, g, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("expected rgb(r, g, b), got {:?}", s))?;
        let parts: Vec<u8> = inner
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("bad colour component in {:?}: {}", s, e))?;
        match parts.as_slice() {
            [r, g, b] => Ok(Rgb(*r, *g, *b)),
            _ => Err(format!("expected three components in {:?}", s)),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ==========================================
// Export rows
// ==========================================

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ClassifiedRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Actual")]
    #[tabled(rename = "Actual")]
    pub actual: String,
    #[serde(rename = "Plan")]
    #[tabled(rename = "Plan")]
    pub plan: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}
