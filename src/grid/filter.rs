//! Column filters for the grid query engine.
//!
//! The JSON shape follows what data-grid front ends send, one entry per
//! column, tagged by `filterType`:
//!
//! ```json
//! {
//!   "name":  {"filterType": "text", "type": "contains", "filter": "sicil"},
//!   "depth": {"filterType": "number", "type": "inRange", "filter": 1, "filterTo": 2},
//!   "model": {"filterType": "set", "values": ["gpt-4o", "o3"]}
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grid::GridRow;

/// Column name to filter; every entry must pass
pub type FilterModel = BTreeMap<String, ColumnFilter>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextOperator {
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberOperator {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    InRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "camelCase")]
pub enum ColumnFilter {
    Text {
        #[serde(rename = "type")]
        operator: TextOperator,
        #[serde(default)]
        filter: Option<Value>,
    },
    Number {
        #[serde(rename = "type")]
        operator: NumberOperator,
        #[serde(default)]
        filter: Option<Value>,
        #[serde(default, rename = "filterTo")]
        filter_to: Option<Value>,
    },
    Set {
        #[serde(default)]
        values: Vec<Value>,
    },
}

/// String form used by text and set filters; null and missing become `""`
pub fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric form used by number filters; anything unparsable is NaN
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                f64::NAN
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

impl ColumnFilter {
    /// Whether `value` (the row's field, if any) passes this filter
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            ColumnFilter::Text { operator, filter } => {
                let cell = coerce_text(value).to_lowercase();
                let needle = coerce_text(filter.as_ref()).to_lowercase();
                match operator {
                    TextOperator::Equals => cell == needle,
                    TextOperator::NotEqual => cell != needle,
                    TextOperator::Contains => cell.contains(&needle),
                    TextOperator::NotContains => !cell.contains(&needle),
                    TextOperator::StartsWith => cell.starts_with(&needle),
                    TextOperator::EndsWith => cell.ends_with(&needle),
                }
            }
            ColumnFilter::Number {
                operator,
                filter,
                filter_to,
            } => {
                let cell = coerce_number(value);
                let target = coerce_number(filter.as_ref());
                // NaN compares unequal to everything, so only NotEqual can pass
                match operator {
                    NumberOperator::Equals => cell == target,
                    NumberOperator::NotEqual => cell != target,
                    NumberOperator::GreaterThan => cell > target,
                    NumberOperator::GreaterThanOrEqual => cell >= target,
                    NumberOperator::LessThan => cell < target,
                    NumberOperator::LessThanOrEqual => cell <= target,
                    NumberOperator::InRange => {
                        let upper = coerce_number(filter_to.as_ref());
                        cell >= target && cell <= upper
                    }
                }
            }
            ColumnFilter::Set { values } => {
                if values.is_empty() {
                    return true;
                }
                let cell = coerce_text(value);
                values.iter().any(|allowed| coerce_text(Some(allowed)) == cell)
            }
        }
    }
}

/// Whether `row` passes every entry of `model`
pub fn row_matches<R: GridRow + ?Sized>(row: &R, model: &FilterModel) -> bool {
    model
        .iter()
        .all(|(field, filter)| filter.matches(row.field(field).as_ref()))
}
