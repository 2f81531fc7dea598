//! Multi-key stable sorting of grid rows.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::grid::GridRow;

/// Sort order; anything but `desc` (any case) reads as ascending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw.as_ref().and_then(Value::as_str) {
            Some(s) if s.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        })
    }
}

/// One sort key; grid front ends send `colId`/`sort`, both are accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    #[serde(alias = "colId")]
    pub field: String,
    #[serde(default, alias = "sort")]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Ascending order of two cell values
///
/// Missing and null sort first. Values of different JSON types order by
/// type; numbers compare numerically, strings by code point.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ Value::Array(_)), Some(y @ Value::Array(_)))
        | (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => x.to_string().cmp(&y.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Stable in-place sort by `keys`, later keys breaking ties
pub fn sort_rows<R: GridRow>(rows: &mut [R], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in keys {
            let ord = compare_values(a.field(&key.field).as_ref(), b.field(&key.field).as_ref());
            let ord = match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(rows: &[Value]) -> Vec<&str> {
        rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_multi_key_with_tie_break() {
        let mut rows = vec![
            json!({"name": "Dragon", "depth": 1}),
            json!({"name": "Sicilian", "depth": 0}),
            json!({"name": "Najdorf", "depth": 1}),
            json!({"name": "French", "depth": 0}),
        ];
        sort_rows(&mut rows, &[SortKey::asc("depth"), SortKey::desc("name")]);
        assert_eq!(names(&rows), vec!["Sicilian", "French", "Najdorf", "Dragon"]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let mut rows = vec![
            json!({"name": "b", "depth": 1}),
            json!({"name": "a", "depth": 1}),
            json!({"name": "c", "depth": 0}),
        ];
        sort_rows(&mut rows, &[SortKey::asc("depth")]);
        assert_eq!(names(&rows), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_missing_values_first() {
        let mut rows = vec![json!({"name": "x", "rank": 2}), json!({"name": "y"})];
        sort_rows(&mut rows, &[SortKey::asc("rank")]);
        assert_eq!(names(&rows), vec!["y", "x"]);
    }

    #[test]
    fn test_grid_aliases() {
        let key: SortKey = serde_json::from_value(json!({"colId": "name", "sort": "desc"})).unwrap();
        assert_eq!(key, SortKey::desc("name"));
        let key: SortKey = serde_json::from_value(json!({"field": "name"})).unwrap();
        assert_eq!(key.direction, SortDirection::Asc);
    }

    #[test]
    fn test_direction_parsing_is_lenient() {
        let direction = |sort: Value| {
            serde_json::from_value::<SortKey>(json!({"colId": "name", "sort": sort}))
                .unwrap()
                .direction
        };
        assert_eq!(direction(json!("DESC")), SortDirection::Desc);
        assert_eq!(direction(json!(" Desc ")), SortDirection::Desc);
        assert_eq!(direction(json!(null)), SortDirection::Asc);
        assert_eq!(direction(json!("ASC")), SortDirection::Asc);
        assert_eq!(direction(json!("sideways")), SortDirection::Asc);
        assert_eq!(direction(json!(1)), SortDirection::Asc);
    }
}
