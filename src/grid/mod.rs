//! Declarative filter / sort / paginate over flattened rows.
//!
//! The engine never touches the tree. It takes rows that can expose fields
//! by name ([`GridRow`]), keeps those passing every column filter, sorts
//! them stably, and cuts the half-open `[startRow, endRow)` window. The
//! reported `lastRow` is the filtered total, independent of the window.
//!
//! # Example
//!
//! ```
//! use repertoire::grid::{GridQuery, GridQueryEngine};
//! use serde_json::json;
//!
//! let rows: Vec<_> = (0..10).map(|i| json!({"name": format!("line {i}"), "depth": i % 3})).collect();
//! let query: GridQuery = serde_json::from_value(json!({"startRow": 0, "endRow": 2})).unwrap();
//! let page = GridQueryEngine::default().run(rows, &query);
//! assert_eq!(page.rows.len(), 2);
//! assert_eq!(page.last_row, 10);
//! ```

pub mod filter;
pub mod sort;

pub use filter::{ColumnFilter, FilterModel, NumberOperator, TextOperator};
pub use sort::{SortDirection, SortKey};

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::FlatRow;

/// A row whose fields can be looked up by name
///
/// Dotted names reach into nested objects, e.g. `aiConfig.model` or
/// `translations.fr`.
pub trait GridRow {
    fn field(&self, name: &str) -> Option<Value>;
}

fn lookup_path(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

impl GridRow for Value {
    fn field(&self, name: &str) -> Option<Value> {
        if let Some(direct) = self.as_object().and_then(|o| o.get(name)) {
            return Some(direct.clone());
        }
        lookup_path(self, name)
    }
}

impl GridRow for FlatRow {
    fn field(&self, name: &str) -> Option<Value> {
        let node = &self.node;
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        let date = |d: &Option<chrono::DateTime<chrono::Utc>>| d.map(|d| Value::String(d.to_rfc3339()));

        let value = match head {
            "id" => Some(Value::String(node.id.to_string())),
            "name" => Some(Value::String(node.name.clone())),
            "active" => Some(Value::Bool(node.active)),
            "isActive" => Some(Value::Bool(node.is_active)),
            "createUuid" => node.create_uuid.clone().map(Value::String),
            "createdDate" => date(&node.created_date),
            "createCreatedDate" => date(&node.create_created_date),
            "modifiedDate" => date(&node.modified_date),
            "parent" => node.parent().map(|p| Value::String(p.to_string())),
            "depth" => Some(Value::from(self.depth)),
            "breadcrumb" => Some(Value::String(self.breadcrumb.clone())),
            "childCount" => Some(Value::from(self.child_count)),
            "aiConfig" => node.ai_config.clone().map(Value::Object),
            "translations" => node.translations.as_ref().map(|t| {
                Value::Object(t.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
            }),
            _ => None,
        }?;

        match rest {
            Some(path) => lookup_path(&value, path),
            None => Some(value),
        }
    }
}

/// A grid request: window, column filters and sort keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridQuery {
    #[serde(default)]
    pub start_row: usize,
    #[serde(default)]
    pub end_row: Option<usize>,
    #[serde(default)]
    pub filter_model: FilterModel,
    #[serde(default)]
    pub sort_model: Vec<SortKey>,
}

impl GridQuery {
    pub fn window(start_row: usize, end_row: usize) -> Self {
        Self {
            start_row,
            end_row: Some(end_row),
            ..Default::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, filter: ColumnFilter) -> Self {
        self.filter_model.insert(field.into(), filter);
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort_model.push(key);
        self
    }
}

/// One window of matching rows plus the total match count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPage<R> {
    pub rows: Vec<R>,
    /// Number of rows passing the filters, before windowing
    pub last_row: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct GridQueryEngine {
    default_page_size: usize,
}

impl Default for GridQueryEngine {
    fn default() -> Self {
        Self {
            default_page_size: 100,
        }
    }
}

impl GridQueryEngine {
    pub fn new(default_page_size: usize) -> Self {
        Self { default_page_size }
    }

    /// Filter, sort and window `rows`
    ///
    /// A start past the end, or an end before the start, yields an empty
    /// page rather than an error.
    pub fn run<R: GridRow>(&self, rows: Vec<R>, query: &GridQuery) -> GridPage<R> {
        let started = Instant::now();

        let mut matching: Vec<R> = rows
            .into_iter()
            .filter(|row| filter::row_matches(row, &query.filter_model))
            .collect();
        sort::sort_rows(&mut matching, &query.sort_model);

        let total = matching.len();
        let start = query.start_row.min(total);
        let end = query
            .end_row
            .unwrap_or_else(|| query.start_row.saturating_add(self.default_page_size))
            .clamp(start, total);
        let page: Vec<R> = matching.drain(start..end).collect();

        log::debug!(
            "Grid query matched {} row(s), returning [{}, {})",
            total,
            start,
            end
        );
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.observe_grid_query(started.elapsed());
        #[cfg(not(feature = "metrics"))]
        let _ = started;

        GridPage {
            rows: page,
            last_row: total,
        }
    }
}
