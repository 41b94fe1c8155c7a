//! In-process [`RowStore`] holding rows as JSON objects.
//!
//! Mirrors the defaults the hosted store applies on insert (id, owner,
//! timestamps, `completed = false`) so snapshots and tests exercise the same
//! mapping code as a live backend.

use crate::error::AppError;
use crate::remote::{Order, RowStore, Table};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<Table, Vec<Value>>,
    next_id: u64,
    failures: VecDeque<AppError>,
}

#[derive(Debug)]
pub struct MemoryRowStore {
    owner_id: String,
    tables: Mutex<Tables>,
}

impl MemoryRowStore {
    pub fn new<O: Into<String>>(owner_id: O) -> Self {
        Self {
            owner_id: owner_id.into(),
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Replaces the rows of `table` without applying insert defaults.
    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        self.tables.lock().rows.insert(table, rows);
    }

    /// Makes the next remote call fail with `error`.
    pub fn fail_next(&self, error: AppError) {
        self.tables.lock().failures.push_back(error);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .rows
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    fn insert_row(&self, table: Table, row: Value) -> Result<Value, AppError> {
        let mut tables = self.tables.lock();
        if let Some(error) = tables.failures.pop_front() {
            return Err(error);
        }

        let Value::Object(mut fields) = row else {
            return Err(AppError::remote_rejection("row must be a JSON object"));
        };

        tables.next_id += 1;
        let id = format!("{}-{}", table.name(), tables.next_id);
        let now = now_string()?;
        fields.entry("id").or_insert(Value::String(id));
        fields
            .entry("user_id")
            .or_insert(Value::String(self.owner_id.clone()));
        if table == Table::Tasks {
            fields.entry("created_at").or_insert(Value::String(now.clone()));
            fields.entry("updated_at").or_insert(Value::String(now));
            fields.entry("completed").or_insert(Value::Bool(false));
        }

        let stored = Value::Object(fields);
        tables.rows.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    fn update_row(&self, table: Table, id: &str, patch: Value) -> Result<Value, AppError> {
        let mut tables = self.tables.lock();
        if let Some(error) = tables.failures.pop_front() {
            return Err(error);
        }

        let Value::Object(patch) = patch else {
            return Err(AppError::remote_rejection("patch must be a JSON object"));
        };

        let row = tables
            .rows
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|row| row_id(row) == Some(id))
            .ok_or_else(|| AppError::remote_rejection(format!("no rows matched id '{id}'")))?;

        if let Value::Object(fields) = row {
            merge(fields, patch);
        }
        Ok(row.clone())
    }

    fn delete_row(&self, table: Table, id: &str) -> Result<(), AppError> {
        let mut tables = self.tables.lock();
        if let Some(error) = tables.failures.pop_front() {
            return Err(error);
        }

        if let Some(rows) = tables.rows.get_mut(&table) {
            rows.retain(|row| row_id(row) != Some(id));
        }
        Ok(())
    }

    fn select_rows(&self, table: Table, order: &Order) -> Result<Vec<Value>, AppError> {
        let mut tables = self.tables.lock();
        if let Some(error) = tables.failures.pop_front() {
            return Err(error);
        }

        let mut rows = tables.rows.get(&table).cloned().unwrap_or_default();
        rows.sort_by(|a, b| {
            let ordering = compare_column(a.get(order.column), b.get(order.column));
            if order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        Ok(rows)
    }
}

impl RowStore for MemoryRowStore {
    async fn select(&self, table: Table, order: &Order) -> Result<Vec<Value>, AppError> {
        self.select_rows(table, order)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, AppError> {
        self.insert_row(table, row)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, AppError> {
        self.update_row(table, id, patch)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), AppError> {
        self.delete_row(table, id)
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn merge(fields: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        fields.insert(key, value);
    }
}

// Nulls and missing values sort last, matching the hosted store's default.
fn compare_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn now_string() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
