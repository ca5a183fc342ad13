//! Process-local record store
//!
//! Backs the `memory` store backend and the test suites. Foreign keys,
//! `NOT NULL` columns and delete rules come from [`crate::schema`], so a write
//! the database would reject fails here the same way.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use so_core::traits::Id;
use so_models::Collection;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::aggregate::assemble_order_aggregate;
use crate::repository::{
    check_columns, ListQuery, RecordStore, Row, StoreError, StoreResult,
};
use crate::schema::{not_null, references_from, references_to, OnDelete};

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<Collection, BTreeMap<Id, Row>>,
    last_ids: HashMap<Collection, Id>,
}

impl Tables {
    fn table(&self, collection: Collection) -> Option<&BTreeMap<Id, Row>> {
        self.rows.get(&collection)
    }

    fn contains(&self, collection: Collection, id: Id) -> bool {
        self.table(collection).is_some_and(|t| t.contains_key(&id))
    }

    fn next_id(&mut self, collection: Collection) -> Id {
        let id = self.last_ids.entry(collection).or_insert(0);
        *id += 1;
        *id
    }

    /// Enforce NOT NULL and outgoing foreign keys for a complete row
    fn check_row(&self, collection: Collection, row: &Row) -> StoreResult<()> {
        for column in not_null(collection) {
            if row.get(*column).map_or(true, Value::is_null) {
                return Err(StoreError::Constraint(format!(
                    "null value in column \"{}\" of relation \"{}\"",
                    column, collection
                )));
            }
        }
        for key in references_from(collection) {
            let value = match row.get(key.column) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };
            let present = value
                .as_i64()
                .is_some_and(|id| self.contains(key.target, id));
            if !present {
                return Err(StoreError::Constraint(format!(
                    "insert or update on table \"{}\" violates foreign key \"{}\": {} {} is not present in \"{}\"",
                    collection, key.column, key.column, value, key.target
                )));
            }
        }
        Ok(())
    }

    /// Rows removed by deleting `roots`, following cascades
    ///
    /// Fails without side effects when a restricting reference remains.
    fn plan_delete(&self, roots: Vec<(Collection, Id)>) -> StoreResult<BTreeSet<(Collection, Id)>> {
        let mut doomed = BTreeSet::new();
        let mut pending = roots;

        while let Some((collection, id)) = pending.pop() {
            if !doomed.insert((collection, id)) {
                continue;
            }
            for key in references_to(collection) {
                if key.on_delete != OnDelete::Cascade {
                    continue;
                }
                pending.extend(self.referencing(key.collection, key.column, id).map(|child| (key.collection, child)));
            }
        }

        for &(collection, id) in &doomed {
            for key in references_to(collection) {
                if key.on_delete != OnDelete::Restrict {
                    continue;
                }
                let blocked = self
                    .referencing(key.collection, key.column, id)
                    .any(|child| !doomed.contains(&(key.collection, child)));
                if blocked {
                    return Err(StoreError::Constraint(format!(
                        "update or delete on table \"{}\" violates foreign key \"{}\" on table \"{}\"",
                        collection, key.column, key.collection
                    )));
                }
            }
        }

        Ok(doomed)
    }

    fn referencing<'a>(
        &'a self,
        collection: Collection,
        column: &'a str,
        id: Id,
    ) -> impl Iterator<Item = Id> + 'a {
        self.table(collection)
            .into_iter()
            .flat_map(|table| table.iter())
            .filter(move |(_, row)| row.get(column).and_then(Value::as_i64) == Some(id))
            .map(|(child, _)| *child)
    }

    fn apply_delete(&mut self, doomed: &BTreeSet<(Collection, Id)>) {
        for &(collection, id) in doomed {
            for key in references_to(collection) {
                if key.on_delete != OnDelete::SetNull {
                    continue;
                }
                if let Some(table) = self.rows.get_mut(&key.collection) {
                    for row in table.values_mut() {
                        if row.get(key.column).and_then(Value::as_i64) == Some(id) {
                            row.insert(key.column.to_string(), Value::Null);
                        }
                    }
                }
            }
        }
        for (collection, id) in doomed {
            if let Some(table) = self.rows.get_mut(collection) {
                table.remove(id);
            }
        }
    }
}

/// In-memory [`RecordStore`]
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in a collection
    pub fn count(&self, collection: Collection) -> usize {
        self.tables.lock().table(collection).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, collection: Collection, query: ListQuery) -> StoreResult<Vec<Row>> {
        check_columns(collection, query.columns())?;

        let tables = self.tables.lock();
        let mut rows: Vec<Row> = tables
            .table(collection)
            .into_iter()
            .flat_map(|table| table.values())
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(column, value)| same_value(row.get(column), value))
            })
            .cloned()
            .collect();

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        Ok(rows)
    }

    async fn get(&self, collection: Collection, id: Id) -> StoreResult<Row> {
        self.tables
            .lock()
            .table(collection)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        let mut tables = self.tables.lock();

        let mut complete = Vec::with_capacity(rows.len());
        for row in rows {
            check_columns(collection, row.keys().map(String::as_str))?;
            let mut full: Row = collection
                .columns()
                .iter()
                .map(|column| (column.to_string(), Value::Null))
                .collect();
            full.extend(row.into_iter().filter(|(column, _)| column != "id"));
            tables.check_row(collection, &full)?;
            complete.push(full);
        }

        let mut stored = Vec::with_capacity(complete.len());
        for mut row in complete {
            let id = tables.next_id(collection);
            row.insert("id".to_string(), Value::from(id));
            tables
                .rows
                .entry(collection)
                .or_default()
                .insert(id, row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn update(&self, collection: Collection, id: Id, patch: Row) -> StoreResult<Row> {
        check_columns(collection, patch.keys().map(String::as_str))?;

        let mut tables = self.tables.lock();
        let mut row = tables
            .table(collection)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        row.extend(patch.into_iter().filter(|(column, _)| column != "id"));
        tables.check_row(collection, &row)?;

        tables
            .rows
            .entry(collection)
            .or_default()
            .insert(id, row.clone());
        Ok(row)
    }

    async fn delete(&self, collection: Collection, id: Id) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        if !tables.contains(collection, id) {
            return Err(StoreError::not_found(collection, id));
        }
        let doomed = tables.plan_delete(vec![(collection, id)])?;
        tables.apply_delete(&doomed);
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: Collection,
        column: &str,
        value: Id,
    ) -> StoreResult<u64> {
        check_columns(collection, [column])?;

        let mut tables = self.tables.lock();
        let roots: Vec<(Collection, Id)> = tables
            .referencing(collection, column, value)
            .map(|id| (collection, id))
            .collect();
        let removed = roots.len() as u64;
        let doomed = tables.plan_delete(roots)?;
        tables.apply_delete(&doomed);
        Ok(removed)
    }

    async fn order_aggregate(&self, id: Id) -> StoreResult<Row> {
        assemble_order_aggregate(self, id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn same_value(stored: Option<&Value>, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(a), b) => a == b,
        (None, b) => b.is_null(),
    }
}

/// Total order over JSON scalars; nulls sort last, as in PostgreSQL
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
