//! PostgreSQL record store
//!
//! Rows cross the boundary as JSONB: reads select `to_jsonb(x)` and writes go
//! through `jsonb_populate_record(set)`, so one code path serves every table.
//! Identifiers are interpolated only after [`check_columns`] accepted them.

use async_trait::async_trait;
use serde_json::Value;
use so_core::traits::Id;
use so_models::Collection;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::repository::{
    check_columns, ListQuery, RecordStore, Row, StoreError, StoreResult,
};

/// Eager-loaded order: the services row plus one `jsonb_agg` per association
const ORDER_AGGREGATE_SQL: &str = r#"
SELECT to_jsonb(s) || jsonb_build_object(
    'service_team', COALESCE((
        SELECT jsonb_agg(jsonb_build_object(
                   'team', jsonb_build_object('id', t.id, 'name', t.name,
                                              'position', t.position,
                                              'primary_contact', t.primary_contact))
                   ORDER BY st.id)
        FROM service_team st JOIN team t ON t.id = st.team_id
        WHERE st.service_id = s.id), '[]'::jsonb),
    'procedure_order', COALESCE((
        SELECT jsonb_agg(jsonb_build_object(
                   'execution_order', po.execution_order,
                   'procedure', to_jsonb(p))
                   ORDER BY po.execution_order NULLS FIRST, po.id)
        FROM procedure_order po JOIN procedures p ON p.id = po.id_procedure
        WHERE po.service_id = s.id), '[]'::jsonb),
    'service_materials', COALESCE((
        SELECT jsonb_agg(jsonb_build_object(
                   'quantity', sm.quantity,
                   'material', to_jsonb(m))
                   ORDER BY sm.id)
        FROM service_materials sm JOIN materials m ON m.id = sm.material_id
        WHERE sm.service_id = s.id), '[]'::jsonb),
    'service_equipments', COALESCE((
        SELECT jsonb_agg(jsonb_build_object('equipment', to_jsonb(e)) ORDER BY se.id)
        FROM service_equipments se JOIN equipments e ON e.id = se.equipment_id
        WHERE se.service_id = s.id), '[]'::jsonb),
    'service_epi', COALESCE((
        SELECT jsonb_agg(jsonb_build_object(
                   'quantity', sp.quantity,
                   'epi_item', to_jsonb(i))
                   ORDER BY sp.id)
        FROM service_epi sp JOIN epi i ON i.id = sp.epi_id
        WHERE sp.service_id = s.id), '[]'::jsonb),
    'observations', COALESCE((
        SELECT jsonb_agg(jsonb_build_object(
                   'id', o.id,
                   'description', o.description,
                   'observation_date', o.observation_date,
                   'observation_type', o.observation_type,
                   'team_member', CASE WHEN tm.id IS NULL THEN NULL
                                       ELSE jsonb_build_object('id', tm.id, 'name', tm.name,
                                                               'position', tm.position) END)
                   ORDER BY o.observation_date DESC NULLS LAST, o.id DESC)
        FROM observations o LEFT JOIN team tm ON tm.id = o.team_member_id
        WHERE o.service_id = s.id), '[]'::jsonb)
)
FROM services s
WHERE s.id = $1
"#;

/// [`RecordStore`] backed by a SQLx Postgres pool
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn quoted(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn into_row(value: Json<Value>) -> StoreResult<Row> {
    match value.0 {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Decode(format!("expected a JSON object, got {}", other))),
    }
}

/// Constraint violations (SQLSTATE class 23) become [`StoreError::Constraint`]
fn map_db_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.code().is_some_and(|code| code.starts_with("23")) {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Database(error)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list(&self, collection: Collection, query: ListQuery) -> StoreResult<Vec<Row>> {
        check_columns(collection, query.columns())?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT to_jsonb(x) FROM ");
        builder.push(quoted(collection.name())).push(" AS x");

        for (index, (column, value)) in query.filters.into_iter().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });
            builder
                .push("to_jsonb(x.")
                .push(quoted(&column))
                .push(") = ")
                .push_bind(Json(value));
        }
        if let Some(order) = query.order_by {
            builder
                .push(" ORDER BY x.")
                .push(quoted(&order.column))
                .push(if order.descending { " DESC NULLS LAST" } else { " ASC NULLS LAST" });
        }

        let rows: Vec<Json<Value>> = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(into_row).collect()
    }

    async fn get(&self, collection: Collection, id: Id) -> StoreResult<Row> {
        let sql = format!(
            "SELECT to_jsonb(x) FROM {} AS x WHERE x.id = $1",
            quoted(collection.name())
        );
        let row: Option<Json<Value>> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(into_row)
            .unwrap_or_else(|| Err(StoreError::not_found(collection, id)))
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut columns: Vec<&str> = Vec::new();
        for row in &rows {
            check_columns(collection, row.keys().map(String::as_str))?;
            for column in row.keys() {
                if column != "id" && !columns.contains(&column.as_str()) {
                    columns.push(column);
                }
            }
        }
        if columns.is_empty() {
            return Err(StoreError::Decode(format!("nothing to insert into {}", collection)));
        }

        let table = quoted(collection.name());
        let column_list = columns
            .iter()
            .map(|c| quoted(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} AS x ({columns}) \
             SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, $1) \
             RETURNING to_jsonb(x)",
            table = table,
            columns = column_list,
        );

        let payload = Value::Array(rows.into_iter().map(Value::Object).collect());
        let inserted: Vec<Json<Value>> = sqlx::query_scalar(&sql)
            .bind(Json(payload))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        tracing::debug!(table = %collection, count = inserted.len(), "rows inserted");
        inserted.into_iter().map(into_row).collect()
    }

    async fn update(&self, collection: Collection, id: Id, mut patch: Row) -> StoreResult<Row> {
        patch.remove("id");
        check_columns(collection, patch.keys().map(String::as_str))?;
        if patch.is_empty() {
            return self.get(collection, id).await;
        }

        let table = quoted(collection.name());
        let assignments = patch
            .keys()
            .map(|c| format!("{col} = r.{col}", col = quoted(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {table} AS x SET {assignments} \
             FROM jsonb_populate_record(NULL::{table}, $1) AS r \
             WHERE x.id = $2 RETURNING to_jsonb(x)",
            table = table,
            assignments = assignments,
        );

        let row: Option<Json<Value>> = sqlx::query_scalar(&sql)
            .bind(Json(Value::Object(patch)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(into_row)
            .unwrap_or_else(|| Err(StoreError::not_found(collection, id)))
    }

    async fn delete(&self, collection: Collection, id: Id) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", quoted(collection.name()));
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: Collection,
        column: &str,
        value: Id,
    ) -> StoreResult<u64> {
        check_columns(collection, [column])?;

        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quoted(collection.name()),
            quoted(column)
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn order_aggregate(&self, id: Id) -> StoreResult<Row> {
        let row: Option<Json<Value>> = sqlx::query_scalar(ORDER_AGGREGATE_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(into_row)
            .unwrap_or_else(|| Err(StoreError::not_found(Collection::Services, id)))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}
