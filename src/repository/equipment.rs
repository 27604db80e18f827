//! Equipment and custody ledger queries (Postgres)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::EquipmentStatus,
        equipment::{CustodyEntry, Equipment, EquipmentQuery},
    },
};

#[derive(Debug, FromRow)]
struct EquipmentRow {
    id: Uuid,
    name: String,
    description: String,
    unit: String,
    quantity: i32,
    status: EquipmentStatus,
    creator_id: String,
    last_user_sign_in: Option<String>,
    last_user_sign_out: Option<String>,
    last_sign_in_date: Option<DateTime<Utc>>,
    last_sign_out_date: Option<DateTime<Utc>>,
    last_maintenance: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EquipmentRow {
    fn into_equipment(self, sign_ins: Vec<CustodyEntry>, sign_outs: Vec<CustodyEntry>) -> Equipment {
        Equipment {
            id: self.id,
            name: self.name,
            description: self.description,
            unit: self.unit,
            quantity: self.quantity,
            status: self.status,
            creator_id: self.creator_id,
            sign_ins,
            sign_outs,
            last_user_sign_in: self.last_user_sign_in,
            last_user_sign_out: self.last_user_sign_out,
            last_sign_in_date: self.last_sign_in_date,
            last_sign_out_date: self.last_sign_out_date,
            last_maintenance: self.last_maintenance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CustodyRow {
    equipment_id: Uuid,
    user_id: String,
    user_name: String,
    at: DateTime<Utc>,
}

impl From<CustodyRow> for CustodyEntry {
    fn from(row: CustodyRow) -> Self {
        Self {
            user_id: row.user_id,
            user_name: row.user_name,
            at: row.at,
        }
    }
}

const EQUIPMENT_COLUMNS: &str = r#"
    id, name, description, unit, quantity, status, creator_id,
    last_user_sign_in, last_user_sign_out, last_sign_in_date, last_sign_out_date,
    last_maintenance, created_at, updated_at
"#;

/// Load ledgers for a batch of equipment, keyed by equipment id
async fn ledgers(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> AppResult<(HashMap<Uuid, Vec<CustodyEntry>>, HashMap<Uuid, Vec<CustodyEntry>>)> {
    let active = sqlx::query_as::<_, CustodyRow>(
        r#"
        SELECT equipment_id, user_id, user_name, signed_in_at AS at
        FROM equipment_sign_ins
        WHERE equipment_id = ANY($1)
        ORDER BY signed_in_at, user_id
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let closed = sqlx::query_as::<_, CustodyRow>(
        r#"
        SELECT equipment_id, user_id, user_name, signed_out_at AS at
        FROM equipment_sign_outs
        WHERE equipment_id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut sign_ins: HashMap<Uuid, Vec<CustodyEntry>> = HashMap::new();
    for row in active {
        sign_ins.entry(row.equipment_id).or_default().push(row.into());
    }
    let mut sign_outs: HashMap<Uuid, Vec<CustodyEntry>> = HashMap::new();
    for row in closed {
        sign_outs.entry(row.equipment_id).or_default().push(row.into());
    }
    Ok((sign_ins, sign_outs))
}

/// Get equipment by ID, optionally taking its row lock
pub async fn get_by_id(conn: &mut PgConnection, id: Uuid, for_update: bool) -> AppResult<Equipment> {
    let query = format!(
        "SELECT {} FROM equipment WHERE id = $1{}",
        EQUIPMENT_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, EquipmentRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

    let (mut sign_ins, mut sign_outs) = ledgers(conn, &[id]).await?;
    Ok(row.into_equipment(
        sign_ins.remove(&id).unwrap_or_default(),
        sign_outs.remove(&id).unwrap_or_default(),
    ))
}

/// List equipment matching the query, ordered by name
pub async fn list(conn: &mut PgConnection, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
    let sql = format!(
        r#"
        SELECT {} FROM equipment
        WHERE ($1::text IS NULL OR unit = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY name, created_at
        "#,
        EQUIPMENT_COLUMNS
    );
    let rows = sqlx::query_as::<_, EquipmentRow>(&sql)
        .bind(query.unit.as_deref())
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let (mut sign_ins, mut sign_outs) = ledgers(conn, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            row.into_equipment(
                sign_ins.remove(&id).unwrap_or_default(),
                sign_outs.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

pub async fn insert(conn: &mut PgConnection, equipment: &Equipment) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO equipment (
            id, name, description, unit, quantity, status, creator_id,
            last_user_sign_in, last_user_sign_out, last_sign_in_date, last_sign_out_date,
            last_maintenance, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(equipment.id)
    .bind(&equipment.name)
    .bind(&equipment.description)
    .bind(&equipment.unit)
    .bind(equipment.quantity)
    .bind(equipment.status)
    .bind(&equipment.creator_id)
    .bind(&equipment.last_user_sign_in)
    .bind(&equipment.last_user_sign_out)
    .bind(equipment.last_sign_in_date)
    .bind(equipment.last_sign_out_date)
    .bind(equipment.last_maintenance)
    .bind(equipment.created_at)
    .bind(equipment.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update(conn: &mut PgConnection, equipment: &Equipment) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE equipment SET
            name = $2, description = $3, unit = $4, quantity = $5, status = $6,
            last_user_sign_in = $7, last_user_sign_out = $8,
            last_sign_in_date = $9, last_sign_out_date = $10,
            last_maintenance = $11, updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(equipment.id)
    .bind(&equipment.name)
    .bind(&equipment.description)
    .bind(&equipment.unit)
    .bind(equipment.quantity)
    .bind(equipment.status)
    .bind(&equipment.last_user_sign_in)
    .bind(&equipment.last_user_sign_out)
    .bind(equipment.last_sign_in_date)
    .bind(equipment.last_sign_out_date)
    .bind(equipment.last_maintenance)
    .bind(equipment.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Equipment {} not found", equipment.id)));
    }
    Ok(())
}

/// Delete equipment; the ledger cascades and bound tasks are unbound by FK
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Equipment {} not found", id)));
    }
    Ok(())
}

pub async fn insert_sign_in(conn: &mut PgConnection, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO equipment_sign_ins (equipment_id, user_id, user_name, signed_in_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (equipment_id, user_id) DO NOTHING
        "#,
    )
    .bind(equipment_id)
    .bind(&entry.user_id)
    .bind(&entry.user_name)
    .bind(entry.at)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::AlreadySignedIn(entry.user_id.clone()));
    }
    Ok(())
}

/// Close a custody entry: delete the active row and append to the history
pub async fn sign_out(conn: &mut PgConnection, equipment_id: Uuid, entry: &CustodyEntry) -> AppResult<()> {
    let removed = sqlx::query(
        "DELETE FROM equipment_sign_ins WHERE equipment_id = $1 AND user_id = $2",
    )
    .bind(equipment_id)
    .bind(&entry.user_id)
    .execute(&mut *conn)
    .await?;

    if removed.rows_affected() == 0 {
        return Err(AppError::NotSignedIn(entry.user_id.clone()));
    }

    sqlx::query(
        r#"
        INSERT INTO equipment_sign_outs (equipment_id, user_id, user_name, signed_out_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(equipment_id)
    .bind(&entry.user_id)
    .bind(&entry.user_name)
    .bind(entry.at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
