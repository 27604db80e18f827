//! Task, assignee and comment queries (Postgres)

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::TaskStatus,
        task::{Comment, Task, TaskFilter},
    },
};

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: String,
    unit: String,
    date: NaiveDate,
    status: TaskStatus,
    equipment_id: Option<Uuid>,
    assigner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AssigneeRow {
    task_id: Uuid,
    user_id: String,
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    task_id: Uuid,
    author_id: String,
    author_name: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            author_id: row.author_id,
            author_name: row.author_name,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

const TASK_COLUMNS: &str = r#"
    t.id, t.title, t.description, t.unit, t.date, t.status, t.equipment_id,
    t.assigner_id, t.created_at, t.updated_at
"#;

/// Attach assignees and comments to a batch of task rows
async fn hydrate(conn: &mut PgConnection, rows: Vec<TaskRow>) -> AppResult<Vec<Task>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let assignee_rows = sqlx::query_as::<_, AssigneeRow>(
        "SELECT task_id, user_id FROM task_assignees WHERE task_id = ANY($1) ORDER BY position",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let comment_rows = sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT id, task_id, author_id, author_name, text, created_at
        FROM task_comments
        WHERE task_id = ANY($1)
        ORDER BY created_at, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut assignees: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in assignee_rows {
        assignees.entry(row.task_id).or_default().push(row.user_id);
    }
    let mut comments: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for row in comment_rows {
        comments.entry(row.task_id).or_default().push(row.into());
    }

    Ok(rows
        .into_iter()
        .map(|row| Task {
            assignees: assignees.remove(&row.id).unwrap_or_default(),
            comments: comments.remove(&row.id).unwrap_or_default(),
            id: row.id,
            title: row.title,
            description: row.description,
            unit: row.unit,
            date: row.date,
            status: row.status,
            equipment_id: row.equipment_id,
            assigner_id: row.assigner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect())
}

/// Get task by ID, optionally taking its row lock
pub async fn get_by_id(conn: &mut PgConnection, id: Uuid, for_update: bool) -> AppResult<Task> {
    let query = format!(
        "SELECT {} FROM tasks t WHERE t.id = $1{}",
        TASK_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, TaskRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

    hydrate(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
}

/// Tasks in a unit, optionally narrowed to an assigner or an assignee
pub async fn list(conn: &mut PgConnection, filter: &TaskFilter) -> AppResult<Vec<Task>> {
    let query = format!(
        r#"
        SELECT {} FROM tasks t
        WHERE t.unit = $1
          AND ($2::text IS NULL OR t.assigner_id = $2)
          AND ($3::text IS NULL OR EXISTS (
                SELECT 1 FROM task_assignees a WHERE a.task_id = t.id AND a.user_id = $3))
        ORDER BY t.created_at DESC
        "#,
        TASK_COLUMNS
    );
    let rows = sqlx::query_as::<_, TaskRow>(&query)
        .bind(&filter.unit)
        .bind(filter.assigner_id.as_deref())
        .bind(filter.assignee_id.as_deref())
        .fetch_all(&mut *conn)
        .await?;

    hydrate(conn, rows).await
}

async fn replace_assignees(conn: &mut PgConnection, task: &Task) -> AppResult<()> {
    sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
        .bind(task.id)
        .execute(&mut *conn)
        .await?;

    for (position, user_id) in task.assignees.iter().enumerate() {
        sqlx::query("INSERT INTO task_assignees (task_id, user_id, position) VALUES ($1, $2, $3)")
            .bind(task.id)
            .bind(user_id)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn insert(conn: &mut PgConnection, task: &Task) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tasks (
            id, title, description, unit, date, status, equipment_id,
            assigner_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.unit)
    .bind(task.date)
    .bind(task.status)
    .bind(task.equipment_id)
    .bind(&task.assigner_id)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&mut *conn)
    .await?;

    replace_assignees(conn, task).await
}

pub async fn update(conn: &mut PgConnection, task: &Task) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE tasks SET
            title = $2, description = $3, unit = $4, date = $5, status = $6,
            equipment_id = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.unit)
    .bind(task.date)
    .bind(task.status)
    .bind(task.equipment_id)
    .bind(task.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Task {} not found", task.id)));
    }
    replace_assignees(conn, task).await
}

/// Delete a task; assignees and comments cascade
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Task {} not found", id)));
    }
    Ok(())
}

pub async fn get_comment(conn: &mut PgConnection, id: Uuid, for_update: bool) -> AppResult<Comment> {
    let query = format!(
        "SELECT id, task_id, author_id, author_name, text, created_at FROM task_comments WHERE id = $1{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, CommentRow>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Comment::from)
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
}

pub async fn insert_comment(conn: &mut PgConnection, comment: &Comment) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO task_comments (id, task_id, author_id, author_name, text, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(comment.id)
    .bind(comment.task_id)
    .bind(&comment.author_id)
    .bind(&comment.author_name)
    .bind(&comment.text)
    .bind(comment.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_comment(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM task_comments WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Comment {} not found", id)));
    }
    Ok(())
}
