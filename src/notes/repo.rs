use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Note record. Owner is set at creation and never changes; title is
/// unique within one owner's notes (UNIQUE (user_id, title)).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub title: String,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const NOTE_COLUMNS: &str = "id, user_id, category, title, text, created_at, updated_at";

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Note>> {
    let rows = sqlx::query_as::<_, Note>(&format!(
        r#"
        SELECT {NOTE_COLUMNS}
        FROM notes
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_owned(db: &PgPool, user_id: Uuid, note_id: Uuid) -> anyhow::Result<Option<Note>> {
    let note = sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2"
    ))
    .bind(note_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(note)
}

/// Duplicate-title check within one owner, excluding one note when updating.
pub async fn title_taken(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    exclude: Option<Uuid>,
) -> anyhow::Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM notes
        WHERE user_id = $1 AND title = $2 AND ($3::uuid IS NULL OR id <> $3)
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(exclude)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    category: &str,
    title: &str,
    text: &str,
) -> anyhow::Result<Note> {
    let note = sqlx::query_as::<_, Note>(&format!(
        r#"
        INSERT INTO notes (user_id, category, title, text)
        VALUES ($1, $2, $3, $4)
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(category)
    .bind(title)
    .bind(text)
    .fetch_one(db)
    .await?;
    Ok(note)
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    note_id: Uuid,
    category: &str,
    title: &str,
    text: &str,
) -> anyhow::Result<Option<Note>> {
    let note = sqlx::query_as::<_, Note>(&format!(
        r#"
        UPDATE notes
        SET category = $3, title = $4, text = $5, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(note_id)
    .bind(user_id)
    .bind(category)
    .bind(title)
    .bind(text)
    .fetch_optional(db)
    .await?;
    Ok(note)
}

pub async fn delete(db: &PgPool, user_id: Uuid, note_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
        .bind(note_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
