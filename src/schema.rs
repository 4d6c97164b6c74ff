use sqlx::PgPool;
use crate::error::Result;

pub const CREATE_PARSING_TASKS: &str = r"
CREATE TABLE IF NOT EXISTS parsing_tasks (
    id           BIGSERIAL PRIMARY KEY,
    url          TEXT        NOT NULL,
    selector     TEXT        NOT NULL,
    status       TEXT        NOT NULL,
    completed_at TIMESTAMPTZ,
    total_items  INTEGER     NOT NULL DEFAULT 0,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

pub const CREATE_PARSED_ITEMS: &str = r"
CREATE TABLE IF NOT EXISTS parsed_items (
    id      BIGSERIAL PRIMARY KEY,
    task_id BIGINT NOT NULL REFERENCES parsing_tasks (id),
    title   TEXT,
    content TEXT,
    link    TEXT
)";

pub const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS parsing_tasks_created_at_idx ON parsing_tasks (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS parsed_items_task_id_idx ON parsed_items (task_id)",
];

/// Creates both tables and their indexes when missing. Existing tables are
/// left untouched.
pub async fn bootstrap(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(CREATE_PARSING_TASKS).execute(&mut *tx).await?;
    sqlx::query(CREATE_PARSED_ITEMS).execute(&mut *tx).await?;
    for ddl in CREATE_INDEXES {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!("schema bootstrap complete");
    Ok(())
}
