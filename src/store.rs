use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{NewTask, ParsedItem, ParsingTask, SavedTask, TaskStatus};

/// Postgres caps a statement at 65535 bind parameters; each item row uses four.
const ITEM_ROWS_PER_STATEMENT: usize = 65535 / 4;

/// Persistence seam shared by the history and save handlers.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Most recently created tasks, newest first, at most `limit` of them.
    async fn recent_tasks(&self, limit: i64) -> Result<Vec<ParsingTask>>;

    /// A task and all of its items in ascending item id order, or `None`
    /// when no task has this id.
    async fn task_with_items(&self, task_id: i64) -> Result<Option<(ParsingTask, Vec<ParsedItem>)>>;

    /// Writes the task and its items as one unit.
    async fn save_results(&self, task: NewTask) -> Result<SavedTask>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn recent_tasks(&self, limit: i64) -> Result<Vec<ParsingTask>> {
        let tasks = sqlx::query_as::<_, ParsingTask>(
            r"
            SELECT id, url, selector, status, completed_at, total_items, created_at
            FROM parsing_tasks
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn task_with_items(&self, task_id: i64) -> Result<Option<(ParsingTask, Vec<ParsedItem>)>> {
        let mut conn = self.pool.acquire().await?;

        let task = sqlx::query_as::<_, ParsingTask>(
            r"
            SELECT id, url, selector, status, completed_at, total_items, created_at
            FROM parsing_tasks
            WHERE id = $1
            ",
        )
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(task) = task else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, ParsedItem>(
            r"
            SELECT id, task_id, title, content, link
            FROM parsed_items
            WHERE task_id = $1
            ORDER BY id
            ",
        )
        .bind(task_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some((task, items)))
    }

    async fn save_results(&self, task: NewTask) -> Result<SavedTask> {
        // Dropping the transaction before commit rolls both inserts back.
        let mut tx = self.pool.begin().await?;

        let task_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO parsing_tasks (url, selector, status, completed_at, total_items)
            VALUES ($1, $2, $3, CURRENT_TIMESTAMP, $4)
            RETURNING id
            ",
        )
        .bind(&task.url)
        .bind(&task.selector)
        .bind(String::from(TaskStatus::Completed))
        .bind(task.total_items)
        .fetch_one(&mut *tx)
        .await?;

        for chunk in task.items.chunks(ITEM_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO parsed_items (task_id, title, content, link) ");
            builder.push_values(chunk, |mut row, item| {
                row.push_bind(task_id)
                    .push_bind(item.title.clone())
                    .push_bind(item.content.clone())
                    .push_bind(item.link.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(SavedTask {
            task_id,
            items_saved: task.items.len(),
        })
    }
}
