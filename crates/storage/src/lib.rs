use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{Item, PageNumber, PageSnapshot, Role};

const CURRENT_PAGE_KEY: &str = "current_page";
const SESSION_TOKEN_KEY: &str = "session_token";
const SESSION_ROLE_KEY: &str = "session_role";

const UPSERT_STATE_SQL: &str = "INSERT INTO console_state (key, value, updated_at)
     VALUES (?, ?, CURRENT_TIMESTAMP)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub role: Option<Role>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Writes both sequences of a snapshot in a single statement.
    pub async fn save_page_snapshot(
        &self,
        page: PageNumber,
        snapshot: &PageSnapshot,
    ) -> Result<()> {
        let fetched_order = serde_json::to_string(snapshot.fetched_order())
            .context("failed to encode fetched order")?;
        let working_order = serde_json::to_string(snapshot.working_order())
            .context("failed to encode working order")?;
        sqlx::query(
            "INSERT INTO page_snapshots (page, fetched_order, working_order, fetched_at, updated_at)
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(page) DO UPDATE SET
                fetched_order = excluded.fetched_order,
                working_order = excluded.working_order,
                fetched_at = excluded.fetched_at,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(i64::from(page.get()))
        .bind(fetched_order)
        .bind(working_order)
        .bind(snapshot.fetched_at())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to persist snapshot for page {page}"))?;
        Ok(())
    }

    pub async fn load_page_snapshot(&self, page: PageNumber) -> Result<Option<PageSnapshot>> {
        let row = sqlx::query(
            "SELECT fetched_order, working_order, fetched_at FROM page_snapshots WHERE page = ?",
        )
        .bind(i64::from(page.get()))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let fetched_order: Vec<Item> = serde_json::from_str(&row.try_get::<String, _>(0)?)
            .with_context(|| format!("corrupt fetched order for page {page}"))?;
        let working_order: Vec<Item> = serde_json::from_str(&row.try_get::<String, _>(1)?)
            .with_context(|| format!("corrupt working order for page {page}"))?;
        let fetched_at: DateTime<Utc> = row.try_get(2)?;

        Ok(Some(PageSnapshot::from_parts(
            fetched_order,
            working_order,
            fetched_at,
        )))
    }

    pub async fn list_snapshot_pages(&self) -> Result<Vec<PageNumber>> {
        let rows = sqlx::query("SELECT page FROM page_snapshots ORDER BY page")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let raw = row.try_get::<i64, _>(0)?;
                page_from_i64(raw)
            })
            .collect()
    }

    pub async fn save_current_page(&self, page: PageNumber) -> Result<()> {
        self.put_state(CURRENT_PAGE_KEY, &page.to_string()).await
    }

    /// Unparseable or out-of-range values read as absent.
    pub async fn load_current_page(&self) -> Result<Option<PageNumber>> {
        Ok(self
            .get_state(CURRENT_PAGE_KEY)
            .await?
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .and_then(PageNumber::new))
    }

    pub async fn save_session(&self, session: &StoredSession) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_state(&mut tx, SESSION_TOKEN_KEY, &session.token).await?;
        match &session.role {
            Some(role) => upsert_state(&mut tx, SESSION_ROLE_KEY, &role.0).await?,
            None => {
                sqlx::query("DELETE FROM console_state WHERE key = ?")
                    .bind(SESSION_ROLE_KEY)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await.context("failed to persist session")?;
        Ok(())
    }

    pub async fn load_session(&self) -> Result<Option<StoredSession>> {
        let Some(token) = self.get_state(SESSION_TOKEN_KEY).await? else {
            return Ok(None);
        };
        let role = self.get_state(SESSION_ROLE_KEY).await?.map(Role);
        Ok(Some(StoredSession { token, role }))
    }

    /// Drops every snapshot, the current page and the session.
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM page_snapshots")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM console_state")
            .execute(&mut *tx)
            .await?;
        tx.commit().await.context("failed to clear console state")?;
        Ok(())
    }

    async fn put_state(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(UPSERT_STATE_SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to persist '{key}'"))?;
        Ok(())
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM console_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }
}

async fn upsert_state(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    key: &str,
    value: &str,
) -> Result<()> {
    sqlx::query(UPSERT_STATE_SQL)
        .bind(key)
        .bind(value)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("failed to persist '{key}'"))?;
    Ok(())
}

fn page_from_i64(raw: i64) -> Result<PageNumber> {
    u32::try_from(raw)
        .ok()
        .and_then(PageNumber::new)
        .ok_or_else(|| anyhow!("invalid page number {raw} in page_snapshots"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
