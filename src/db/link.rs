//! Link repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::traits::LinkStore;
use super::DbPool;
use crate::datetime::{from_db, to_db};
use crate::link::Link;
use crate::{Result, ScrapperError};

const LINK_COLUMNS: &str =
    "id, url, updated_at, last_checked_at, created_at, unavailable_since, last_error";

/// Row type for a link from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct LinkRow {
    id: i64,
    url: String,
    updated_at: String,
    last_checked_at: String,
    created_at: String,
    unavailable_since: Option<String>,
    last_error: Option<String>,
}

fn parse_required(column: &str, value: &str) -> Result<DateTime<Utc>> {
    from_db(value).ok_or_else(|| {
        ScrapperError::Database(format!("invalid timestamp in links.{column}: {value}"))
    })
}

impl TryFrom<LinkRow> for Link {
    type Error = ScrapperError;

    fn try_from(row: LinkRow) -> Result<Self> {
        Ok(Link {
            id: row.id,
            updated_at: parse_required("updated_at", &row.updated_at)?,
            last_checked_at: parse_required("last_checked_at", &row.last_checked_at)?,
            created_at: parse_required("created_at", &row.created_at)?,
            unavailable_since: row.unavailable_since.as_deref().and_then(from_db),
            last_error: row.last_error,
            url: row.url,
        })
    }
}

fn rows_to_links(rows: Vec<LinkRow>) -> Result<Vec<Link>> {
    rows.into_iter().map(Link::try_from).collect()
}

/// Select list for queries joining `links` under the alias `l`.
pub(super) fn link_columns_with_alias() -> String {
    LINK_COLUMNS
        .split(", ")
        .map(|c| format!("l.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load links with a custom query whose select list matches `LINK_COLUMNS`.
pub(super) async fn fetch_links(
    pool: &DbPool,
    sql: &str,
    bind: Option<i64>,
) -> Result<Vec<Link>> {
    let mut query = sqlx::query_as::<_, LinkRow>(sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    let rows = query.fetch_all(pool).await?;
    rows_to_links(rows)
}

/// Repository for tracked links.
#[derive(Clone)]
pub struct LinkRepository {
    pool: DbPool,
}

impl LinkRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Insert a new link.
    ///
    /// Both `updated_at` and `last_checked_at` start at `now`, so the first
    /// check only reports changes made after tracking began.
    pub async fn create(&self, url: &str, now: DateTime<Utc>) -> Result<Link> {
        let stamp = to_db(&now);
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO links (url, updated_at, last_checked_at, created_at)
             VALUES (?1, ?2, ?2, ?2) RETURNING id",
        )
        .bind(url)
        .bind(&stamp)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ScrapperError::NotFound("link".into()))
    }

    /// Get a link by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?");
        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Link::try_from).transpose()
    }

    /// Get a link by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE url = ?");
        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Link::try_from).transpose()
    }

    /// List all links ordered by ID.
    pub async fn list_all(&self) -> Result<Vec<Link>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links ORDER BY id");
        fetch_links(&self.pool, &sql, None).await
    }

    /// List links last checked before `cutoff`, oldest check first.
    pub async fn list_checked_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Link>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links
             WHERE last_checked_at < ?
             ORDER BY last_checked_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(to_db(&cutoff))
            .fetch_all(&self.pool)
            .await?;
        rows_to_links(rows)
    }

    /// Delete a link. Subscriptions and question state cascade.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count all links.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl LinkStore for LinkRepository {
    async fn list_stale_links(&self, threshold: Duration) -> Result<Vec<Link>> {
        let cutoff = Utc::now()
            .checked_sub_signed(threshold)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.list_checked_before(cutoff).await
    }

    async fn update_timestamps(
        &self,
        link_id: i64,
        updated_at: DateTime<Utc>,
        last_checked_at: DateTime<Utc>,
    ) -> Result<bool> {
        // Text comparison is chronological for the storage format.
        let result = sqlx::query(
            "UPDATE links
             SET updated_at = MAX(updated_at, ?1),
                 last_checked_at = MAX(?2, updated_at, ?1)
             WHERE id = ?3 AND last_checked_at < ?2",
        )
        .bind(to_db(&updated_at))
        .bind(to_db(&last_checked_at))
        .bind(link_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_unavailable(&self, link_id: i64, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE links
             SET unavailable_since = COALESCE(unavailable_since, ?1), last_error = ?2
             WHERE id = ?3",
        )
        .bind(to_db(&Utc::now()))
        .bind(reason)
        .bind(link_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_unavailable(&self, link_id: i64) -> Result<()> {
        sqlx::query("UPDATE links SET unavailable_since = NULL, last_error = NULL WHERE id = ?")
            .bind(link_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
