use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 1, 30).await
}

/// An in-memory database lives exactly as long as its connection, so memory
/// URLs get a single connection that is never recycled.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let in_memory = is_memory_url(database_url);
    let mut options = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { max_connections.max(1) })
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)));
    if in_memory {
        options = options.min_connections(1).idle_timeout(None).max_lifetime(None);
    }

    options
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(normalize_url(database_url))
        .await
}

fn is_memory_url(database_url: &str) -> bool {
    let url = database_url.trim();
    url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}

fn normalize_url(database_url: &str) -> &str {
    if database_url.trim() == ":memory:" {
        "sqlite::memory:"
    } else {
        database_url.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::{connect, is_memory_url, normalize_url};

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_memory_url(":memory:"));
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:hr?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://hrdesk.db"));
        assert_eq!(normalize_url(":memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn connects_to_memory_database() {
        let pool = connect(":memory:").await.expect("connect");
        let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.expect("select");
        assert_eq!(one, 1);
        pool.close().await;
    }
}
