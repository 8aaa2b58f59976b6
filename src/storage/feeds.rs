use sqlx::QueryBuilder;

use super::db::Database;
use super::types::{FeedRecord, FeedUpdate, StoreError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// All currently tracked feed URLs. Read exactly once at boot to seed
    /// the poll tasks.
    pub async fn list_feed_urls(&self) -> Result<Vec<String>, StoreError> {
        let urls = sqlx::query_scalar("SELECT url FROM feeds ORDER BY url")
            .fetch_all(&self.pool)
            .await?;
        Ok(urls)
    }

    /// Look up one feed's record by URL.
    pub async fn get_feed(&self, url: &str) -> Result<Option<FeedRecord>, StoreError> {
        let record = sqlx::query_as::<_, FeedRecord>(
            r#"
            SELECT url, target, owner, last_updated, last_fetch_snapshot, failure_count
            FROM feeds
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Register a new feed. Called by the onboarding flow, never by the
    /// polling cycle. The URL primary key makes double registration an
    /// explicit error rather than a second row.
    pub async fn add_feed(
        &self,
        url: &str,
        target: &str,
        owner: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("INSERT INTO feeds (url, target, owner) VALUES (?, ?, ?)")
            .bind(url)
            .bind(target)
            .bind(owner)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateUrl(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a sparse set of field updates atomically to one feed's row.
    /// Fields left `None` in `update` are untouched.
    pub async fn update_feed(&self, url: &str, update: FeedUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE feeds SET ");
        let mut fields = builder.separated(", ");
        if let Some(last_updated) = update.last_updated {
            fields.push("last_updated = ");
            fields.push_bind_unseparated(last_updated);
        }
        if let Some(snapshot) = update.last_fetch_snapshot {
            fields.push("last_fetch_snapshot = ");
            fields.push_bind_unseparated(snapshot);
        }
        if let Some(failure_count) = update.failure_count {
            fields.push("failure_count = ");
            fields.push_bind_unseparated(failure_count);
        }
        builder.push(" WHERE url = ");
        builder.push_bind(url);

        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Bump the failure counter by one, returning the new count.
    pub async fn increment_failures(&self, url: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar(
            "UPDATE feeds SET failure_count = failure_count + 1 WHERE url = ? RETURNING failure_count",
        )
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_get_feed() {
        let db = test_db().await;
        db.add_feed("https://example.com/feed", "!room:example.com", Some("@alice"))
            .await
            .unwrap();

        let record = db.get_feed("https://example.com/feed").await.unwrap().unwrap();
        assert_eq!(record.url, "https://example.com/feed");
        assert_eq!(record.target, "!room:example.com");
        assert_eq!(record.owner.as_deref(), Some("@alice"));
        assert_eq!(record.last_updated, None);
        assert_eq!(record.last_fetch_snapshot, None);
        assert_eq!(record.failure_count, 0);
    }

    #[tokio::test]
    async fn test_get_missing_feed_is_none() {
        let db = test_db().await;
        assert!(db.get_feed("https://nope.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let db = test_db().await;
        db.add_feed("https://example.com/feed", "!a:example.com", None)
            .await
            .unwrap();
        let err = db
            .add_feed("https://example.com/feed", "!b:example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUrl(_)));

        // Original row untouched
        let record = db.get_feed("https://example.com/feed").await.unwrap().unwrap();
        assert_eq!(record.target, "!a:example.com");
    }

    #[tokio::test]
    async fn test_list_feed_urls() {
        let db = test_db().await;
        db.add_feed("https://b.example.com/feed", "!b", None)
            .await
            .unwrap();
        db.add_feed("https://a.example.com/feed", "!a", None)
            .await
            .unwrap();

        let urls = db.list_feed_urls().await.unwrap();
        assert_eq!(
            urls,
            vec!["https://a.example.com/feed", "https://b.example.com/feed"]
        );
    }

    #[tokio::test]
    async fn test_sparse_update_touches_only_some_fields() {
        let db = test_db().await;
        db.add_feed("https://example.com/feed", "!room", None)
            .await
            .unwrap();
        db.update_feed(
            "https://example.com/feed",
            FeedUpdate {
                last_updated: Some(1_630_000_000),
                last_fetch_snapshot: Some("<rss/>".to_string()),
                failure_count: Some(0),
            },
        )
        .await
        .unwrap();

        // Only the counter this time; snapshot and timestamp must survive.
        db.update_feed(
            "https://example.com/feed",
            FeedUpdate {
                failure_count: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let record = db.get_feed("https://example.com/feed").await.unwrap().unwrap();
        assert_eq!(record.last_updated, Some(1_630_000_000));
        assert_eq!(record.last_fetch_snapshot.as_deref(), Some("<rss/>"));
        assert_eq!(record.failure_count, 3);
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() {
        let db = test_db().await;
        db.add_feed("https://example.com/feed", "!room", None)
            .await
            .unwrap();
        db.update_feed("https://example.com/feed", FeedUpdate::default())
            .await
            .unwrap();

        let record = db.get_feed("https://example.com/feed").await.unwrap().unwrap();
        assert_eq!(record.failure_count, 0);
    }

    #[tokio::test]
    async fn test_increment_failures_returns_new_count() {
        let db = test_db().await;
        db.add_feed("https://example.com/feed", "!room", None)
            .await
            .unwrap();

        assert_eq!(db.increment_failures("https://example.com/feed").await.unwrap(), 1);
        assert_eq!(db.increment_failures("https://example.com/feed").await.unwrap(), 2);

        db.update_feed(
            "https://example.com/feed",
            FeedUpdate {
                failure_count: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let record = db.get_feed("https://example.com/feed").await.unwrap().unwrap();
        assert_eq!(record.failure_count, 0);
    }

    #[tokio::test]
    async fn test_increments_are_isolated_per_feed() {
        let db = test_db().await;
        db.add_feed("https://a.example.com/feed", "!a", None)
            .await
            .unwrap();
        db.add_feed("https://b.example.com/feed", "!b", None)
            .await
            .unwrap();

        db.increment_failures("https://a.example.com/feed").await.unwrap();

        let a = db.get_feed("https://a.example.com/feed").await.unwrap().unwrap();
        let b = db.get_feed("https://b.example.com/feed").await.unwrap().unwrap();
        assert_eq!(a.failure_count, 1);
        assert_eq!(b.failure_count, 0);
    }
}
