use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Store-level errors. The polling cycle treats these as unexpected: they
/// say nothing about the health of the feed itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// The URL is already tracked.
    #[error("Feed already tracked: {0}")]
    DuplicateUrl(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// One tracked feed, as persisted. Mutated only by its own poll task after
/// creation; `url` is the immutable identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedRecord {
    pub url: String,
    /// Destination room/channel the feed publishes into.
    pub target: String,
    /// Actor that registered the feed.
    pub owner: Option<String>,
    /// Unix seconds of the last successful fetch's updated marker.
    pub last_updated: Option<i64>,
    /// Raw text of the most recent successfully parsed fetch; the novelty
    /// baseline. Updated even when a cycle found zero new entries.
    pub last_fetch_snapshot: Option<String>,
    pub failure_count: i64,
}

/// Sparse per-feed update: only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct FeedUpdate {
    pub last_updated: Option<i64>,
    pub last_fetch_snapshot: Option<String>,
    pub failure_count: Option<i64>,
}

impl FeedUpdate {
    pub fn is_empty(&self) -> bool {
        self.last_updated.is_none()
            && self.last_fetch_snapshot.is_none()
            && self.failure_count.is_none()
    }
}
