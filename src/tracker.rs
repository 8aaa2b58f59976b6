//! Per-feed polling tasks.
//!
//! Every tracked feed gets its own perpetual tokio task. A task sleeps a
//! randomized interval, then runs one poll cycle: fetch, parse, diff
//! against the stored snapshot, publish whatever is new, and only then
//! commit the new snapshot. Feeds never share fate; one feed's failures
//! touch nothing but its own row.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::UnexpectedPolicy;
use crate::feed::{self, Feed, FetchError, Fetcher, ParseError, ProbeError};
use crate::publish::{PublishError, Publisher};
use crate::storage::{Database, FeedUpdate, StoreError};

// ============================================================================
// Error Types
// ============================================================================

/// Anything that can end a poll cycle early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// Infrastructure trouble, not feed trouble.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CycleError {
    /// Whether this failure reflects on the feed itself and should bump
    /// its failure counter. Store errors do not: a broken database says
    /// nothing about the feed.
    pub fn counts_against_feed(&self) -> bool {
        !matches!(self, CycleError::Store(_))
    }
}

/// Failure while validating and registering a new feed.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a completed cycle did.
#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Cycle ran to commit; this many entries were published.
    Published(usize),
    /// The feed's row has disappeared from the store. The task has
    /// nothing left to poll.
    FeedGone,
}

// ============================================================================
// Tracker
// ============================================================================

#[derive(Clone)]
pub struct TrackerConfig {
    /// Nominal poll interval. Actual sleeps are jittered around it.
    pub interval: Duration,
    /// What to do when a cycle hits a store error.
    pub on_unexpected: UnexpectedPolicy,
}

/// Owns the poll loop for every tracked feed.
pub struct Tracker<P> {
    db: Database,
    fetcher: Fetcher,
    publisher: P,
    config: TrackerConfig,
}

impl<P: Clone> Clone for Tracker<P> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            fetcher: self.fetcher.clone(),
            publisher: self.publisher.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P> Tracker<P>
where
    P: Publisher + Clone + Send + Sync + 'static,
{
    pub fn new(db: Database, fetcher: Fetcher, publisher: P, config: TrackerConfig) -> Self {
        Self {
            db,
            fetcher,
            publisher,
            config,
        }
    }

    /// Spawn one poll task per tracked feed. The feed list is read once;
    /// feeds registered later need their own [`Tracker::track_feed`] call.
    pub async fn spawn_all(&self) -> Result<Vec<JoinHandle<()>>, StoreError> {
        let urls = self.db.list_feed_urls().await?;
        tracing::info!(feeds = urls.len(), "Spawning feed poll tasks");
        Ok(urls.into_iter().map(|url| self.track_feed(url)).collect())
    }

    /// Spawn the perpetual poll task for one feed.
    pub fn track_feed(&self, url: String) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move { tracker.run_feed_loop(url).await })
    }

    /// Validate, register, and seed a new feed.
    ///
    /// The document fetched for validation is committed as the initial
    /// snapshot, so the first poll cycle reports only entries that appear
    /// after registration instead of flooding the target with the feed's
    /// existing backlog.
    pub async fn register_feed(
        &self,
        url: &str,
        target: &str,
        owner: Option<&str>,
    ) -> Result<Feed, RegisterError> {
        let (parsed, raw) = feed::probe(&self.fetcher, url).await?;
        self.db.add_feed(url, target, owner).await?;
        self.db
            .update_feed(
                url,
                FeedUpdate {
                    last_updated: Some(parsed.updated.unwrap_or_else(Utc::now).timestamp()),
                    last_fetch_snapshot: Some(raw),
                    failure_count: Some(0),
                },
            )
            .await?;
        Ok(parsed)
    }

    async fn run_feed_loop(&self, url: String) {
        // Stagger the first poll so feeds sharing a boot do not fetch in
        // one burst.
        tokio::time::sleep(initial_delay(self.config.interval)).await;

        while self.poll_once(&url).await {
            tokio::time::sleep(cycle_delay(self.config.interval)).await;
        }
    }

    /// One scheduler step for one feed: run a cycle, then apply the
    /// failure bookkeeping and the unexpected-error policy. Returns
    /// `false` when the feed's task has no reason to keep polling.
    pub async fn poll_once(&self, url: &str) -> bool {
        match self.run_cycle(url).await {
            Ok(CycleOutcome::Published(count)) => {
                if count > 0 {
                    tracing::info!(url = %url, count, "Published new entries");
                } else {
                    tracing::debug!(url = %url, "No new entries");
                }
                true
            }
            Ok(CycleOutcome::FeedGone) => {
                tracing::warn!(url = %url, "Feed no longer tracked, stopping poll task");
                false
            }
            Err(e) if e.counts_against_feed() => match self.db.increment_failures(url).await {
                Ok(count) => {
                    tracing::warn!(url = %url, error = %e, failures = count, "Poll cycle failed");
                    true
                }
                Err(store_err) => {
                    tracing::error!(url = %url, error = %store_err, "Failed to record poll failure");
                    self.config.on_unexpected != UnexpectedPolicy::Fatal
                }
            },
            Err(e) => match self.config.on_unexpected {
                UnexpectedPolicy::Fatal => {
                    tracing::error!(url = %url, error = %e, "Unexpected error, stopping poll task");
                    false
                }
                UnexpectedPolicy::Continue => {
                    tracing::error!(url = %url, error = %e, "Unexpected error, will retry next cycle");
                    true
                }
            },
        }
    }

    /// One poll cycle for one feed. Publishes before committing, so a
    /// crash or failed delivery replays the same entries next cycle
    /// instead of silently dropping them.
    pub async fn run_cycle(&self, url: &str) -> Result<CycleOutcome, CycleError> {
        let Some(record) = self.db.get_feed(url).await? else {
            return Ok(CycleOutcome::FeedGone);
        };

        let raw = self.fetcher.fetch(url).await?;
        let parsed = feed::parse(&raw)?;
        let fresh = feed::new_entries(record.last_fetch_snapshot.as_deref(), &parsed);

        for entry in &fresh {
            self.publisher.publish(&record.target, entry).await?;
        }

        let published = fresh.len();
        self.db
            .update_feed(
                url,
                FeedUpdate {
                    last_updated: Some(parsed.updated.unwrap_or_else(Utc::now).timestamp()),
                    last_fetch_snapshot: Some(raw),
                    failure_count: Some(0),
                },
            )
            .await?;

        Ok(CycleOutcome::Published(published))
    }
}

// ============================================================================
// Jitter
// ============================================================================

/// Uniform delay in [0, interval) before a task's first poll.
fn initial_delay(interval: Duration) -> Duration {
    let max_ms = interval.as_millis().max(1) as u64;
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

/// Uniform delay in [0.8, 1.2) of the interval between polls.
fn cycle_delay(interval: Duration) -> Duration {
    let ms = interval.as_millis().max(1) as u64;
    let lo = ms * 4 / 5;
    let hi = (ms * 6 / 5).max(lo + 1);
    Duration::from_millis(rand::thread_rng().gen_range(lo..hi))
}
