//! feedroom watches a set of RSS/Atom feeds and posts new entries into
//! chat rooms through a pluggable [`publish::Publisher`].
//!
//! The core is the per-feed polling engine in [`tracker`]: each tracked
//! feed gets one long-lived task that fetches, parses, diffs against the
//! previous snapshot, publishes new entries in feed order, and commits the
//! new snapshot only once every publish succeeded. Transient failures only
//! bump a per-feed counter; the feed is retried forever.

pub mod config;
pub mod feed;
pub mod publish;
pub mod storage;
pub mod tracker;
