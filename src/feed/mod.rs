//! Feed retrieval, parsing, and novelty detection.
//!
//! - [`fetcher`] — timed HTTP retrieval of raw feed documents
//! - [`parser`] — tolerant RSS/Atom parsing via `feed-rs`
//! - [`differ`] — set difference against the previous raw snapshot
//! - [`probe`] — one-shot validation used by onboarding flows

mod differ;
mod fetcher;
mod parser;
mod probe;

pub use differ::new_entries;
pub use fetcher::{FetchError, Fetcher};
pub use parser::{parse, Entry, Feed, ParseError};
pub use probe::{normalize_feed_url, probe, ProbeError, UrlError};
