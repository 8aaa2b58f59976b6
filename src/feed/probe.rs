use thiserror::Error;
use url::Url;

use super::fetcher::{FetchError, Fetcher};
use super::parser::{self, Feed, ParseError};

/// Failure of a one-shot probe, keeping the fetch/parse distinction so an
/// onboarding flow can tell "that URL didn't respond" from "that's not a
/// feed".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Fetch and parse a feed once, without touching any stored state.
///
/// Intended for onboarding flows that validate a URL before registering
/// it. The raw document is returned alongside the parse so the caller can
/// seed the feed's initial snapshot from the same fetch.
pub async fn probe(fetcher: &Fetcher, url: &str) -> Result<(Feed, String), ProbeError> {
    let raw = fetcher.fetch(url).await?;
    let feed = parser::parse(&raw)?;
    Ok((feed, raw))
}

/// Errors from [`normalize_feed_url`].
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("URLs with query parameters are not supported")]
    QueryNotSupported,
}

/// Normalize user input into a canonical feed URL.
///
/// A bare host gets an https scheme, fragments are stripped, and URLs with
/// query parameters are rejected: two URLs differing only in their query
/// would otherwise race to be "the" tracked feed for the same content.
pub fn normalize_feed_url(input: &str) -> Result<String, UrlError> {
    let trimmed = input.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut parsed = Url::parse(&candidate)?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    }
    if parsed.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }
    if parsed.query().is_some() {
        return Err(UrlError::QueryNotSupported);
    }
    parsed.set_fragment(None);

    Ok(parsed.into())
}
