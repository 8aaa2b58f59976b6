use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised only when the top-level feed structure is unusable.
/// Malformed individual entries never fail the parse; they are dropped.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not recognizable as RSS or Atom at all.
    #[error("Unrecognized feed document: {0}")]
    Syntax(#[from] feed_rs::parser::ParseFeedError),
    /// The feed carries no top-level title.
    #[error("Feed has no title")]
    MissingTitle,
    /// The feed carries no top-level link.
    #[error("Feed has no link")]
    MissingLink,
}

/// A successfully parsed feed snapshot.
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    /// Feed subtitle/description; a placeholder referencing the feed link
    /// when the source has none.
    pub subtitle: String,
    pub link: String,
    /// Top-level updated timestamp. `None` when the source has none; the
    /// commit step substitutes the observation time.
    pub updated: Option<DateTime<Utc>>,
    /// Entries in source order, minus any that failed extraction.
    pub entries: Vec<Entry>,
}

/// One feed item.
///
/// Structural equality over the full field tuple is the novelty identity:
/// two entries are the same item iff every field matches exactly. Entries
/// with identical content but different incidental metadata upstream are
/// therefore indistinguishable — a known limitation.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub title: String,
    /// Publication time; falls back to the entry's updated time.
    pub published: DateTime<Utc>,
    pub summary: Option<String>,
    pub link: Option<String>,
    /// Populated only when the source supplies exactly one content block
    /// explicitly typed as HTML text.
    pub content: Option<String>,
}

/// Parse a raw feed document into a [`Feed`].
///
/// Required top-level fields are title and link. Each entry is parsed
/// independently; entries missing a title or a published/updated timestamp
/// are dropped rather than failing the whole parse.
pub fn parse(raw: &str) -> Result<Feed, ParseError> {
    let parsed = feed_rs::parser::parse(raw.as_bytes())?;

    let title = parsed
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .ok_or(ParseError::MissingTitle)?;
    let link = parsed
        .links
        .first()
        .map(|l| l.href.clone())
        .ok_or(ParseError::MissingLink)?;
    let subtitle = parsed
        .description
        .map(|t| t.content)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("Available at {link}"));

    let total = parsed.entries.len();
    let entries: Vec<Entry> = parsed.entries.into_iter().filter_map(convert_entry).collect();
    if entries.len() < total {
        tracing::debug!(
            feed = %link,
            dropped = total - entries.len(),
            "Dropped entries missing required fields"
        );
    }

    Ok(Feed {
        title,
        subtitle,
        link,
        updated: parsed.updated,
        entries,
    })
}

fn convert_entry(entry: feed_rs::model::Entry) -> Option<Entry> {
    let title = entry.title.map(|t| t.content).filter(|t| !t.is_empty())?;
    let published = entry.published.or(entry.updated)?;
    let summary = entry.summary.map(|s| s.content);
    let link = entry.links.first().map(|l| l.href.clone());
    let content = entry.content.and_then(|c| {
        if c.content_type.to_string().starts_with("text/html") {
            c.body
        } else {
            None
        }
    });

    Some(Entry {
        title,
        published,
        summary,
        link,
        content,
    })
}
