//! Delivery boundary: how new entries leave the polling core.
//!
//! The core only depends on the [`Publisher`] trait; the chat transport
//! behind it is somebody else's problem. Delivery is at-least-once across
//! crash boundaries, so implementations should tolerate the occasional
//! duplicate entry for the same target.

use std::future::Future;
use thiserror::Error;

use crate::feed::Entry;

/// Downstream delivery failed. The cycle aborts before commit and the
/// same entries are republished next cycle.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Delivery request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Delivery rejected: status {0}")]
    HttpStatus(u16),
    /// Catch-all for non-HTTP transports.
    #[error("Delivery failed: {0}")]
    Other(String),
}

/// Delivers one entry to one destination channel.
pub trait Publisher {
    fn publish(
        &self,
        target: &str,
        entry: &Entry,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Plain-text rendering of an entry: title, then content (or summary when
/// no content was extracted), then link.
pub fn render_body(entry: &Entry) -> String {
    let mut parts = vec![entry.title.as_str()];
    if let Some(text) = entry.content.as_deref().or(entry.summary.as_deref()) {
        parts.push(text);
    }
    if let Some(link) = entry.link.as_deref() {
        parts.push(link);
    }
    parts.join("\n\n")
}

/// HTML rendering of an entry, for transports with a formatted body.
pub fn render_html(entry: &Entry) -> String {
    let mut html = format!("<h1>{}</h1>", entry.title);
    if let Some(text) = entry.content.as_deref().or(entry.summary.as_deref()) {
        html.push_str(text);
    }
    if let Some(link) = entry.link.as_deref() {
        html.push_str(&format!("<p>{link}</p>"));
    }
    html
}

/// Publishes entries as JSON POSTs to a webhook endpoint.
///
/// Payload: `{ "target": ..., "body": ..., "formatted_body": ... }`.
#[derive(Clone)]
pub struct WebhookPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookPublisher {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

impl Publisher for WebhookPublisher {
    async fn publish(&self, target: &str, entry: &Entry) -> Result<(), PublishError> {
        let payload = serde_json::json!({
            "target": target,
            "body": render_body(entry),
            "formatted_body": render_html(entry),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Publisher that only logs. Used when no webhook is configured, so a new
/// deployment can watch what it would deliver before wiring a transport.
#[derive(Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    async fn publish(&self, target: &str, entry: &Entry) -> Result<(), PublishError> {
        tracing::info!(target_room = %target, title = %entry.title, "New entry (no webhook configured)");
        Ok(())
    }
}
