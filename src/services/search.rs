// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::{SearchError, SearchOutcome};
use crate::models::search::{AsyncSearchEnvelope, SearchNotification, SearchStrategy};
use crate::models::timeline::TimelineRequest;
use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Stream of notifications for one search: running notifications, then one
/// final payload or error
pub type SearchStream = BoxStream<'static, SearchOutcome<SearchNotification>>;

/// Per-search options passed alongside the request
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub strategy: SearchStrategy,
    /// Advisory abort signal; the service should stop work once it fires
    pub cancel: CancellationToken,
    pub index_pattern: Option<String>,
}

/// Backend executing timeline searches
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(
        &self,
        request: &TimelineRequest,
        options: SearchOptions,
    ) -> SearchOutcome<SearchStream>;

    /// Error-reporting side channel for failed searches
    fn show_error(&self, error: &SearchError) {
        tracing::error!(error = %error, "timeline search failed");
    }
}

/// Search service client for the async search HTTP endpoints
pub struct HttpSearchService {
    client: Client,
    base_url: Url,
    poll_interval: Duration,
}

impl HttpSearchService {
    pub fn new(
        base_url: Url,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        // Joining relative paths drops the last segment unless the path ends with a slash
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        tracing::info!(url = %base_url, "Search service client configured");

        Ok(Self {
            client,
            base_url,
            poll_interval,
        })
    }
}

fn search_endpoint(base: &Url, strategy: SearchStrategy, id: Option<&str>) -> SearchOutcome<Url> {
    let path = match id {
        Some(id) => format!("internal/search/{}/{}", strategy, id),
        None => format!("internal/search/{}", strategy),
    };
    base.join(&path)
        .map_err(|e| SearchError::transport(format!("invalid search endpoint: {}", e)))
}

async fn read_envelope(response: Response) -> SearchOutcome<AsyncSearchEnvelope> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SearchError::decode(e.to_string()))
}

/// Send one submit or poll round-trip, giving up as soon as `cancel` fires
async fn round_trip(
    client: &Client,
    url: Url,
    body: &serde_json::Value,
    cancel: &CancellationToken,
) -> SearchOutcome<AsyncSearchEnvelope> {
    tokio::select! {
        _ = cancel.cancelled() => Err(SearchError::Aborted),
        sent = client.post(url).json(body).send() => read_envelope(sent?).await,
    }
}

/// Server-side search that is deleted when the stream goes away before it completes.
/// Consumers may drop the stream at any await point, including mid-poll.
struct PendingSearch {
    client: Client,
    url: Option<Url>,
}

impl PendingSearch {
    fn new(client: Client) -> Self {
        Self { client, url: None }
    }

    fn arm(&mut self, url: Url) {
        self.url = Some(url);
    }

    fn disarm(&mut self) {
        self.url = None;
    }
}

impl Drop for PendingSearch {
    fn drop(&mut self) {
        let Some(url) = self.url.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(delete_search(self.client.clone(), url));
            }
            Err(_) => tracing::warn!(url = %url, "No runtime left to delete async search"),
        }
    }
}

/// Best-effort removal of a server-side search nobody is waiting for
async fn delete_search(client: Client, url: Url) {
    match client.delete(url.clone()).send().await {
        Ok(response) => {
            tracing::debug!(url = %url, status = %response.status(), "Deleted async search")
        }
        Err(e) => tracing::warn!(url = %url, error = %e, "Failed to delete async search"),
    }
}

#[async_trait]
impl SearchService for HttpSearchService {
    async fn search(
        &self,
        request: &TimelineRequest,
        options: SearchOptions,
    ) -> SearchOutcome<SearchStream> {
        let submit_url = search_endpoint(&self.base_url, options.strategy, None)?;
        let body = serde_json::to_value(request).map_err(|e| SearchError::decode(e.to_string()))?;
        let client = self.client.clone();
        let base = self.base_url.clone();
        let poll_interval = self.poll_interval;
        let strategy = options.strategy;
        let cancel = options.cancel;

        let stream = async_stream::stream! {
            let mut url = submit_url;
            let mut pending = PendingSearch::new(client.clone());

            loop {
                let envelope = match round_trip(&client, url.clone(), &body, &cancel).await {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                let poll_url = match envelope.id.as_deref() {
                    Some(id) => search_endpoint(&base, strategy, Some(id)).map(Some),
                    None => Ok(None),
                };
                let poll_url = match poll_url {
                    Ok(poll_url) => poll_url,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                let notification = envelope.into_notification();
                if !notification.is_running() {
                    pending.disarm();
                    yield Ok(notification);
                    break;
                }

                let Some(next_url) = poll_url else {
                    yield Err(SearchError::decode("running search response without an id"));
                    break;
                };
                pending.arm(next_url.clone());
                yield Ok(SearchNotification::Running);

                let cancelled = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = sleep(poll_interval) => false,
                };
                if cancelled {
                    yield Err(SearchError::Aborted);
                    break;
                }
                url = next_url;
            }
        };

        Ok(Box::pin(stream))
    }
}
