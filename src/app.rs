// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, route handlers, and router construction.
//!
//! The HTTP API is the presentation layer's view of one timeline coordinator:
//! it pushes inputs and page changes in and reads snapshots back. This module
//! is `pub` so that integration tests can build a test router directly
//! without starting the full binary.

use crate::models::timeline::{QueryInputs, TimelineSnapshot};
use crate::models::version::VersionResponse;
use crate::services::coordinator::TimelineCoordinator;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `TIMELINE_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("TIMELINE_VERSION");

/// Shared application state injected into every route handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: TimelineCoordinator,
}

pub async fn version_handler(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        agent: "timeline-agent".to_string(),
        version: VERSION.to_string(),
        timeline_id: state.coordinator.id().to_string(),
    })
}

pub async fn snapshot_handler(State(state): State<AppState>) -> Json<TimelineSnapshot> {
    Json(state.coordinator.snapshot())
}

pub async fn update_inputs_handler(
    State(state): State<AppState>,
    Json(inputs): Json<QueryInputs>,
) -> Json<TimelineSnapshot> {
    state.coordinator.update_inputs(inputs).await;
    Json(state.coordinator.snapshot())
}

pub async fn load_page_handler(
    State(state): State<AppState>,
    Path(page): Path<usize>,
) -> Json<TimelineSnapshot> {
    state.coordinator.load_page(page).await;
    Json(state.coordinator.snapshot())
}

pub async fn refetch_handler(State(state): State<AppState>) -> Json<TimelineSnapshot> {
    state.coordinator.refetch_grid().await;
    Json(state.coordinator.snapshot())
}

/// Build the Axum application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/version", get(version_handler))
        .route("/timeline", get(snapshot_handler))
        .route("/timeline/inputs", put(update_inputs_handler))
        .route("/timeline/page/{page}", post(load_page_handler))
        .route("/timeline/refetch", post(refetch_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SearchError, SearchOutcome};
    use crate::models::search::{SearchNotification, TimelineSearchPayload};
    use crate::models::timeline::{LoadingState, TimelineId, TimelineRequest};
    use crate::services::search::{SearchOptions, SearchService, SearchStream};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Answers every search immediately with a fixed total
    #[derive(Default)]
    struct InstantSearch {
        requests: Mutex<Vec<TimelineRequest>>,
    }

    #[async_trait]
    impl SearchService for InstantSearch {
        async fn search(
            &self,
            request: &TimelineRequest,
            _options: SearchOptions,
        ) -> SearchOutcome<SearchStream> {
            self.requests.lock().push(request.clone());
            let payload = TimelineSearchPayload {
                edges: Vec::new(),
                page_info: Default::default(),
                total_count: 42,
                inspect: None,
                raw_response: json!({}),
            };
            let items: Vec<Result<SearchNotification, SearchError>> =
                vec![Ok(SearchNotification::Complete(payload))];
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn create_test_app() -> (Arc<InstantSearch>, Router) {
        let search = Arc::new(InstantSearch::default());
        let coordinator = TimelineCoordinator::new(TimelineId::active(), search.clone());
        (search, create_router(AppState { coordinator }))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn inputs_body() -> Body {
        Body::from(
            json!({
                "index_names": ["logs-*"],
                "fields": ["@timestamp", "host.name"],
                "filter_query": "host.name: web-1",
                "start_date": "2026-01-01T00:00:00Z",
                "end_date": "2026-01-02T00:00:00Z",
                "page_name": "hosts"
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_version_endpoint_response() {
        let (_, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let version: VersionResponse = read_json(response).await;
        assert_eq!(version.agent, "timeline-agent");
        assert_eq!(version.version, VERSION);
        assert_eq!(version.timeline_id, "timeline-1");
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_empty() {
        let (_, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/timeline")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let snapshot: TimelineSnapshot = read_json(response).await;
        assert_eq!(snapshot.loading, LoadingState::Loaded);
        assert_eq!(snapshot.response.total_count, -1);
    }

    #[tokio::test]
    async fn test_put_inputs_dispatches_search() {
        let (search, app) = create_test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/timeline/inputs")
                    .header("content-type", "application/json")
                    .body(inputs_body())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(search.requests.lock().len(), 1);
        assert_eq!(
            search.requests.lock()[0].field_requested,
            vec!["@timestamp", "host.name"]
        );

        // The instant search settles on the runtime; poll the snapshot until it lands
        let mut snapshot: TimelineSnapshot = read_json(response).await;
        for _ in 0..50 {
            if snapshot.response.total_count == 42 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/timeline").body(Body::empty()).unwrap())
                .await
                .unwrap();
            snapshot = read_json(response).await;
        }
        assert_eq!(snapshot.response.total_count, 42);
        assert_eq!(snapshot.loading, LoadingState::Loaded);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let (search, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/timeline/inputs")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"index_names": "not-a-list"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(search.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_load_page_endpoint() {
        let (search, app) = create_test_app();

        app.clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/timeline/inputs")
                    .header("content-type", "application/json")
                    .body(inputs_body())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/timeline/page/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let requests = search.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].pagination.active_page, 2);
    }

    #[tokio::test]
    async fn test_refetch_without_search_is_ok() {
        let (search, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/timeline/refetch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(search.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_route_returns_404() {
        let (_, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/invalid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
