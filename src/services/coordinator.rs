// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Timeline query coordinator.
//!
//! Owns the request/response lifecycle of one timeline: derives requests from
//! presentation inputs, keeps at most one search in flight, and for the
//! distinguished timeline mirrors results into the [`PageCache`] so that
//! returning to a page restores them without searching.
//!
//! Every search gets a generation number and a cancellation token. Starting a
//! new search cancels the previous token; notifications from an older
//! generation are dropped, so a late response can never overwrite a newer one.

use crate::error::SearchError;
use crate::models::search::{SearchNotification, SearchStrategy, TimelineSearchPayload};
use crate::models::timeline::{
    InspectLog, LoadingEvent, LoadingState, QueryInputs, TimelineId, TimelineRequest,
    TimelineResponse, TimelineSnapshot,
};
use crate::services::cache::{PageCache, RowStateStore};
use crate::services::logging::redact_filter;
use crate::services::request::{derive_request, DerivedRequest};
use crate::services::search::{SearchOptions, SearchService, SearchStream};
use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Invoked once with the response of a successful search
pub type ResultCallback = Box<dyn FnOnce(&TimelineResponse) + Send + 'static>;

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

struct CoordinatorState {
    loading: LoadingState,
    active_page: usize,
    page_name: String,
    skip: bool,
    inputs: Option<QueryInputs>,
    /// Latest derived request
    request: Option<TimelineRequest>,
    /// Request the displayed results belong to
    last_searched: Option<TimelineRequest>,
    last_filter: Option<String>,
    /// Request re-run by `refetch_grid`
    refetch_request: Option<TimelineRequest>,
    response: TimelineResponse,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl CoordinatorState {
    fn new(id: TimelineId, active_page: usize) -> Self {
        Self {
            loading: LoadingState::default(),
            active_page,
            page_name: String::new(),
            skip: false,
            inputs: None,
            request: None,
            last_searched: None,
            last_filter: None,
            refetch_request: None,
            response: TimelineResponse::empty(id),
            generation: 0,
            in_flight: None,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.in_flight.as_ref().map(|f| f.generation) == Some(generation)
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
            tracing::debug!(generation = in_flight.generation, "Cancelled in-flight search");
        }
    }

    fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            loading: self.loading,
            response: self.response.clone(),
        }
    }
}

struct Shared {
    id: TimelineId,
    search: Arc<dyn SearchService>,
    cache: PageCache,
    row_state: Option<RowStateStore>,
    state: Mutex<CoordinatorState>,
    snapshots: watch::Sender<TimelineSnapshot>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.state.get_mut().cancel_in_flight();
    }
}

/// Handle to a timeline's query coordinator; clones share the same state
#[derive(Clone)]
pub struct TimelineCoordinator {
    shared: Arc<Shared>,
}

impl TimelineCoordinator {
    /// Create a coordinator with its own page cache
    pub fn new(id: TimelineId, search: Arc<dyn SearchService>) -> Self {
        Self::with_all(id, search, PageCache::new(), None)
    }

    /// Create a coordinator sharing a page cache with its owner
    pub fn with_cache(id: TimelineId, search: Arc<dyn SearchService>, cache: PageCache) -> Self {
        Self::with_all(id, search, cache, None)
    }

    /// Create a coordinator with a page cache and a row state store
    pub fn with_all(
        id: TimelineId,
        search: Arc<dyn SearchService>,
        cache: PageCache,
        row_state: Option<RowStateStore>,
    ) -> Self {
        let active_page = if id.is_active() {
            cache.get_active_page()
        } else {
            0
        };
        let state = CoordinatorState::new(id.clone(), active_page);
        let (snapshots, _) = watch::channel(state.snapshot());

        Self {
            shared: Arc::new(Shared {
                id,
                search,
                cache,
                row_state,
                state: Mutex::new(state),
                snapshots,
            }),
        }
    }

    pub fn id(&self) -> &TimelineId {
        &self.shared.id
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn loading_state(&self) -> LoadingState {
        self.shared.state.lock().loading
    }

    pub fn response(&self) -> TimelineResponse {
        self.shared.state.lock().response.clone()
    }

    pub fn active_page(&self) -> usize {
        self.shared.state.lock().active_page
    }

    /// Latest derived request, if any inputs produced one
    pub fn current_request(&self) -> Option<TimelineRequest> {
        self.shared.state.lock().request.clone()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<TimelineSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Cancel the in-flight search, if any, leaving displayed results untouched
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.cancel_in_flight();
        state.loading = state.loading.on(LoadingEvent::Settled);
        self.publish(&state);
    }

    fn publish(&self, state: &CoordinatorState) {
        self.shared.snapshots.send_replace(state.snapshot());
    }

    /// Apply new presentation inputs, searching if the request or filter changed
    pub async fn update_inputs(&self, inputs: QueryInputs) {
        let trigger = {
            let mut state = self.shared.state.lock();
            let trigger = self.apply_inputs(&mut state, inputs);
            self.publish(&state);
            trigger
        };

        if trigger.is_some() {
            self.execute_search(trigger, None).await;
        }
    }

    fn apply_inputs(
        &self,
        state: &mut CoordinatorState,
        inputs: QueryInputs,
    ) -> Option<TimelineRequest> {
        let derivation = derive_request(&inputs, state.request.as_ref(), state.active_page);

        if derivation.active_page != state.active_page {
            state.active_page = derivation.active_page;
            if self.shared.id.is_active() {
                self.shared.cache.set_active_page(derivation.active_page);
            }
        }
        if let DerivedRequest::Changed(request) = derivation.request {
            state.request = Some(request);
        }

        let filter_changed = state.last_filter.as_deref() != Some(inputs.filter_query.as_str());
        if filter_changed && inputs.filter_query.is_empty() {
            // Never show results of a query the user just removed, including late ones
            if state.loading.is_loading() {
                tracing::debug!(timeline = %self.shared.id, "Filter cleared during search");
            }
            state.cancel_in_flight();
            state.loading = state.loading.on(LoadingEvent::Settled);
            state.response = TimelineResponse::empty(self.shared.id.clone());
        }

        state.last_filter = Some(inputs.filter_query.clone());
        state.page_name = inputs.page_name.clone();
        state.skip = inputs.skip;
        state.inputs = Some(inputs);

        match &state.request {
            Some(request) if filter_changed || state.last_searched.as_ref() != Some(request) => {
                Some(request.clone())
            }
            _ => None,
        }
    }

    /// Run `request` unless searching is suppressed.
    ///
    /// When the distinguished timeline comes back to a page other than the one
    /// its cache was filled on, the cached response is restored instead and
    /// no search is dispatched if one exists for the request's dialect.
    pub async fn execute_search(
        &self,
        request: Option<TimelineRequest>,
        on_result: Option<ResultCallback>,
    ) {
        let Some(request) = request else {
            return;
        };

        {
            let mut state = self.shared.state.lock();
            if state.page_name.is_empty() || state.skip {
                return;
            }

            if self.shared.id.is_active() {
                let cached_page = self.shared.cache.get_page_name();
                if !cached_page.is_empty() && cached_page != state.page_name {
                    let restored = self.restore_from_cache(&mut state, &request);
                    self.publish(&state);
                    if restored {
                        return;
                    }
                }
            }
        }

        self.run_search(request, on_result).await;
    }

    /// Returns true if a cached response for the request's dialect was restored
    fn restore_from_cache(&self, state: &mut CoordinatorState, request: &TimelineRequest) -> bool {
        let cache = &self.shared.cache;
        cache.set_page_name(&state.page_name);
        state.cancel_in_flight();
        state.loading = state.loading.on(LoadingEvent::Settled);
        state.last_searched = cache.request_for(request.language);
        state.refetch_request = Some(request.clone());

        match cache.response_for(request.language) {
            Some(mut cached) => {
                cached.id = self.shared.id.clone();
                state.response = cached;
                tracing::info!(
                    timeline = %self.shared.id,
                    page = %state.page_name,
                    "Restored cached timeline response"
                );
                true
            }
            None => false,
        }
    }

    async fn run_search(&self, request: TimelineRequest, on_result: Option<ResultCallback>) {
        let search_id = Uuid::now_v7();
        let strategy = SearchStrategy::for_language(request.language);
        let cancel = CancellationToken::new();

        let (generation, page_name) = {
            let mut state = self.shared.state.lock();
            state.cancel_in_flight();
            state.generation += 1;
            state.in_flight = Some(InFlight {
                generation: state.generation,
                cancel: cancel.clone(),
            });
            state.last_searched = Some(request.clone());
            state.refetch_request = Some(request.clone());
            state.loading = state.loading.on(LoadingEvent::SearchStarted {
                page: request.active_page(),
            });
            self.publish(&state);
            (state.generation, state.page_name.clone())
        };

        tracing::info!(
            timeline = %self.shared.id,
            %search_id,
            %strategy,
            page = request.active_page(),
            filter = %redact_filter(&request.filter_query),
            "Dispatching timeline search"
        );

        let options = SearchOptions {
            strategy,
            cancel: cancel.clone(),
            index_pattern: Some(request.default_index.join(",")),
        };

        let stream = match self.shared.search.search(&request, options).await {
            Ok(stream) => stream,
            Err(e) => {
                self.settle_with_error(generation, e);
                return;
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!(%search_id, "Search superseded before subscribing");
            return;
        }

        let subscription = Subscription {
            coordinator: Arc::downgrade(&self.shared),
            generation,
            search_id,
            page_name,
            request,
            cancel,
            on_result,
        };
        tokio::spawn(subscription.consume(stream));
    }

    fn settle_with_payload(
        &self,
        generation: u64,
        page_name: &str,
        request: TimelineRequest,
        payload: TimelineSearchPayload,
        on_result: Option<ResultCallback>,
    ) {
        let response = {
            let mut state = self.shared.state.lock();
            if !state.is_current(generation) {
                return;
            }
            state.in_flight = None;
            state.loading = state.loading.on(LoadingEvent::Settled);

            let refreshed_at = Utc::now()
                .timestamp_millis()
                .max(state.response.refreshed_at + 1);
            let response = TimelineResponse {
                id: self.shared.id.clone(),
                inspect: merge_inspect(&state.response.inspect, &payload),
                events: payload.edges,
                page_info: payload.page_info,
                total_count: payload.total_count,
                refreshed_at,
            };
            state.response = response.clone();

            if self.shared.id.is_active() {
                self.shared
                    .cache
                    .store(page_name, request, response.clone());
            }

            self.publish(&state);
            response
        };

        tracing::info!(
            timeline = %self.shared.id,
            total = response.total_count,
            events = response.events.len(),
            "Timeline search completed"
        );

        if let Some(callback) = on_result {
            callback(&response);
        }
    }

    fn settle_with_error(&self, generation: u64, error: SearchError) {
        {
            let mut state = self.shared.state.lock();
            if !state.is_current(generation) {
                return;
            }
            state.in_flight = None;
            state.loading = state.loading.on(LoadingEvent::Settled);
            self.publish(&state);
        }

        if error.is_aborted() {
            tracing::debug!(timeline = %self.shared.id, "Timeline search aborted");
            return;
        }
        tracing::warn!(timeline = %self.shared.id, error = %error, "Timeline search failed");
        self.shared.search.show_error(&error);
    }

    /// Move to another page of the current query
    pub async fn load_page(&self, page: usize) {
        let id = &self.shared.id;
        if let Some(row_state) = &self.shared.row_state {
            if id.tracks_row_state() {
                row_state.clear(id);
            }
        }
        if id.is_active() {
            self.shared.cache.set_active_page(page);
        }

        let trigger = {
            let mut state = self.shared.state.lock();
            state.active_page = page;
            let trigger = match state.inputs.clone() {
                Some(inputs) => self.apply_inputs(&mut state, inputs),
                None => None,
            };
            self.publish(&state);
            trigger
        };

        if trigger.is_some() {
            self.execute_search(trigger, None).await;
        }
    }

    /// Re-run the last search, then go back to the first page
    pub async fn refetch_grid(&self) {
        let request = self.shared.state.lock().refetch_request.clone();
        if let Some(request) = request {
            self.run_search(request, None).await;
        }
        self.load_page(0).await;
    }
}

/// Consumer of one search stream
struct Subscription {
    coordinator: Weak<Shared>,
    generation: u64,
    search_id: Uuid,
    page_name: String,
    request: TimelineRequest,
    cancel: CancellationToken,
    on_result: Option<ResultCallback>,
}

impl Subscription {
    async fn consume(self, mut stream: SearchStream) {
        loop {
            let item = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(search_id = %self.search_id, "Unsubscribed from cancelled search");
                    return;
                }
                item = stream.next() => item,
            };

            let Some(shared) = self.coordinator.upgrade() else {
                return;
            };
            let coordinator = TimelineCoordinator { shared };

            match item {
                Some(Ok(SearchNotification::Running)) => {
                    tracing::trace!(search_id = %self.search_id, "Search still running");
                }
                Some(Ok(SearchNotification::Complete(payload))) => {
                    coordinator.settle_with_payload(
                        self.generation,
                        &self.page_name,
                        self.request,
                        payload,
                        self.on_result,
                    );
                    return;
                }
                Some(Err(e)) => {
                    coordinator.settle_with_error(self.generation, e);
                    return;
                }
                None => {
                    coordinator.settle_with_error(self.generation, SearchError::Incomplete);
                    return;
                }
            }
        }
    }
}

fn merge_inspect(previous: &InspectLog, payload: &TimelineSearchPayload) -> InspectLog {
    let dsl = payload
        .inspect
        .as_ref()
        .map(|inspect| inspect.dsl.clone())
        .unwrap_or_else(|| previous.dsl.clone());
    let response = serde_json::to_string_pretty(&payload.raw_response)
        .map(|raw| vec![raw])
        .unwrap_or_else(|_| previous.response.clone());

    InspectLog { dsl, response }
}
