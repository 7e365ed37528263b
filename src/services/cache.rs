// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Stores that outlive a single coordinator.
//!
//! [`PageCache`] holds the last request and response of the distinguished
//! timeline together with the page they were fetched on, so returning to a
//! view can show results without searching again. [`RowStateStore`] keeps
//! per-row markers for timelines that track them. Both are cheap handles
//! over shared state: clone them into whatever owns the coordinators.

use crate::models::timeline::{Language, TimelineId, TimelineRequest, TimelineResponse};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct PageCacheEntry {
    active_page: usize,
    page_name: String,
    request: Option<TimelineRequest>,
    response: Option<TimelineResponse>,
    eql_request: Option<TimelineRequest>,
    eql_response: Option<TimelineResponse>,
    expanded_detail: Map<String, Value>,
}

/// Page-scoped cache slot of the distinguished timeline.
///
/// The coordinator writes results through [`PageCache::store`]. The per-slot
/// setters are for owners that seed or patch the cache directly, such as a
/// view preloading a page before its coordinator exists.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    entry: Arc<Mutex<PageCacheEntry>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_active_page(&self) -> usize {
        self.entry.lock().active_page
    }

    pub fn set_active_page(&self, page: usize) {
        self.entry.lock().active_page = page;
    }

    pub fn get_page_name(&self) -> String {
        self.entry.lock().page_name.clone()
    }

    pub fn set_page_name(&self, page_name: &str) {
        self.entry.lock().page_name = page_name.to_string();
    }

    pub fn get_request(&self) -> Option<TimelineRequest> {
        self.entry.lock().request.clone()
    }

    pub fn set_request(&self, request: TimelineRequest) {
        self.entry.lock().request = Some(request);
    }

    pub fn get_response(&self) -> Option<TimelineResponse> {
        self.entry.lock().response.clone()
    }

    pub fn set_response(&self, response: TimelineResponse) {
        self.entry.lock().response = Some(response);
    }

    pub fn get_eql_request(&self) -> Option<TimelineRequest> {
        self.entry.lock().eql_request.clone()
    }

    pub fn set_eql_request(&self, request: TimelineRequest) {
        self.entry.lock().eql_request = Some(request);
    }

    pub fn get_eql_response(&self) -> Option<TimelineResponse> {
        self.entry.lock().eql_response.clone()
    }

    pub fn set_eql_response(&self, response: TimelineResponse) {
        self.entry.lock().eql_response = Some(response);
    }

    pub fn get_expanded_detail(&self) -> Map<String, Value> {
        self.entry.lock().expanded_detail.clone()
    }

    pub fn set_expanded_detail(&self, detail: Map<String, Value>) {
        self.entry.lock().expanded_detail = detail;
    }

    /// Cached request for the given dialect
    pub fn request_for(&self, language: Language) -> Option<TimelineRequest> {
        if language.is_eql() {
            self.get_eql_request()
        } else {
            self.get_request()
        }
    }

    /// Cached response for the given dialect
    pub fn response_for(&self, language: Language) -> Option<TimelineResponse> {
        if language.is_eql() {
            self.get_eql_response()
        } else {
            self.get_response()
        }
    }

    /// Record a completed search fetched on `page_name`.
    ///
    /// The write happens under one lock so a reader never sees the page name
    /// of one search next to the response of another.
    pub fn store(&self, page_name: &str, request: TimelineRequest, response: TimelineResponse) {
        let mut entry = self.entry.lock();
        entry.expanded_detail = Map::new();
        entry.page_name = page_name.to_string();
        if request.language.is_eql() {
            entry.eql_request = Some(request);
            entry.eql_response = Some(response);
        } else {
            entry.request = Some(request);
            entry.response = Some(response);
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RowState {
    pub loading_event_ids: HashSet<String>,
    pub deleted_event_ids: HashSet<String>,
}

/// Per-timeline transient row markers (rows being updated or removed)
#[derive(Debug, Clone, Default)]
pub struct RowStateStore {
    rows: Arc<Mutex<HashMap<TimelineId, RowState>>>,
}

impl RowStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag a row whose update is in progress. Row actions call this; `load_page` clears it.
    pub fn mark_loading(&self, id: &TimelineId, event_id: &str) {
        self.rows
            .lock()
            .entry(id.clone())
            .or_default()
            .loading_event_ids
            .insert(event_id.to_string());
    }

    /// Flag a row removed by a row action, hidden until the next page load
    pub fn mark_deleted(&self, id: &TimelineId, event_id: &str) {
        self.rows
            .lock()
            .entry(id.clone())
            .or_default()
            .deleted_event_ids
            .insert(event_id.to_string());
    }

    pub fn get(&self, id: &TimelineId) -> RowState {
        self.rows.lock().get(id).cloned().unwrap_or_default()
    }

    pub fn clear(&self, id: &TimelineId) {
        self.rows.lock().remove(id);
    }
}
