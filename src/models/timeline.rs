// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Request, response and input types for timeline event searches.
//!
//! Requests are plain values: two requests are the same query exactly when
//! they compare equal, which is what the coordinator relies on to skip
//! redundant searches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of the distinguished timeline whose results are page-cached.
pub const ACTIVE_TIMELINE_ID: &str = "timeline-1";

/// Identities whose rows carry transient loading/deleted markers.
const ROW_STATE_TIMELINE_IDS: [&str; 2] = ["alerts-page", "alerts-rules-details-page"];

/// Bucket interval sent with every time range
pub const TIMERANGE_INTERVAL: &str = "12h";

/// Query identity distinguishing independent timeline consumers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineId(String);

impl TimelineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The distinguished timeline, the only one eligible for page-scoped caching
    pub fn active() -> Self {
        Self::new(ACTIVE_TIMELINE_ID)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_active(&self) -> bool {
        self.0 == ACTIVE_TIMELINE_ID
    }

    /// Check if this identity keeps per-row loading/deleted markers
    pub fn tracks_row_state(&self) -> bool {
        ROW_STATE_TIMELINE_IDS.contains(&self.0.as_str())
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Kuery,
    Lucene,
    Eql,
}

impl Language {
    pub fn is_eql(&self) -> bool {
        matches!(self, Language::Eql)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Kuery => write!(f, "kuery"),
            Language::Lucene => write!(f, "lucene"),
            Language::Eql => write!(f, "eql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl SortField {
    /// Newest events first, the order a timeline opens with
    pub fn default_timeline() -> Vec<SortField> {
        vec![SortField {
            field: "@timestamp".to_string(),
            direction: SortDirection::Desc,
            field_type: Some("date".to_string()),
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub interval: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            interval: TIMERANGE_INTERVAL.to_string(),
            from,
            to,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Options that only exist for EQL requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqlOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_category_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreaker_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub active_page: usize,
    pub query_size: usize,
}

/// A timeline events query as sent to the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRequest {
    pub default_index: Vec<String>,
    pub field_requested: Vec<String>,
    pub filter_query: String,
    pub pagination: Pagination,
    pub language: Language,
    #[serde(default)]
    pub runtime_mappings: Map<String, Value>,
    pub sort: Vec<SortField>,
    pub timerange: TimeRange,
    #[serde(flatten)]
    pub eql_options: Option<EqlOptions>,
}

impl TimelineRequest {
    pub fn active_page(&self) -> usize {
        self.pagination.active_page
    }
}

/// Declarative query parameters pushed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInputs {
    pub index_names: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filter_query: String,
    #[serde(default)]
    pub runtime_mappings: Map<String, Value>,
    #[serde(default = "SortField::default_timeline")]
    pub sort: Vec<SortField>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub eql_options: Option<EqlOptions>,
    /// Suppress searches entirely while set
    #[serde(default)]
    pub skip: bool,
    /// Routing-derived name of the view currently rendered
    pub page_name: String,
}

fn default_limit() -> usize {
    25
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineNonEcsData {
    pub field: String,
    #[serde(default)]
    pub value: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(default)]
    pub data: Vec<TimelineNonEcsData>,
    #[serde(default)]
    pub ecs: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorType {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreaker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEdge {
    pub node: TimelineItem,
    pub cursor: CursorType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub active_page: usize,
    pub query_size: usize,
}

/// Debug query and raw response log shown by the inspect panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectLog {
    pub dsl: Vec<String>,
    pub response: Vec<String>,
}

/// Accumulated result of the latest completed search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub id: TimelineId,
    pub inspect: InspectLog,
    pub events: Vec<TimelineEdge>,
    pub page_info: PageInfo,
    pub total_count: i64,
    /// Milliseconds since epoch of the last successful refresh, 0 if never
    pub refreshed_at: i64,
}

impl TimelineResponse {
    /// Sentinel shown before any search completed or after filters were cleared
    pub fn empty(id: TimelineId) -> Self {
        Self {
            id,
            inspect: InspectLog::default(),
            events: Vec::new(),
            page_info: PageInfo::default(),
            total_count: -1,
            refreshed_at: 0,
        }
    }

    pub fn is_empty_sentinel(&self) -> bool {
        self.total_count == -1 && self.events.is_empty() && self.page_info.active_page == 0
    }
}

/// Progress of the coordinator's current search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadingState {
    #[default]
    Loaded,
    Loading,
    LoadingMore,
}

/// Inputs to the loading state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingEvent {
    /// A search was dispatched for the given page
    SearchStarted { page: usize },
    /// The search completed, failed, was cancelled, or a cached response was restored
    Settled,
}

impl LoadingState {
    pub fn on(self, event: LoadingEvent) -> Self {
        match event {
            LoadingEvent::SearchStarted { page: 0 } => LoadingState::Loading,
            LoadingEvent::SearchStarted { .. } => LoadingState::LoadingMore,
            LoadingEvent::Settled => LoadingState::Loaded,
        }
    }

    pub fn is_loading(&self) -> bool {
        !matches!(self, LoadingState::Loaded)
    }
}

/// What the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub loading: LoadingState,
    pub response: TimelineResponse,
}
