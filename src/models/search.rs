// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::timeline::{Language, PageInfo, TimelineEdge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Search strategy the search service routes a timeline request to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    Timeline,
    TimelineEql,
}

impl SearchStrategy {
    pub fn for_language(language: Language) -> Self {
        if language.is_eql() {
            SearchStrategy::TimelineEql
        } else {
            SearchStrategy::Timeline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Timeline => "timelineSearchStrategy",
            SearchStrategy::TimelineEql => "timelineEqlSearchStrategy",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debug DSL reported alongside a search result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectDsl {
    #[serde(default)]
    pub dsl: Vec<String>,
}

/// Final result of a timeline search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSearchPayload {
    #[serde(default)]
    pub edges: Vec<TimelineEdge>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub inspect: Option<InspectDsl>,
    #[serde(default)]
    pub raw_response: Value,
}

/// One item of a search subscription
#[derive(Debug, Clone, PartialEq)]
pub enum SearchNotification {
    /// The search is still running on the server
    Running,
    /// Terminal notification carrying the result
    Complete(TimelineSearchPayload),
}

impl SearchNotification {
    pub fn is_running(&self) -> bool {
        matches!(self, SearchNotification::Running)
    }
}

/// Envelope returned by the async search endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncSearchEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(flatten)]
    pub payload: TimelineSearchPayload,
}

impl AsyncSearchEnvelope {
    pub fn into_notification(self) -> SearchNotification {
        if self.is_running || self.is_partial {
            SearchNotification::Running
        } else {
            SearchNotification::Complete(self.payload)
        }
    }
}
