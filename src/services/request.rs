// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Turning presentation inputs into timeline requests.

use crate::models::timeline::{
    EqlOptions, Pagination, QueryInputs, SortField, TimeRange, TimelineRequest,
};
use serde_json::{Map, Value};

/// Outcome of [`derive_request`]
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub request: DerivedRequest,
    /// Active page after derivation, 0 when the search-relevant subset changed
    pub active_page: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DerivedRequest {
    /// The previous request still describes the inputs
    Unchanged,
    Changed(TimelineRequest),
}

/// Parameters whose change resets pagination
#[derive(Debug, PartialEq)]
struct SearchParameters<'a> {
    default_index: &'a [String],
    filter_query: &'a str,
    query_size: usize,
    sort: &'a [SortField],
    timerange: &'a TimeRange,
    runtime_mappings: &'a Map<String, Value>,
    eql_options: Option<&'a EqlOptions>,
}

impl<'a> SearchParameters<'a> {
    fn of_request(request: &'a TimelineRequest) -> Self {
        Self {
            default_index: &request.default_index,
            filter_query: &request.filter_query,
            query_size: request.pagination.query_size,
            sort: &request.sort,
            timerange: &request.timerange,
            runtime_mappings: &request.runtime_mappings,
            eql_options: request.eql_options.as_ref(),
        }
    }

    fn of_inputs(inputs: &'a QueryInputs, timerange: &'a TimeRange) -> Self {
        Self {
            default_index: &inputs.index_names,
            filter_query: &inputs.filter_query,
            query_size: inputs.limit,
            sort: &inputs.sort,
            timerange,
            runtime_mappings: &inputs.runtime_mappings,
            eql_options: inputs.eql_options.as_ref(),
        }
    }
}

/// Build the request described by `inputs`, relative to `previous`.
///
/// The active page survives only if the search-relevant subset is unchanged.
/// Requested fields only ever grow so columns fetched earlier stay available.
pub fn derive_request(
    inputs: &QueryInputs,
    previous: Option<&TimelineRequest>,
    active_page: usize,
) -> Derivation {
    if inputs.index_names.is_empty() {
        return Derivation {
            request: DerivedRequest::Unchanged,
            active_page,
        };
    }

    let timerange = TimeRange::new(inputs.start_date, inputs.end_date);
    let current = SearchParameters::of_inputs(inputs, &timerange);
    let same_search = match previous {
        Some(prev) => SearchParameters::of_request(prev) == current,
        None => {
            let default_sort = SortField::default_timeline();
            let default_timerange = TimeRange::default();
            let empty_mappings = Map::new();
            let initial = SearchParameters {
                default_index: &[],
                filter_query: "",
                query_size: 0,
                sort: &default_sort,
                timerange: &default_timerange,
                runtime_mappings: &empty_mappings,
                eql_options: None,
            };
            initial == current
        }
    };
    let active_page = if same_search { active_page } else { 0 };

    let candidate = TimelineRequest {
        default_index: inputs.index_names.clone(),
        field_requested: merge_fields(
            previous.map(|p| p.field_requested.as_slice()),
            &inputs.fields,
        ),
        filter_query: inputs.filter_query.clone(),
        pagination: Pagination {
            active_page,
            query_size: inputs.limit,
        },
        language: inputs.language,
        runtime_mappings: inputs.runtime_mappings.clone(),
        sort: inputs.sort.clone(),
        timerange,
        eql_options: inputs.eql_options.clone(),
    };

    let request = match previous {
        Some(prev) if *prev == candidate => DerivedRequest::Unchanged,
        _ => DerivedRequest::Changed(candidate),
    };

    Derivation {
        request,
        active_page,
    }
}

/// Append every requested field not already present, keeping first-seen order
pub fn merge_fields(previous: Option<&[String]>, requested: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for field in previous.unwrap_or_default().iter().chain(requested) {
        if !merged.contains(field) {
            merged.push(field.clone());
        }
    }
    merged
}
