// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Logging setup and helpers for keeping query contents out of logs.

use tracing_subscriber::EnvFilter;

/// Longest filter prefix written to logs
const FILTER_LOG_PREFIX: usize = 32;

/// Install the global subscriber, honouring `RUST_LOG` and defaulting to `info`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Shorten a filter expression for logging: "host.name: web-…(57 chars)"
pub fn redact_filter(filter: &str) -> String {
    if filter.is_empty() {
        return "<empty>".to_string();
    }

    let total = filter.chars().count();
    if total <= FILTER_LOG_PREFIX {
        return filter.to_string();
    }

    let prefix: String = filter.chars().take(FILTER_LOG_PREFIX).collect();
    format!("{}…({} chars)", prefix, total)
}
