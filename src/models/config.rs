// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::ConfigError;
use crate::models::timeline::{TimelineId, ACTIVE_TIMELINE_ID};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Agent configuration, read from command line flags or environment variables
#[derive(Debug, Clone, Parser)]
#[command(name = "timeline-agent", version = env!("TIMELINE_VERSION"))]
pub struct AgentConfig {
    /// Base URL of the search service
    #[arg(long, env = "SEARCH_SERVICE_URL")]
    pub search_service_url: String,

    /// Address the HTTP API binds to
    #[arg(long, env = "TIMELINE_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    /// Identity of the timeline served by this agent
    #[arg(long, env = "TIMELINE_ID", default_value = ACTIVE_TIMELINE_ID)]
    pub timeline_id: String,

    /// Delay between polls of a still-running search
    #[arg(long, env = "SEARCH_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Timeout for a single round-trip to the search service
    #[arg(long, env = "SEARCH_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl AgentConfig {
    /// Check values clap cannot validate on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search_url()?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "poll_interval_ms",
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "request_timeout_secs",
            });
        }
        Ok(())
    }

    /// Parse the search service URL, accepting a bare `host:port`
    pub fn search_url(&self) -> Result<Url, ConfigError> {
        let raw = if self.search_service_url.starts_with("http://")
            || self.search_service_url.starts_with("https://")
        {
            self.search_service_url.clone()
        } else {
            format!("http://{}", self.search_service_url)
        };

        Url::parse(&raw).map_err(|e| ConfigError::InvalidSearchUrl {
            url: self.search_service_url.clone(),
            reason: e.to_string(),
        })
    }

    pub fn timeline_id(&self) -> TimelineId {
        TimelineId::new(self.timeline_id.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AgentConfig {
        let mut argv = vec!["timeline-agent"];
        argv.extend_from_slice(args);
        AgentConfig::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--search-service-url", "http://127.0.0.1:5601"]);
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert!(config.timeline_id().is_active());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_url_without_scheme() {
        let config = parse(&["--search-service-url", "kibana:5601"]);
        assert_eq!(config.search_url().unwrap().as_str(), "http://kibana:5601/");
    }

    #[test]
    fn test_search_url_keeps_https() {
        let config = parse(&["--search-service-url", "https://kibana.example.com"]);
        assert_eq!(config.search_url().unwrap().scheme(), "https");
    }

    #[test]
    fn test_invalid_search_url() {
        let config = parse(&["--search-service-url", "http://exa mple.com"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSearchUrl { .. })
        ));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = parse(&[
            "--search-service-url",
            "http://127.0.0.1:5601",
            "--poll-interval-ms",
            "0",
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "poll_interval_ms"
            })
        ));
    }

    #[test]
    fn test_custom_timeline_id() {
        let config = parse(&[
            "--search-service-url",
            "http://127.0.0.1:5601",
            "--timeline-id",
            "alerts-page",
        ]);
        assert!(!config.timeline_id().is_active());
        assert!(config.timeline_id().tracks_row_state());
    }
}
