use std::time::Duration;

use crate::error::StudioError;

/// Configuration for a [`StudioClient`](crate::client::StudioClient).
#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// Base URL of the studio backend, without the `/v1` prefix.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Default HTTP timeout for requests, including streaming reads.
    pub timeout: Duration,
    /// Bounded event buffer size used between the stream task and the
    /// consumer of a [`ChatStream`](crate::chat::ChatStream).
    pub stream_buffer_capacity: usize,
}

impl StudioConfig {
    /// Creates a config with sensible defaults and a provided base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(120),
            stream_buffer_capacity: 128,
        }
    }

    /// Builds a config from `STUDIO_BASE_URL`.
    pub fn from_env() -> Result<Self, StudioError> {
        let base_url = std::env::var("STUDIO_BASE_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(StudioError::Config(
                "missing STUDIO_BASE_URL for the studio backend".into(),
            ));
        }
        Ok(Self::new(base_url))
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the stream event buffer size.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub(crate) fn init_url(&self) -> String {
        format!("{}/v1/conversation/init", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn chat_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/v1/conversation/{conversation_id}",
            self.base_url.trim_end_matches('/')
        )
    }

    pub(crate) fn sql_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/v1/conversation/{conversation_id}/sql",
            self.base_url.trim_end_matches('/')
        )
    }
}
