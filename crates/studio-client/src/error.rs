/// Terminal failure for a streaming chat turn.
///
/// Tokens delivered before the failure stay delivered; consumers append the
/// failure to the partial reply instead of replacing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatFailure {
    /// The backend emitted an `error` event mid-stream.
    #[error("backend error: {message}")]
    Backend { message: String },
    /// The transport failed while the stream was being read.
    #[error("stream transport failure: {message}")]
    Transport { message: String },
    /// The turn was cancelled through its abort handle.
    #[error("chat turn cancelled")]
    Cancelled,
}

/// Top-level error type for the studio client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudioError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Request dispatch or body read failed before an HTTP status arrived.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-2xx status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// The backend answered 2xx but with an unusable response shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A streaming chat turn ended with a terminal failure.
    #[error(transparent)]
    Chat(ChatFailure),
}

impl StudioError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Creates an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<ChatFailure> for StudioError {
    fn from(value: ChatFailure) -> Self {
        StudioError::Chat(value)
    }
}

/// Extracts the human-readable message from a backend error envelope.
///
/// Preference order: `detail.error`, then a string `detail`, then `error`.
/// Returns `None` when the body is not JSON or carries none of the fields,
/// in which case the raw body text is the message.
pub(crate) fn envelope_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(message) = value
        .get("detail")
        .and_then(|detail| detail.get("error"))
        .and_then(|v| v.as_str())
    {
        return Some(message.to_string());
    }
    if let Some(message) = value.get("detail").and_then(|v| v.as_str()) {
        return Some(message.to_string());
    }
    value
        .get("error")
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
}

/// Turns a non-2xx response into a [`StudioError::Api`], consuming the body.
pub(crate) async fn api_error_from_response(response: reqwest::Response) -> StudioError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    let message = envelope_message(&body).unwrap_or(body);
    StudioError::api(status, message)
}
