use futures::TryStreamExt as _;
use tracing::debug;

use crate::chat::{ChatStream, ChunkStream};
use crate::config::StudioConfig;
use crate::error::{ChatFailure, StudioError, api_error_from_response};
use crate::types::{
    ChatResponse, ChatSendBody, ConnectionStatus, Conversation, DatabaseCredentials,
    ExecuteSqlResponse,
};

/// HTTP client for the SQL AI Studio backend.
#[derive(Clone)]
pub struct StudioClient {
    http: reqwest::Client,
    config: StudioConfig,
}

impl StudioClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: StudioConfig) -> Result<Self, StudioError> {
        if config.base_url.trim().is_empty() {
            return Err(StudioError::Config("base_url must not be empty".into()));
        }
        if config.stream_buffer_capacity == 0 {
            return Err(StudioError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StudioError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Creates a client using `STUDIO_BASE_URL`.
    pub fn from_env() -> Result<Self, StudioError> {
        Self::new(StudioConfig::from_env()?)
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Asks the backend to connect to its bundled test database.
    pub async fn test_connection(&self) -> Result<ConnectionStatus, StudioError> {
        let response = self
            .http
            .post(self.config.init_url())
            .query(&[("use_test_db", "true")])
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| StudioError::transport(format!("connection test failed: {e}")))?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| StudioError::protocol(format!("invalid connection test response: {e}")))
    }

    /// Opens a conversation against the backend's bundled test database.
    pub async fn init_test_conversation(&self) -> Result<Conversation, StudioError> {
        let response = self
            .http
            .post(self.config.init_url())
            .query(&[("use_test_db", "true")])
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| StudioError::transport(format!("conversation init failed: {e}")))?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| StudioError::protocol(format!("invalid init response: {e}")))
    }

    /// Opens a conversation: the backend connects to the database, indexes
    /// its schema, and issues the conversation id for all later turns.
    pub async fn init_conversation(
        &self,
        credentials: &DatabaseCredentials,
    ) -> Result<Conversation, StudioError> {
        debug!(engine = %credentials.engine, host = %credentials.host, database = %credentials.database, "initializing conversation");
        let response = self
            .http
            .post(self.config.init_url())
            .json(credentials)
            .send()
            .await
            .map_err(|e| StudioError::transport(format!("conversation init failed: {e}")))?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| StudioError::protocol(format!("invalid init response: {e}")))
    }

    /// Sends a chat message and waits for the complete reply.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<ChatResponse, StudioError> {
        let response = self
            .http
            .post(self.config.chat_url(conversation_id))
            .json(&ChatSendBody::user(content))
            .send()
            .await
            .map_err(|e| StudioError::transport(format!("chat request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| StudioError::protocol(format!("invalid chat response: {e}")))?;
        if parsed.data.is_empty() {
            return Err(StudioError::protocol("chat response carried no messages"));
        }
        Ok(parsed)
    }

    /// Sends a chat message and returns a token stream for the reply.
    ///
    /// Only one stream should be in flight per conversation; wait for the
    /// terminal event before sending the next turn.
    pub async fn stream_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<ChatStream, StudioError> {
        debug!(conversation_id = %conversation_id, "starting streaming chat turn");
        let response = self
            .http
            .post(self.config.chat_url(conversation_id))
            .query(&[("stream", "true")])
            .json(&ChatSendBody::user(content))
            .send()
            .await
            .map_err(|e| StudioError::transport(format!("chat request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }

        let chunks: ChunkStream = Box::pin(response.bytes_stream().map_err(|e| {
            ChatFailure::Transport {
                message: format!("chat stream read failed: {e}"),
            }
        }));
        Ok(ChatStream::spawn(
            conversation_id.to_string(),
            chunks,
            self.config.stream_buffer_capacity,
        ))
    }

    /// Executes SQL through the dedicated endpoint, returning raw JSON rows.
    pub async fn execute_sql(
        &self,
        conversation_id: &str,
        sql: &str,
    ) -> Result<Vec<serde_json::Value>, StudioError> {
        let response = self
            .http
            .post(self.config.sql_url(conversation_id))
            .json(&serde_json::json!({ "query": sql }))
            .send()
            .await
            .map_err(|e| StudioError::transport(format!("sql execution failed: {e}")))?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        let parsed: ExecuteSqlResponse = response
            .json()
            .await
            .map_err(|e| StudioError::protocol(format!("invalid sql execution response: {e}")))?;
        Ok(parsed.query_results)
    }
}
