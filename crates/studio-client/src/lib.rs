//! Client for the SQL AI Studio backend.
//!
//! Opens a conversation against a connected database, streams assistant
//! replies token by token, pulls generated SQL out of the reply text, and
//! executes statements either through the backend's dedicated endpoint or
//! through a prose-parsing fallback.
//!
//! # Streaming usage
//!
//! ```no_run
//! use studio_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StudioError> {
//! let client = StudioClient::new(StudioConfig::new("http://localhost:8000"))?;
//!
//! let credentials =
//!     DatabaseCredentials::new(Engine::Postgres, "localhost", "chinook", "postgres")
//!         .password("postgres");
//! let conversation = client.init_conversation(&credentials).await?;
//!
//! let mut stream = client
//!     .stream_message(&conversation.id, "Show me all users")
//!     .await?;
//! while let Some(event) = stream.next_event().await {
//!     if let ChatEvent::Token { text, .. } = event {
//!         print!("{text}");
//!     }
//! }
//! let reply = stream.finish().await?;
//! if let Some(sql) = reply.sql() {
//!     println!("generated SQL: {sql}");
//! }
//! # Ok(())
//! # }
//! ```

/// Streaming chat turn: events, reply accumulator, cancellation.
pub mod chat;
/// The backend HTTP client.
pub mod client;
/// Client configuration.
pub mod config;
/// Public error types used by the client API.
pub mod error;
/// SQL execution strategies.
pub mod exec;
/// CSV export of query results.
pub mod export;
/// Common imports for typical usage.
pub mod prelude;
/// Query result construction.
pub mod result;
/// Wire types shared with the backend.
pub mod types;

mod decode;

pub use chat::{AbortHandle, AssistantReply, ChatEvent, ChatStream};
pub use client::StudioClient;
pub use config::StudioConfig;
pub use error::{ChatFailure, StudioError};
pub use exec::{AssistantPrompt, ExecutionOutcome, ExecutionStrategy, SqlEndpoint};
pub use export::{to_csv_string, write_csv};
pub use result::QueryResult;
pub use types::{
    ChatMessage, ChatResponse, ChatRole, ChatSendBody, ConnectionStatus, Conversation,
    DatabaseCredentials, Engine, ExecuteSqlResponse,
};
