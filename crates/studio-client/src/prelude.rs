//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used types so
//! application code needs fewer import lines.
pub use crate::{
    AbortHandle, AssistantPrompt, AssistantReply, ChatEvent, ChatFailure, ChatStream,
    Conversation, DatabaseCredentials, Engine, ExecutionOutcome, ExecutionStrategy, QueryResult,
    SqlEndpoint, StudioClient, StudioConfig, StudioError,
};
