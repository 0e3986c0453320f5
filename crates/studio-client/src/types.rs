use std::fmt;

/// Database engine supported by the studio backend.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// MySQL.
    Mysql,
    /// ClickHouse.
    Clickhouse,
    /// Oracle PL/SQL.
    Plsql,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Engine::Postgres => "postgres",
            Engine::Mysql => "mysql",
            Engine::Clickhouse => "clickhouse",
            Engine::Plsql => "plsql",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Engine {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Engine::Postgres),
            "mysql" => Ok(Engine::Mysql),
            "clickhouse" => Ok(Engine::Clickhouse),
            "plsql" | "oracle" => Ok(Engine::Plsql),
            other => Err(format!("unknown database engine: {other}")),
        }
    }
}

/// Connection parameters sent to the backend at conversation init.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DatabaseCredentials {
    /// Target database engine.
    pub engine: Engine,
    /// Database host.
    pub host: String,
    /// Database port; the backend applies the engine default when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database name.
    pub database: String,
    /// Login user.
    pub username: String,
    /// Login password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether to require TLS for the backend's database connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
}

impl DatabaseCredentials {
    /// Creates credentials with the required fields; optional fields start
    /// empty and can be set through the builder-style methods.
    pub fn new(
        engine: Engine,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            host: host.into(),
            port: None,
            database: database.into(),
            username: username.into(),
            password: None,
            ssl: None,
        }
    }

    /// Sets an explicit port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Requires or disables TLS explicitly.
    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = Some(ssl);
        self
    }
}

/// A conversation opened against one connected database.
///
/// The id is the opaque thread identifier the backend issued; it correlates
/// every later chat turn and SQL execution with the indexed schema.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct Conversation {
    /// Server-issued conversation identifier.
    #[serde(rename = "thread_id")]
    pub id: String,
    /// Plain-text schema description the backend indexed at init.
    pub schema: String,
}

/// Backend reply to a connection test.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct ConnectionStatus {
    /// Machine-readable status, `"ok"` on success.
    #[serde(default)]
    pub status: String,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

/// Message role on the chat wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// End-user message.
    User,
    /// Developer/system-authored message.
    Developer,
    /// Assistant reply.
    Assistant,
}

/// Request body for the conversation chat endpoint.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ChatSendBody {
    /// Always `user` for messages originating here.
    pub role: ChatRole,
    /// Natural-language message text.
    pub content: String,
    /// SQL context the client may attach; never sent from plain chat input.
    pub sql_query: Option<String>,
    /// Result context the client may attach; never sent from plain chat input.
    pub query_results: Option<Vec<serde_json::Value>>,
}

impl ChatSendBody {
    /// Builds the plain user-message body.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sql_query: None,
            query_results: None,
        }
    }
}

/// One message in a non-streaming chat response.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
    /// SQL the backend attached to the reply, when any.
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Result rows, under the older `rows` key.
    #[serde(default)]
    pub rows: Option<Vec<serde_json::Value>>,
    /// Result rows, under the newer `query_results` key.
    #[serde(default)]
    pub query_results: Option<Vec<serde_json::Value>>,
}

impl ChatMessage {
    /// Result rows regardless of which key the backend used.
    pub fn result_rows(&self) -> Option<&[serde_json::Value]> {
        self.rows
            .as_deref()
            .or(self.query_results.as_deref())
    }
}

/// Response of the non-streaming chat endpoint.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ChatResponse {
    /// Conversation this reply belongs to.
    pub chat_id: String,
    /// Replies, newest first; the client reads the first entry.
    pub data: Vec<ChatMessage>,
}

impl ChatResponse {
    /// Text of the first reply, when present.
    pub fn first_content(&self) -> Option<&str> {
        self.data.first().map(|message| message.content.as_str())
    }
}

/// Response of the dedicated SQL execution endpoint.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ExecuteSqlResponse {
    /// Result rows as JSON objects, one per row.
    pub query_results: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_serialize_without_unset_optionals() {
        let credentials =
            DatabaseCredentials::new(Engine::Postgres, "localhost", "chinook", "postgres");
        let value = serde_json::to_value(&credentials).expect("serialize");
        assert_eq!(value.get("engine").and_then(|v| v.as_str()), Some("postgres"));
        assert!(value.get("port").is_none());
        assert!(value.get("password").is_none());
        assert!(value.get("ssl").is_none());
    }

    #[test]
    fn chat_send_body_carries_null_context_fields() {
        let body = ChatSendBody::user("show me all users");
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value.get("role").and_then(|v| v.as_str()), Some("user"));
        assert!(value.get("sql_query").is_some_and(|v| v.is_null()));
        assert!(value.get("query_results").is_some_and(|v| v.is_null()));
    }

    #[test]
    fn result_rows_prefer_rows_over_query_results() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role": "assistant", "content": "done",
                "rows": [{"a": 1}], "query_results": [{"b": 2}]}"#,
        )
        .expect("parse");
        let rows = message.result_rows().expect("rows");
        assert_eq!(rows[0].get("a").and_then(|v| v.as_i64()), Some(1));
    }

    #[test]
    fn engine_parses_common_aliases() {
        assert_eq!("postgresql".parse::<Engine>(), Ok(Engine::Postgres));
        assert_eq!("ClickHouse".parse::<Engine>(), Ok(Engine::Clickhouse));
        assert!("sqlite".parse::<Engine>().is_err());
    }

    #[test]
    fn conversation_deserializes_thread_id() {
        let conversation: Conversation =
            serde_json::from_str(r#"{"thread_id": "t-1", "schema": "users(id)"}"#).expect("parse");
        assert_eq!(conversation.id, "t-1");
    }
}
