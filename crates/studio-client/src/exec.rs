use std::time::Instant;

use tracing::debug;

use crate::client::StudioClient;
use crate::error::StudioError;
use crate::result::QueryResult;

/// Outcome of executing a SQL statement.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionOutcome {
    /// The statement produced a recognizable result set.
    Rows(QueryResult),
    /// The statement produced prose only (an affected-row acknowledgement,
    /// or a reply the table extractor could not recognize). The caller
    /// surfaces the raw text.
    Message(String),
}

/// How a SQL statement reaches the connected database.
///
/// The backend family disagrees on this: some deployments expose a dedicated
/// execution endpoint, others only answer through chat. Both paths live
/// behind this trait so callers pick one at configuration time.
#[async_trait::async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Executes `sql` within `conversation_id`'s database session.
    async fn execute(
        &self,
        client: &StudioClient,
        conversation_id: &str,
        sql: &str,
    ) -> Result<ExecutionOutcome, StudioError>;
}

/// Executes through the dedicated `/sql` endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlEndpoint;

#[async_trait::async_trait]
impl ExecutionStrategy for SqlEndpoint {
    fn name(&self) -> &'static str {
        "sql-endpoint"
    }

    async fn execute(
        &self,
        client: &StudioClient,
        conversation_id: &str,
        sql: &str,
    ) -> Result<ExecutionOutcome, StudioError> {
        let started = Instant::now();
        let rows = client.execute_sql(conversation_id, sql).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(conversation_id = %conversation_id, rows = rows.len(), elapsed_ms, "sql endpoint execution");
        let result = QueryResult::from_json_rows(&rows, elapsed_ms)?;
        Ok(ExecutionOutcome::Rows(result))
    }
}

/// Executes by asking the assistant to run the statement and reply with a
/// Markdown table, then parsing the table back out of the prose.
#[derive(Clone, Copy, Debug)]
pub struct AssistantPrompt {
    /// Maximum number of rows the assistant is asked to return.
    pub row_limit: usize,
}

impl Default for AssistantPrompt {
    fn default() -> Self {
        Self { row_limit: 200 }
    }
}

impl AssistantPrompt {
    fn prompt(&self, sql: &str) -> String {
        format!(
            "Execute the following SQL query against the connected database.\n\
             If it returns rows, reply with a Markdown table of the first {} rows.\n\
             If it does not return rows, reply with the number of affected rows.\n\
             \n```sql\n{}\n```",
            self.row_limit,
            sql.trim()
        )
    }
}

#[async_trait::async_trait]
impl ExecutionStrategy for AssistantPrompt {
    fn name(&self) -> &'static str {
        "assistant-prompt"
    }

    async fn execute(
        &self,
        client: &StudioClient,
        conversation_id: &str,
        sql: &str,
    ) -> Result<ExecutionOutcome, StudioError> {
        let started = Instant::now();
        let response = client
            .send_message(conversation_id, &self.prompt(sql))
            .await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let content = response
            .first_content()
            .ok_or_else(|| StudioError::protocol("chat response carried no messages"))?;

        match studio_extract::extract_table(content) {
            Some(table) => {
                debug!(conversation_id = %conversation_id, rows = table.rows.len(), elapsed_ms, "assistant prompt execution recovered a table");
                Ok(ExecutionOutcome::Rows(QueryResult::from_table(
                    table, elapsed_ms,
                )))
            }
            None => Ok(ExecutionOutcome::Message(content.to_string())),
        }
    }
}
