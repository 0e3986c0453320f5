use std::io::Write as _;

use studio_client::export::write_csv;
use studio_client::prelude::*;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::debug;

enum Flow {
    Continue,
    Quit,
}

/// Runs the interactive loop until `:quit` or end of input.
pub async fn run(
    client: &StudioClient,
    conversation: &Conversation,
    strategy: &dyn ExecutionStrategy,
) -> anyhow::Result<()> {
    println!(
        "Connected (conversation {}). Ask about your database in plain language.",
        conversation.id
    );
    print_help();

    let mut sql_buffer: Option<String> = None;
    let mut last_result: Option<QueryResult> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("studio> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix(':') {
            let flow = handle_command(
                command,
                client,
                conversation,
                strategy,
                &mut sql_buffer,
                &mut last_result,
            )
            .await?;
            match flow {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        chat_turn(client, conversation, input, &mut sql_buffer).await;
    }
    Ok(())
}

fn print_help() {
    println!("Commands: :sql  :edit <sql>  :run  :export <path>  :schema  :help  :quit");
}

async fn handle_command(
    command: &str,
    client: &StudioClient,
    conversation: &Conversation,
    strategy: &dyn ExecutionStrategy,
    sql_buffer: &mut Option<String>,
    last_result: &mut Option<QueryResult>,
) -> anyhow::Result<Flow> {
    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "q" => return Ok(Flow::Quit),
        "help" => print_help(),
        "schema" => println!("{}", conversation.schema),
        "sql" => match sql_buffer {
            Some(sql) => println!("{sql}"),
            None => println!("(sql buffer is empty)"),
        },
        "edit" => {
            if argument.is_empty() {
                println!("usage: :edit <sql>");
            } else {
                *sql_buffer = Some(argument.to_string());
            }
        }
        "run" => {
            let Some(sql) = sql_buffer.as_deref() else {
                println!("(sql buffer is empty; ask the assistant or :edit one)");
                return Ok(Flow::Continue);
            };
            match strategy.execute(client, &conversation.id, sql).await {
                Ok(ExecutionOutcome::Rows(result)) => {
                    render_table(&result);
                    *last_result = Some(result);
                }
                Ok(ExecutionOutcome::Message(text)) => println!("{text}"),
                Err(err) => eprintln!("execution failed: {err}"),
            }
        }
        "export" => {
            if argument.is_empty() {
                println!("usage: :export <path>");
                return Ok(Flow::Continue);
            }
            let Some(result) = last_result.as_ref() else {
                println!("(no result to export; :run a query first)");
                return Ok(Flow::Continue);
            };
            match std::fs::File::create(argument) {
                Ok(file) => match write_csv(result, file) {
                    Ok(()) => println!("wrote {} rows to {argument}", result.row_count),
                    Err(err) => eprintln!("export failed: {err}"),
                },
                Err(err) => eprintln!("export failed: {err}"),
            }
        }
        other => println!("unknown command :{other} (:help lists commands)"),
    }
    Ok(Flow::Continue)
}

/// One streamed chat turn: print tokens as they arrive, then pick up any
/// generated SQL. A mid-stream failure leaves the partial text on screen and
/// appends the failure after it.
async fn chat_turn(
    client: &StudioClient,
    conversation: &Conversation,
    input: &str,
    sql_buffer: &mut Option<String>,
) {
    let mut stream = match client.stream_message(&conversation.id, input).await {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("chat failed: {err}");
            return;
        }
    };

    while let Some(event) = stream.next_event().await {
        match event {
            ChatEvent::Token { text, .. } => {
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            ChatEvent::Internal { text, .. } => debug!("backend: {text}"),
            ChatEvent::Completed { .. } => break,
            ChatEvent::Failed { error, .. } => {
                println!();
                eprintln!("chat failed: {error}");
                return;
            }
        }
    }
    println!();

    match stream.finish().await {
        Ok(reply) => {
            if let Some(sql) = reply.sql() {
                println!("(sql buffer updated; :sql to view, :run to execute)");
                *sql_buffer = Some(sql);
            }
        }
        Err(err) => eprintln!("chat failed: {err}"),
    }
}

fn render_table(result: &QueryResult) {
    if result.columns.is_empty() {
        println!("(empty result, {} ms)", result.execution_time_ms);
        return;
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(String::len).collect();
    for row in &cells {
        for (idx, cell) in row.iter().enumerate() {
            if idx < widths.len() {
                widths[idx] = widths[idx].max(cell.len());
            }
        }
    }

    print_row(&result.columns.iter().map(String::as_str).collect::<Vec<_>>(), &widths);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    print_row(&separator.iter().map(String::as_str).collect::<Vec<_>>(), &widths);
    for row in &cells {
        print_row(&row.iter().map(String::as_str).collect::<Vec<_>>(), &widths);
    }
    println!(
        "{} rows ({} ms)",
        result.row_count, result.execution_time_ms
    );
}

fn print_row(cells: &[&str], widths: &[usize]) {
    let mut line = String::new();
    for (idx, &width) in widths.iter().enumerate() {
        let cell = cells.get(idx).copied().unwrap_or("");
        line.push_str(&format!("{cell:<width$}"));
        if idx + 1 < widths.len() {
            line.push_str("  ");
        }
    }
    println!("{}", line.trim_end());
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
