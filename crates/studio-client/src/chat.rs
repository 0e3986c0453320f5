use std::pin::Pin;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::decode::{NdjsonDecoder, WireEvent};
use crate::error::{ChatFailure, StudioError};

pub(crate) type ChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ChatFailure>> + Send + 'static>>;

/// Normalized events produced by one streaming chat turn.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// Incremental assistant text fragment, in stream order.
    Token {
        turn_id: uuid::Uuid,
        seq: u64,
        text: String,
    },
    /// Backend-side diagnostic message, not part of the visible reply.
    Internal { turn_id: uuid::Uuid, text: String },
    /// Terminal success event with the frozen reply.
    Completed {
        turn_id: uuid::Uuid,
        reply: AssistantReply,
    },
    /// Terminal failure event. Tokens already delivered stay delivered.
    Failed {
        turn_id: uuid::Uuid,
        error: ChatFailure,
    },
}

/// The assistant reply accumulated over a completed stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantReply {
    /// Full reply text, all tokens concatenated in order.
    pub content: String,
}

impl AssistantReply {
    /// Extracts an embedded SQL statement from the reply, when present.
    ///
    /// This is the post-stream step that decides whether the SQL editor pane
    /// gets new content; `None` means leave it untouched.
    pub fn sql(&self) -> Option<String> {
        studio_extract::extract_sql(&self.content)
    }

    /// Recovers a Markdown result table from the reply, when present.
    pub fn table(&self) -> Option<studio_extract::ParsedTable> {
        studio_extract::extract_table(&self.content)
    }
}

/// Handle used to request cancellation of a streaming chat turn.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and becomes visible as a terminal
    /// `ChatEvent::Failed` with `ChatFailure::Cancelled`; the transport is
    /// released either way.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Streaming handle returned by
/// [`StudioClient::stream_message`](crate::client::StudioClient::stream_message).
///
/// Use `next_event()` to consume events as they arrive and `finish()` to
/// obtain the frozen reply after the terminal event.
#[derive(Debug)]
pub struct ChatStream {
    turn_id: uuid::Uuid,
    conversation_id: String,
    rx: mpsc::Receiver<ChatEvent>,
    final_rx: oneshot::Receiver<Result<AssistantReply, StudioError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl ChatStream {
    /// Spawns the decode task over `chunks` and returns the consumer handle.
    pub(crate) fn spawn(conversation_id: String, chunks: ChunkStream, capacity: usize) -> Self {
        let turn_id = uuid::Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);

        tokio::spawn(chat_task(
            turn_id,
            conversation_id.clone(),
            chunks,
            tx,
            final_tx,
            abort_rx,
        ));

        Self {
            turn_id,
            conversation_id,
            rx,
            final_rx,
            abort_handle: AbortHandle { tx: abort_tx },
            saw_terminal: false,
        }
    }

    /// Returns the locally generated id of this chat turn.
    pub fn turn_id(&self) -> uuid::Uuid {
        self.turn_id
    }

    /// Returns the conversation this turn belongs to.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns a handle that can cancel the turn.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next stream event.
    ///
    /// Returns `None` after the stream channel is closed.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        let event = self.rx.recv().await;
        if let Some(ChatEvent::Completed { .. } | ChatEvent::Failed { .. }) = &event {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal result.
    ///
    /// Safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<AssistantReply, StudioError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(ChatEvent::Completed { .. } | ChatEvent::Failed { .. }) => {
                    self.saw_terminal = true;
                }
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(StudioError::protocol(format!(
                "chat task ended without a terminal result (conversation={})",
                self.conversation_id
            ))),
        }
    }
}

async fn chat_task(
    turn_id: uuid::Uuid,
    conversation_id: String,
    mut chunks: ChunkStream,
    tx: mpsc::Sender<ChatEvent>,
    final_tx: oneshot::Sender<Result<AssistantReply, StudioError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let mut decoder = NdjsonDecoder::default();
    // Accumulator owned by this task alone; frozen into the terminal event.
    let mut content = String::new();
    let mut seq = 0_u64;
    let mut abort_open = true;

    loop {
        tokio::select! {
            changed = abort_rx.changed(), if abort_open => {
                match changed {
                    Ok(_) if *abort_rx.borrow() => {
                        let failure = ChatFailure::Cancelled;
                        let _ = send_event(&tx, ChatEvent::Failed { turn_id, error: failure.clone() }).await;
                        let _ = final_tx.send(Err(failure.into()));
                        return;
                    }
                    Ok(_) => {}
                    // All abort handles dropped: no cancellation can arrive.
                    Err(_) => abort_open = false,
                }
            }
            next = chunks.next() => {
                match next {
                    Some(Ok(chunk)) => {
                        for line in decoder.push_chunk(&chunk) {
                            match NdjsonDecoder::decode_line(&line) {
                                Some(WireEvent::Content(text)) => {
                                    debug!(turn_id = %turn_id, conversation_id = %conversation_id, seq, "content token");
                                    content.push_str(&text);
                                    let sent = send_event(&tx, ChatEvent::Token { turn_id, seq, text }).await;
                                    seq = seq.saturating_add(1);
                                    if !sent {
                                        let _ = final_tx.send(Err(StudioError::protocol(
                                            "chat stream receiver dropped during output",
                                        )));
                                        return;
                                    }
                                }
                                Some(WireEvent::Internal(text)) => {
                                    debug!(turn_id = %turn_id, conversation_id = %conversation_id, "internal event: {text}");
                                    if !send_event(&tx, ChatEvent::Internal { turn_id, text }).await {
                                        let _ = final_tx.send(Err(StudioError::protocol(
                                            "chat stream receiver dropped during output",
                                        )));
                                        return;
                                    }
                                }
                                Some(WireEvent::Error(message)) => {
                                    let failure = ChatFailure::Backend { message };
                                    let _ = send_event(&tx, ChatEvent::Failed { turn_id, error: failure.clone() }).await;
                                    let _ = final_tx.send(Err(failure.into()));
                                    return;
                                }
                                // Unknown kind or malformed line: no event.
                                None => {}
                            }
                        }
                    }
                    Some(Err(failure)) => {
                        let _ = send_event(&tx, ChatEvent::Failed { turn_id, error: failure.clone() }).await;
                        let _ = final_tx.send(Err(failure.into()));
                        return;
                    }
                    None => {
                        // Clean end of stream; any trailing partial line in the
                        // decoder is discarded by contract.
                        let reply = AssistantReply { content };
                        let sent = send_event(&tx, ChatEvent::Completed { turn_id, reply: reply.clone() }).await;
                        let _ = final_tx.send(if sent {
                            Ok(reply)
                        } else {
                            Err(StudioError::protocol(
                                "chat stream receiver dropped before completion",
                            ))
                        });
                        return;
                    }
                }
            }
        }
    }
}

async fn send_event(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
    tx.send(event).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunk_stream(chunks: Vec<Result<&'static [u8], ChatFailure>>) -> ChunkStream {
        Box::pin(stream::iter(chunks.into_iter().map(|chunk| {
            chunk.map(bytes::Bytes::from_static)
        })))
    }

    fn spawn_with(chunks: Vec<Result<&'static [u8], ChatFailure>>) -> ChatStream {
        ChatStream::spawn("conv-1".into(), chunk_stream(chunks), 16)
    }

    async fn collect_events(stream: &mut ChatStream) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            let terminal = matches!(
                event,
                ChatEvent::Completed { .. } | ChatEvent::Failed { .. }
            );
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn tokens_arrive_in_order_and_finish_returns_the_reply() {
        let mut stream = spawn_with(vec![
            Ok(b"{\"event\": \"start\", \"chat_id\": \"conv-1\"}\n{\"event\": \"content\", \"data\": \"SELECT \"}\n"),
            Ok(b"{\"event\": \"content\", \"data\": \"1;\"}\n{\"event\": \"end\", \"chat_id\": \"conv-1\"}\n"),
        ]);

        let events = collect_events(&mut stream).await;
        let tokens: Vec<(u64, &str)> = events
            .iter()
            .filter_map(|event| match event {
                ChatEvent::Token { seq, text, .. } => Some((*seq, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(tokens, vec![(0, "SELECT "), (1, "1;")]);
        assert!(matches!(events.last(), Some(ChatEvent::Completed { .. })));

        let reply = stream.finish().await.expect("reply");
        assert_eq!(reply.content, "SELECT 1;");
    }

    #[tokio::test]
    async fn lines_split_across_chunks_are_reassembled() {
        let mut stream = spawn_with(vec![
            Ok(b"{\"event\": \"content\", \"da"),
            Ok(b"ta\": \"hel"),
            Ok(b"lo\"}\n"),
        ]);
        let reply = stream.finish().await.expect("reply");
        assert_eq!(reply.content, "hello");
    }

    #[tokio::test]
    async fn internal_events_do_not_touch_the_reply() {
        let mut stream = spawn_with(vec![Ok(
            b"{\"event\": \"internal\", \"data\": \"planning\"}\n{\"event\": \"content\", \"data\": \"hi\"}\n",
        )]);

        let events = collect_events(&mut stream).await;
        assert!(events.iter().any(|event| matches!(
            event,
            ChatEvent::Internal { text, .. } if text == "planning"
        )));
        assert_eq!(stream.finish().await.expect("reply").content, "hi");
    }

    #[tokio::test]
    async fn error_event_is_terminal_and_stops_processing() {
        let mut stream = spawn_with(vec![Ok(
            b"{\"event\": \"content\", \"data\": \"partial\"}\n{\"event\": \"error\", \"data\": \"boom\"}\n{\"event\": \"content\", \"data\": \"never\"}\n",
        )]);

        let events = collect_events(&mut stream).await;
        assert!(matches!(
            events.last(),
            Some(ChatEvent::Failed { error: ChatFailure::Backend { message }, .. }) if message == "boom"
        ));
        assert!(!events.iter().any(|event| matches!(
            event,
            ChatEvent::Token { text, .. } if text == "never"
        )));
        assert!(matches!(
            stream.finish().await,
            Err(StudioError::Chat(ChatFailure::Backend { .. }))
        ));
    }

    #[tokio::test]
    async fn malformed_lines_do_not_terminate_the_stream() {
        let mut stream = spawn_with(vec![Ok(
            b"noise\n{\"event\": \"content\", \"data\": \"ok\"}\n",
        )]);
        assert_eq!(stream.finish().await.expect("reply").content, "ok");
    }

    #[tokio::test]
    async fn transport_failure_preserves_partial_content_events() {
        let mut stream = spawn_with(vec![
            Ok(b"{\"event\": \"content\", \"data\": \"partial\"}\n"),
            Err(ChatFailure::Transport {
                message: "connection reset".into(),
            }),
        ]);

        let events = collect_events(&mut stream).await;
        assert!(events.iter().any(|event| matches!(
            event,
            ChatEvent::Token { text, .. } if text == "partial"
        )));
        assert!(matches!(
            events.last(),
            Some(ChatEvent::Failed { error: ChatFailure::Transport { .. }, .. })
        ));
    }

    #[tokio::test]
    async fn trailing_partial_line_is_discarded_at_end_of_stream() {
        let mut stream = spawn_with(vec![Ok(
            b"{\"event\": \"content\", \"data\": \"done\"}\n{\"event\": \"content\", \"data\": \"cut",
        )]);
        assert_eq!(stream.finish().await.expect("reply").content, "done");
    }

    #[tokio::test]
    async fn cancellation_yields_exactly_one_terminal_failure() {
        let pending: ChunkStream = Box::pin(stream::pending());
        let mut stream = ChatStream::spawn("conv-1".into(), pending, 16);

        let abort = stream.abort_handle();
        abort.abort();

        let events = collect_events(&mut stream).await;
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, ChatEvent::Failed { .. }))
                .count(),
            1
        );
        assert!(matches!(
            events.last(),
            Some(ChatEvent::Failed { error: ChatFailure::Cancelled, .. })
        ));
        assert!(matches!(
            stream.finish().await,
            Err(StudioError::Chat(ChatFailure::Cancelled))
        ));
    }

    #[tokio::test]
    async fn reply_sql_extraction_feeds_the_editor() {
        let mut stream = spawn_with(vec![Ok(
            b"{\"event\": \"content\", \"data\": \"Here you go:\\n```sql\\nSELECT 1;\\n```\"}\n",
        )]);
        let reply = stream.finish().await.expect("reply");
        assert_eq!(reply.sql().as_deref(), Some("SELECT 1;"));
    }
}
