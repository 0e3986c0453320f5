use serde_json::Value;

/// One recognized application-level event decoded from an NDJSON line.
///
/// The backend also emits `start`/`end` framing lines and may grow new kinds;
/// anything unrecognized decodes to no event at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WireEvent {
    /// Text fragment to append to the in-progress assistant reply.
    Content(String),
    /// Diagnostic/progress message, not part of the visible reply.
    Internal(String),
    /// Terminal backend failure; aborts the stream.
    Error(String),
}

/// Incremental decoder for the newline-delimited JSON chat transport.
///
/// Chunks may split lines anywhere, including inside a UTF-8 sequence; the
/// decoder buffers raw bytes and only surfaces complete `\n`-terminated
/// lines. Whatever trails the last newline when the stream ends is never
/// surfaced.
#[derive(Default)]
pub(crate) struct NdjsonDecoder {
    buf: Vec<u8>,
}

impl NdjsonDecoder {
    /// Buffers `chunk` and returns every line it completed, in order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|byte| *byte == b'\n') {
            let line_bytes: Vec<u8> = self.buf.drain(..=idx).collect();
            let line = String::from_utf8_lossy(&line_bytes[..idx]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Decodes one complete line into an event.
    ///
    /// Lines that are not JSON objects (keep-alive blanks, transport noise)
    /// and objects with an unrecognized `event` kind decode to `None`.
    pub fn decode_line(line: &str) -> Option<WireEvent> {
        let value: Value = serde_json::from_str(line).ok()?;
        let kind = value.get("event")?.as_str()?;
        let data = value
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match kind {
            "content" => Some(WireEvent::Content(data.to_string())),
            "internal" => Some(WireEvent::Internal(data.to_string())),
            "error" => Some(WireEvent::Error(data.to_string())),
            _ => None,
        }
    }
}
