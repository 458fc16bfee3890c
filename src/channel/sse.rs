//! Server-sent events framing.

use std::borrow::Cow;

/// Accumulates body chunks and yields complete SSE blocks.
///
/// Bytes are kept raw until a block is complete so multi-byte characters
/// split across chunks decode intact.
#[derive(Debug, Default)]
pub struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete block with CRLF normalized to LF, skipping empty ones.
    pub fn next_block(&mut self) -> Option<String> {
        loop {
            let (pos, separator_len) = find_boundary(&self.pending)?;
            let raw: Vec<u8> = self.pending.drain(..pos + separator_len).collect();
            let block = String::from_utf8_lossy(&raw[..pos]).replace("\r\n", "\n");

            if !block.trim().is_empty() {
                return Some(block);
            }
        }
    }
}

fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        if buf[i..].starts_with(b"\n\n") {
            Some((i, 2))
        } else if buf[i..].starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

/// Split a block into its event name and joined `data:` lines.
///
/// Comment lines (`:` prefix) and other fields are ignored.
pub fn parse_sse_block(block: &str) -> (Option<&str>, Cow<'_, str>) {
    let mut event_name: Option<&str> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_name = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    let data = if data_lines.len() == 1 {
        Cow::Borrowed(data_lines[0])
    } else {
        Cow::Owned(data_lines.join("\n"))
    };

    (event_name, data)
}
