//! Incremental `text/event-stream` parsing.

use propdesk_core::domain::OccupancyEvent;

use crate::error::{ClientError, Result};

/// One dispatched SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

/// Buffers raw bytes and yields complete frames.
///
/// Bytes are kept undecoded until a blank line closes a frame, so multi-byte
/// characters split across chunks survive.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    /// Feed a chunk and drain every frame it completes. Comment-only blocks
    /// (keep-alives) produce nothing.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, skip)) = frame_boundary(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + skip).take(end).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Position of the first blank line and the length of its terminator.
fn frame_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_frame(block: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "id" => frame.id = Some(value.to_string()),
            "event" => frame.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() && frame.id.is_none() && frame.event.is_none() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

/// Decode an occupancy frame into its numeric id and event.
pub fn decode_occupancy(frame: &SseFrame) -> Result<(u64, OccupancyEvent)> {
    let id = frame
        .id
        .as_deref()
        .and_then(|id| id.trim().parse::<u64>().ok())
        .ok_or_else(|| ClientError::SseParse(format!("missing or invalid id: {:?}", frame.id)))?;
    let event = serde_json::from_str(&frame.data)
        .map_err(|err| ClientError::SseParse(format!("event {id}: {err}")))?;
    Ok((id, event))
}
