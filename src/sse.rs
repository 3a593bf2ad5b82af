// Server-sent events decoder for the chat stream

use nom::{
    branch::alt,
    bytes::complete::take_till,
    character::complete::char,
    combinator::{opt, rest},
    sequence::preceded,
    IResult,
};

use crate::chat::{ChatStreamAssembler, StreamEvent, DONE_SENTINEL};
use crate::error::StreamError;

/// One non-blank line of an event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    Comment(&'a str),
    Field { name: &'a str, value: &'a str },
}

/// Parse a single line with its terminator already stripped
pub fn parse_line(input: &str) -> IResult<&str, SseLine<'_>> {
    alt((comment, field))(input)
}

fn comment(input: &str) -> IResult<&str, SseLine<'_>> {
    let (input, text) = preceded(char(':'), rest)(input)?;
    Ok((input, SseLine::Comment(text.trim_start())))
}

// `name: value`, `name:value` or a bare `name`; only one leading space is stripped
fn field(input: &str) -> IResult<&str, SseLine<'_>> {
    let (input, name) = take_till(|c: char| c == ':')(input)?;
    let (input, value) = opt(preceded(char(':'), preceded(opt(char(' ')), rest)))(input)?;
    Ok((
        input,
        SseLine::Field {
            name,
            value: value.unwrap_or(""),
        },
    ))
}

/// A dispatched event: the fields seen up to a blank line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: Vec<String>,
    pub id: Option<String>,
}

impl SseFrame {
    /// Data lines joined with newlines
    pub fn payload(&self) -> String {
        self.data.join("\n")
    }

    pub fn to_stream_event(&self) -> StreamEvent {
        let payload = self.payload();
        match self.event.as_deref() {
            Some("error") => StreamEvent::Error(payload),
            Some("done") => StreamEvent::Done,
            _ if payload == DONE_SENTINEL => StreamEvent::Done,
            _ => StreamEvent::Message(payload),
        }
    }
}

/// Incremental decoder; network reads may split lines anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    frame: SseFrame,
    last_event_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Append a chunk and return every frame it completes
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk.as_ref());

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(frame) = self.apply(line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Like `push`, mapped to chat stream events
    pub fn push_events(&mut self, chunk: impl AsRef<[u8]>) -> Vec<StreamEvent> {
        self.push(chunk).iter().map(SseFrame::to_stream_event).collect()
    }

    /// Decode a chunk straight into the chat history
    pub fn feed_into(&mut self, chunk: impl AsRef<[u8]>, chat: &mut ChatStreamAssembler) -> Result<(), StreamError> {
        for event in self.push_events(chunk) {
            chat.feed(event)?;
        }
        Ok(())
    }

    /// End of input. An unterminated trailing frame is dropped.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || !self.frame.data.is_empty() {
            tracing::debug!(buffered = self.buffer.len(), "Discarding incomplete event at end of stream");
        }
        self.buffer.clear();
        self.frame = SseFrame::default();
    }

    fn apply(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            let frame = std::mem::take(&mut self.frame);
            if frame.data.is_empty() {
                return None;
            }
            return Some(frame);
        }

        match parse_line(line) {
            Ok((_, SseLine::Comment(_))) => {}
            Ok((_, SseLine::Field { name, value })) => match name {
                "event" => self.frame.event = Some(value.to_string()),
                "data" => self.frame.data.push(value.to_string()),
                "id" => {
                    self.frame.id = Some(value.to_string());
                    self.last_event_id = Some(value.to_string());
                }
                "retry" => {}
                other => tracing::debug!(field = other, "Ignoring unknown event-stream field"),
            },
            Err(err) => tracing::warn!(error = %err, "Unparseable event-stream line"),
        }
        None
    }
}
