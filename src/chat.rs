// Chat history and the assistant's streamed reply

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Sentinel payload that ends a reply
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What the chat boundary delivers, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Message(String),
    Done,
    Error(String),
}

/// Builds chat history from a stream of reply fragments.
///
/// `start` opens an empty assistant message; fragments are appended to it until
/// the stream ends. The open message is always the last one in history.
#[derive(Debug, Clone, Default)]
pub struct ChatStreamAssembler {
    history: Vec<ChatMessage>,
    open: Option<usize>,
    error: Option<String>,
}

impl ChatStreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: Vec<ChatMessage>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    /// Last stream failure, cleared when a new stream starts
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn start(&mut self) -> Result<(), StreamError> {
        if self.open.is_some() {
            return Err(StreamError::AlreadyStreaming);
        }
        self.error = None;
        self.history.push(ChatMessage::assistant(""));
        self.open = Some(self.history.len() - 1);
        Ok(())
    }

    /// The placeholder opened by `start`.
    ///
    /// Fails if no stream is open, or if history changed so that the open
    /// message is no longer the trailing assistant message.
    pub fn last_open_assistant(&mut self) -> Result<&mut ChatMessage, StreamError> {
        let index = self.open.ok_or(StreamError::NotStreaming)?;
        if index + 1 != self.history.len() {
            return Err(StreamError::PlaceholderLost);
        }
        match self.history.get_mut(index) {
            Some(message) if message.role == Role::Assistant => Ok(message),
            _ => Err(StreamError::PlaceholderLost),
        }
    }

    pub fn feed(&mut self, event: StreamEvent) -> Result<(), StreamError> {
        match event {
            StreamEvent::Message(data) if data == DONE_SENTINEL => self.finish(),
            StreamEvent::Message(data) => {
                if !self.is_streaming() {
                    tracing::debug!(len = data.len(), "Ignoring fragment outside of a stream");
                    return Ok(());
                }
                self.last_open_assistant()?.content.push_str(&data);
                Ok(())
            }
            StreamEvent::Done => self.finish(),
            StreamEvent::Error(message) => Err(self.fail(message)),
        }
    }

    /// Feed a batch of raw payloads, e.g. `["Hel", "lo", "[DONE]"]`
    pub fn feed_all<I, S>(&mut self, payloads: I) -> Result<(), StreamError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for payload in payloads {
            self.feed(StreamEvent::Message(payload.into()))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        if !self.is_streaming() {
            return Ok(());
        }
        let empty = self.last_open_assistant()?.content.is_empty();
        if empty {
            self.history.pop();
        }
        self.open = None;
        Ok(())
    }

    /// Close the stream after a failure; the placeholder goes if nothing arrived
    fn fail(&mut self, message: String) -> StreamError {
        tracing::warn!(error = %message, "Chat stream failed");
        let empty = matches!(self.last_open_assistant(), Ok(placeholder) if placeholder.content.is_empty());
        if empty {
            self.history.pop();
        }
        self.open = None;
        self.error = Some(message.clone());
        StreamError::Remote(message)
    }
}
