//! Message types for LLM communication.
//!
//! Defines the core types used for building chat requests and the
//! caller-owned conversation context.

use serde::{Deserialize, Serialize};

/// Lowest temperature accepted by the chat completion endpoints.
pub const MIN_TEMPERATURE: f32 = 0.0;

/// Highest temperature accepted by the chat completion endpoints.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing context and instructions.
    System,
    /// User message (human input).
    User,
    /// Assistant message (LLM response).
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A single chat completion request, built fresh for every call.
///
/// The model id is not part of the request; it belongs to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Ordered, role-tagged messages.
    pub messages: Vec<Message>,
    /// Sampling temperature, always within `[0, 2]`.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Name of the caller, reported in progress events. Never sent to the provider.
    pub component: Option<&'static str>,
}

impl CompletionRequest {
    /// Creates a request with temperature 0.7 and 500 max tokens.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: 0.7,
            max_tokens: 500,
            component: None,
        }
    }

    /// Sets the temperature, clamped to the accepted range.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = if temperature.is_nan() {
            MIN_TEMPERATURE
        } else {
            temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
        };
        self
    }

    /// Sets the max output tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Names the component making the request.
    pub fn with_component(mut self, component: &'static str) -> Self {
        self.component = Some(component);
        self
    }

    /// Returns the content of the last user message, if any.
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Conversation context held by the presentation layer.
///
/// Each turn is a question (user) paired with the SQL that answered it
/// (assistant). Agents receive `messages()` per call and never store it.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Maximum number of turns to keep.
    max_turns: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Creates a new empty conversation keeping the last 5 turns.
    pub fn new() -> Self {
        Self::with_max_turns(5)
    }

    /// Creates a conversation with a custom turn limit.
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// Records a question and the SQL generated for it.
    pub fn record_turn(&mut self, question: impl Into<String>, sql: impl Into<String>) {
        self.messages.push(Message::user(question));
        self.messages.push(Message::assistant(sql));
        self.trim_to_limit();
    }

    /// Returns all messages in the conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Clears all turns.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the number of recorded turns.
    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }

    /// Returns true if no turn was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn trim_to_limit(&mut self) {
        let excess = self.turns().saturating_sub(self.max_turns);
        if excess > 0 {
            self.messages.drain(..excess * 2);
        }
    }
}
