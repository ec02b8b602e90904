//! LLM client abstraction.
//!
//! The core treats every model call as a blocking request/response. Transport,
//! timeouts and retries belong to the implementation behind [`LlmClient`].
//! [`ScriptedLlmClient`] replays queued responses for tests and the replay CLI.

use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

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

/// Generic LLM client trait
pub trait LlmClient: Send + Sync {
    /// Single-prompt completion
    fn complete_text(&self, prompt: &str) -> Result<String, LlmError>;

    /// Chat completion
    fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Label for logs
    fn name(&self) -> &str {
        "llm"
    }
}

/// Replays queued responses in order. An exhausted queue answers with
/// `LlmError::InvalidResponse`.
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    name: String,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Queue a successful response
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue an error
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queue a response on a shared client
    pub fn push(&self, response: Result<String, LlmError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Prompts received so far (chat messages are joined by newlines)
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }

    fn next(&self, prompt: String) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt);
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("no scripted response left".to_string())))
    }
}

impl LlmClient for ScriptedLlmClient {
    fn complete_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.next(prompt.to_string())
    }

    fn chat(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let joined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.next(joined)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
