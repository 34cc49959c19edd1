//! Chat completion abstraction and adapters.
//!
//! The summarization pipeline talks to one capability: send an ordered list of
//! chat messages, get the model's reply text back. Adapters own the HTTP
//! specifics so the pipeline stays provider-agnostic. [`azure`] carries the
//! Azure OpenAI implementation used by the CLI.

pub mod azure;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced while requesting a chat completion.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Transport-level failure reaching the provider.
    #[error("Chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider returned a non-success status.
    #[error("Chat endpoint returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status reported by the provider.
        status: reqwest::StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Provider response carried no usable reply text.
    #[error("Malformed chat response: {0}")]
    MalformedResponse(String),
}

/// Role attached to a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the model's behavior.
    System,
    /// Content supplied on behalf of the caller.
    User,
    /// A previous reply from the model.
    Assistant,
}

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role attached to the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Interface implemented by chat completion providers.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Request a completion for the given messages and return the reply text.
    ///
    /// An empty reply is reported as [`ChatClientError::MalformedResponse`].
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ChatClientError>;
}
