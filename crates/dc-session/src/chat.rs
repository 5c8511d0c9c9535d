//! Chat turns: stream a reply from the model, record it, run its directive.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dc_frame::DataFrame;
use dc_plot::{FigureRenderer, VegaLiteRenderer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::directive::{Directive, parse_directive};
use crate::error::SessionError;
use crate::interpreter::{Interpreter, SessionObserver, SessionState};
use crate::prompt::{system_prompt, welcome_message};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("chat client failed: {0}")]
    Client(String),
    #[error("model reply took longer than {limit_ms} ms")]
    Timeout { limit_ms: u64 },
}

/// Reply fragments in arrival order.
pub type ReplyStream = Box<dyn Iterator<Item = Result<String, ChatError>> + Send>;

/// The model side of a conversation.
pub trait ChatClient {
    /// Start a reply to `prompt`.
    ///
    /// The session checks its reply deadline only between fragments, so it
    /// cannot interrupt a `next()` call that blocks. Clients backed by a
    /// network connection must put their own read timeout on it and yield
    /// `Err(ChatError::Timeout)` or `Err(ChatError::Client)` when it fires.
    fn stream(&mut self, prompt: &str) -> Result<ReplyStream, ChatError>;
}

/// Replays canned replies in order, split into fixed-size fragments.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    replies: VecDeque<String>,
    fragment_chars: usize,
}

impl ScriptedClient {
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            fragment_chars: 16,
        }
    }

    #[must_use]
    pub fn with_fragment_chars(mut self, chars: usize) -> Self {
        self.fragment_chars = chars.max(1);
        self
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl ChatClient for ScriptedClient {
    fn stream(&mut self, _prompt: &str) -> Result<ReplyStream, ChatError> {
        let reply = self
            .replies
            .pop_front()
            .ok_or_else(|| ChatError::Client("no scripted reply left".to_owned()))?;
        Ok(Box::new(
            fragments(&reply, self.fragment_chars)
                .into_iter()
                .map(Ok::<String, ChatError>),
        ))
    }
}

/// Answers every prompt with the prompt itself, so typed directives run as
/// if the model had said them.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoClient;

impl ChatClient for EchoClient {
    fn stream(&mut self, prompt: &str) -> Result<ReplyStream, ChatError> {
        Ok(Box::new(std::iter::once(Ok::<String, ChatError>(
            prompt.to_owned(),
        ))))
    }
}

fn fragments(text: &str, size: usize) -> Vec<String> {
    let chars = text.chars().collect::<Vec<_>>();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Result of one submitted prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub reply: String,
    pub directive: Directive,
    pub statuses: Vec<String>,
}

/// One user's conversation with the model and the dashboard it drives.
/// `submit` takes `&mut self`, so turns never overlap.
pub struct ChatSession<C, R = VegaLiteRenderer> {
    client: C,
    interpreter: Interpreter<R>,
    state: SessionState,
    transcript: Vec<ChatMessage>,
    reply_timeout: Duration,
}

impl<C: ChatClient, R: FigureRenderer> ChatSession<C, R> {
    /// Start a session over `base`; the transcript opens with the system
    /// prompt and the welcome message.
    #[must_use]
    pub fn new(
        client: C,
        interpreter: Interpreter<R>,
        base: Arc<DataFrame>,
        config: &SessionConfig,
    ) -> Self {
        let schema = base.schema();
        let transcript = vec![
            ChatMessage::new(ChatRole::System, system_prompt(&schema)),
            ChatMessage::new(ChatRole::Assistant, welcome_message(&schema)),
        ];
        Self {
            client,
            interpreter,
            state: SessionState::new(base),
            transcript,
            reply_timeout: config.reply_timeout(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send `prompt`, collect the streamed reply, and apply the directive it
    /// carries. A client failure or timeout leaves the dashboard untouched.
    pub fn submit(
        &mut self,
        prompt: &str,
        observer: &mut dyn SessionObserver,
    ) -> Result<Turn, SessionError> {
        self.transcript.push(ChatMessage::new(ChatRole::User, prompt));
        let reply = self.collect_reply(prompt)?;
        self.transcript
            .push(ChatMessage::new(ChatRole::Assistant, reply.clone()));

        let directive = parse_directive(&reply.to_lowercase());
        #[cfg(feature = "tracing")]
        tracing::info!(reply_chars = reply.len(), ?directive, "model replied");

        let statuses = self.interpreter.execute(&mut self.state, &directive, observer);
        self.transcript.extend(
            statuses
                .iter()
                .map(|status| ChatMessage::new(ChatRole::Assistant, status.clone())),
        );

        Ok(Turn {
            reply,
            directive,
            statuses,
        })
    }

    fn collect_reply(&mut self, prompt: &str) -> Result<String, ChatError> {
        let started = Instant::now();
        let mut reply = String::new();
        for fragment in self.client.stream(prompt)? {
            reply.push_str(&fragment?);
            if started.elapsed() > self.reply_timeout {
                let limit_ms = u64::try_from(self.reply_timeout.as_millis()).unwrap_or(u64::MAX);
                #[cfg(feature = "tracing")]
                tracing::warn!(limit_ms, "model reply timed out");
                return Err(ChatError::Timeout { limit_ms });
            }
        }
        Ok(reply)
    }
}
