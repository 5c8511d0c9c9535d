#![forbid(unsafe_code)]

//! Chat session layer of the dashboard: directive recognition, the command
//! interpreter, the visible-element registry and value-box metrics.

pub mod chat;
pub mod config;
pub mod directive;
pub mod error;
pub mod interpreter;
pub mod metrics;
pub mod prompt;
pub mod registry;

pub use chat::{
    ChatClient, ChatError, ChatMessage, ChatRole, ChatSession, EchoClient, ReplyStream,
    ScriptedClient, Turn,
};
pub use config::{ConfigError, SessionConfig};
pub use directive::{Directive, Toggle, parse_directive};
pub use error::SessionError;
pub use interpreter::{
    Interpreter, NullObserver, RecordingObserver, SessionEvent, SessionObserver, SessionState,
};
pub use metrics::{ValueBoxes, format_currency, format_percent};
pub use prompt::{system_prompt, welcome_message};
pub use registry::{ElementId, ElementRegistry, VALUE_BOXES, WIDGETS};
