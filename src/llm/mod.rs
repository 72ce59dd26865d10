//! External AI collaborator boundary (feature `assistant`).
//!
//! The engine hands over a textual context summary plus the user's question
//! and displays whatever text comes back; no structured output is parsed.

mod client;

pub use client::{AssistantClient, DEFAULT_ASSISTANT_TIMEOUT};
