//! Client-side session/streaming engine for a conversational assistant.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod stream;
