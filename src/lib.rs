//! Google Chat ⇄ Botpress webhook relay.

pub mod botpress;
pub mod config;
pub mod event;
pub mod google_chat;
pub mod relay;
pub mod server;
