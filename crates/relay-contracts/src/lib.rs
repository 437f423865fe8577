pub mod bracket;
pub mod chat;
pub mod config;
pub mod webhook;
