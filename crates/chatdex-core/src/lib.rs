//! chatdex-core: searchable archive for chat-assistant conversation exports
//!
//! This crate turns an exported conversation tree (the `conversations.json`
//! a chat assistant produces) into a normalized SQLite store with a
//! full-text index, and answers shorthand + time-bounded queries over it.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ident;
pub mod ingest;
pub mod linearize;
pub mod models;
pub mod query;
pub mod schema;

pub use config::Config;
pub use db::Database;
pub use error::Error;
pub use error::Result;

/// Application name used for config directories and paths.
pub const APP_NAME: &str = "chatdex";
