//! Chat front-end server for schema-guided website extraction.
//!
//! Serves the browser UI and a JSON API over session-scoped state: a
//! schema field builder, a conversation log, and per-turn download
//! artifacts. The extraction itself is delegated to the `extract` crate.

pub mod config;
pub mod server;
pub mod sessions;

pub use config::Config;
