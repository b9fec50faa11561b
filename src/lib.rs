//! # Agent Relay
//!
//! A chat-completion relay server with a small agent toolkit.
//!
//! This library provides:
//! - An OpenAI-compatible HTTP endpoint that relays chat-completion requests
//!   through an ordered chain of upstream providers
//! - A tool layer (web fetch, web search, shell, file read/write/edit) backing
//!   the `agent` command-line dispatcher
//! - A bounded breadth-first docs crawler that renders pages to markdown
//!
//! ## Architecture
//!
//! The relay follows a waterfall pattern:
//! 1. Receive a chat-completion request via the API
//! 2. Prepend the optional `system` field as a system message
//! 3. Forward the conversation to the first healthy provider in the chain
//! 4. On rate limits or server errors, fail over to the next entry
//! 5. Format the winning completion as a JSON object or an SSE chunk stream
//!
//! ## Example
//!
//! ```rust,ignore
//! use agent_relay::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod api;
pub mod config;
pub mod crawler;
pub mod health;
pub mod llm;
pub mod providers;
pub mod search;
pub mod tools;

pub use config::Config;
