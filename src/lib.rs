//! codepress-scope - code context engine for coding agents
//!
//! Serves file contents, scoped full-text search and bounded JavaScript /
//! TypeScript dependency graphs from a local repository. Every tool
//! operation on [`engine::Engine`] returns plain text ready to hand to a
//! language model.
//!
//! ```no_run
//! use codepress_scope::config::EngineConfig;
//! use codepress_scope::core::model::SearchRequest;
//! use codepress_scope::engine::Engine;
//!
//! let mut engine = Engine::new(".", EngineConfig::default()).unwrap();
//! println!("{}", engine.search_repo(&SearchRequest::new("TODO").extensions(["ts"])));
//! println!("{}", engine.dep_graph("src/index.ts", 2));
//! ```

pub mod backends;
pub mod cache;
pub mod config;
pub mod core;
pub mod engine;

pub use crate::config::EngineConfig;
pub use crate::core::model::{EngineError, SearchRequest};
pub use crate::engine::Engine;
