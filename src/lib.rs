//! kurator - Telegram-to-publication content operations backend
//!
//! A background worker that mines configured Telegram channels, filters
//! posts with an LLM, and turns one accepted post per cycle into a draft
//! social-media publication awaiting moderation.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`engine`] - The autoposting engine: scheduler, due-time selection,
//!   channel processing, per-config coordination
//! - [`telegram`] - Channel preview fetching and HTML extraction
//! - [`llm`] - LLM client for classification and draft composition
//! - [`generation`] - Draft publication pipeline (text, image, moderation)
//! - [`storage`] - PostgreSQL repositories (configs, viewed ledger,
//!   publications)
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use kurator::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!     // wire adapters and start the engine; see src/main.rs
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod llm;
pub mod models;
pub mod storage;
pub mod telegram;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{Coordinator, CycleStats, Scheduler};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{AutopostingConfig, ChannelPost, ModerationStatus, Verdict};
    pub use crate::storage::{AutopostingStore, PublicationStore, ViewedLinkStore};
    pub use crate::telegram::TelegramFetcher;
}

// Direct re-exports for convenience
pub use models::{AutopostingConfig, ChannelPost, ModerationStatus, Verdict};
