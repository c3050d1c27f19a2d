//! # newsloom
//!
//! Core library for the newsloom content mining and enrichment pipeline.
//! It provides the relational store that every stage coordinates through,
//! the category-bound prompt family, the LLM provider seam, and the
//! enrichment orchestrator that claims articles and persists their
//! generated artifacts.

pub mod config;
pub mod enrich;
pub mod errors;
pub mod prompts;
pub mod providers;
pub mod store;
pub mod types;

pub use config::{Config, CrawlMode, Thresholds};
pub use errors::{LlmError, StoreError, StructureError};
pub use store::Store;
