//! Error taxonomy shared across the pipeline stages.
//!
//! Each stage handles errors at its own boundary: a failed feed never
//! aborts the crawl, a failed enrichment releases its claim and moves on.
//! Only the variants here cross crate boundaries.

use thiserror::Error;

/// Errors raised by the relational store.
///
/// Every multi-statement operation runs inside a transaction, so any of
/// these surfacing means no partial row set remains.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Unique constraint violated: {0}")]
    Uniqueness(String),
    #[error("Foreign key constraint violated: {0}")]
    ForeignKey(String),
    #[error("Transaction failed: {0}")]
    Transaction(String),
    #[error("Daily article capacity exceeded for {date}: counter would pass 99")]
    CapacityExceeded { date: String },
    #[error("Row not found: {0}")]
    NotFound(String),
    #[error("Schema bootstrap failed: {0}")]
    Bootstrap(String),
    #[error("Seed data error: {0}")]
    Seed(#[from] serde_json::Error),
}

/// Image acquisition and transcoding errors.
///
/// At crawl time any of these skips the article; at the image stage the
/// failure is recorded and the worker continues.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("No acceptable image candidate on the page")]
    NoCandidate,
    #[error("Image download failed: {0}")]
    Http(String),
    #[error("Rejected content type '{0}'")]
    ContentType(String),
    #[error("Image body of {got} bytes is below the {min} byte minimum")]
    BelowMinBytes { got: u64, min: u64 },
    #[error("Image decode failed: {0}")]
    Decode(String),
    #[error("Image encode failed: {0}")]
    Encode(String),
    #[error("Mobile rendition missed the byte budget: {0}")]
    BudgetExceeded(String),
}

/// Errors from the external LLM provider.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("Network error talking to the LLM provider: {0}")]
    Network(reqwest::Error),
    #[error("LLM request exceeded its deadline of {0} seconds")]
    Timeout(u64),
    #[error("LLM provider rejected the API key")]
    Auth,
    #[error("LLM provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("LLM response body could not be read: {0}")]
    Body(reqwest::Error),
}

/// Violations of the structured response contract.
///
/// Raised after a successful HTTP exchange when the body does not satisfy
/// the per-article enrichment shape. The raw body is saved to disk before
/// `NotJson` is surfaced.
#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Response is not a single JSON object: {0}")]
    NotJson(String),
    #[error("Mandatory field missing or malformed: {0}")]
    MissingField(String),
    #[error("Synthesis perspective must be neutral, got '{0}'")]
    AttitudeInvariant(String),
    #[error("{field} word count {words} outside [{min}, {max}]")]
    WordCountOutOfBand {
        field: &'static str,
        words: usize,
        min: usize,
        max: usize,
    },
    #[error("{field} expects {expected} items, got {actual}")]
    Cardinality {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}
