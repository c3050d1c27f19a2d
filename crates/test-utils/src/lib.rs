//! Shared helpers for newsloom integration tests: an isolated store
//! with the full schema, feed seeding, and a programmable LLM provider.

use anyhow::Result;
use async_trait::async_trait;
use newsloom::errors::LlmError;
use newsloom::providers::ai::LlmProvider;
use newsloom::store::Store;
use std::sync::{Arc, Mutex};
use turso::params;

// --- Test Setup ---

/// A fresh, isolated in-memory database with the full newsloom schema
/// and seed data applied.
pub struct TestSetup {
    pub store: Store,
}

impl TestSetup {
    pub async fn new() -> Result<Self> {
        let store = Store::open(":memory:").await?;
        store.initialize().await?;
        Ok(Self { store })
    }

    /// Registers a feed and returns its id.
    pub async fn add_feed(&self, name: &str, url: &str, category_id: i64) -> Result<i64> {
        let conn = self.store.db().connect()?;
        let mut rows = conn
            .query(
                "INSERT INTO feeds (name, url, category_id, enabled)
                 VALUES (?, ?, ?, 1)
                 RETURNING feed_id;",
                params![name, url, category_id],
            )
            .await?;
        let row = rows.next().await?.expect("insert returned no row");
        Ok(row.get(0)?)
    }

    /// Stores an API key for the named provider.
    pub async fn set_api_key(&self, name: &str, key: &str) -> Result<()> {
        let conn = self.store.db().connect()?;
        conn.execute(
            "UPDATE apikey SET key_value = ? WHERE name = ?;",
            params![key, name],
        )
        .await?;
        Ok(())
    }

    /// Counts rows matched by an arbitrary SELECT COUNT(*) query.
    pub async fn count(&self, sql: &str) -> Result<i64> {
        let conn = self.store.db().connect()?;
        let mut rows = conn.query(sql, ()).await?;
        let row = rows.next().await?.expect("count query returned no row");
        Ok(row.get(0)?)
    }
}

// --- Mock LLM Provider ---

/// A programmable [`LlmProvider`] that replays queued responses in order
/// and records every prompt it receives.
#[derive(Clone, Debug, Default)]
pub struct MockLlmProvider {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response; responses are consumed first-in first-out.
    /// When the queue runs dry the last response is replayed.
    pub fn push_response(&self, body: &str) {
        self.responses.lock().unwrap().push(body.to_string());
    }

    /// The prompts received so far, for assertions.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn enrich(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Ok(String::new()),
            1 => Ok(responses[0].clone()),
            _ => Ok(responses.remove(0)),
        }
    }
}
