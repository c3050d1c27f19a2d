//! Shared helpers for the core library's integration tests.

use anyhow::Result;
use async_trait::async_trait;
use newsloom::errors::LlmError;
use newsloom::providers::ai::LlmProvider;
use newsloom::store::Store;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use turso::params;

/// Creates an isolated in-memory store with the full schema and seed.
pub async fn test_store() -> Result<Store> {
    let store = Store::open(":memory:").await?;
    store.initialize().await?;
    Ok(store)
}

/// Inserts a bare article row directly, bypassing the crawler, so the
/// enrichment tests can exercise claiming and completion.
pub async fn insert_plain_article(store: &Store, id: &str, category_id: i64) -> Result<()> {
    let conn = store.db().connect()?;
    conn.execute(
        "INSERT INTO articles (id, title, source, url, description, content, category_id)
         VALUES (?, ?, 'Test Wire', ?, 'A test article.', 'Body text.', ?);",
        params![
            id,
            format!("Article {id}"),
            format!("http://example.com/{id}"),
            category_id
        ],
    )
    .await?;
    Ok(())
}

pub async fn scalar(store: &Store, sql: &str) -> Result<i64> {
    let conn = store.db().connect()?;
    let mut rows = conn.query(sql, ()).await?;
    let row = rows.next().await?.expect("query returned no row");
    Ok(row.get(0)?)
}

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

fn keywords(level: &str) -> Value {
    let entries: Vec<Value> = (0..10)
        .map(|i| {
            let mut entry = serde_json::Map::new();
            entry.insert("word".to_string(), json!(format!("term{i}")));
            entry.insert("frequency".to_string(), json!(i + 1));
            entry.insert(
                format!("{level}_explanation"),
                json!(format!("meaning of term{i}")),
            );
            Value::Object(entry)
        })
        .collect();
    Value::Array(entries)
}

fn questions(count: usize) -> Value {
    let entries: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "question": format!("Question {i}?"),
                "options": ["Alpha", "Beta", "Gamma", "Delta"],
                "answer": "B"
            })
        })
        .collect();
    Value::Array(entries)
}

fn perspectives() -> Value {
    json!({
        "perspectives": [
            { "perspective": "Supporters welcome the change.", "attitude": "positive" },
            { "perspective": "Critics question the cost.", "attitude": "negative" }
        ],
        "synthesis": { "perspective": "Both sides agree more data is needed.", "attitude": "neutral" }
    })
}

/// A contract-complete response body for the given article id.
pub fn valid_response(article_id: &str) -> Value {
    json!({
        "article_id": article_id,
        "title_zh": "测试标题",
        "summary_easy": words(150),
        "summary_mid": words(400),
        "summary_hard": words(600),
        "summary_zh_hard": "这是一篇测试文章的高级中文摘要。",
        "key_words_easy": keywords("easy"),
        "key_words_mid": keywords("mid"),
        "key_words_hard": keywords("hard"),
        "background_reading_easy": "Some context.",
        "background_reading_mid": "More context.",
        "background_reading_hard": "Full context.",
        "article_analysis_mid": words(100),
        "article_analysis_hard": words(100),
        "multiple_choice_questions_easy": questions(8),
        "multiple_choice_questions_mid": questions(10),
        "multiple_choice_questions_hard": questions(12),
        "perspectives_easy": perspectives(),
        "perspectives_mid": perspectives(),
        "perspectives_hard": perspectives()
    })
}

/// An [`LlmProvider`] that replays a fixed body and counts its calls.
#[derive(Clone, Debug)]
pub struct ScriptedProvider {
    body: String,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn enrich(&self, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}
