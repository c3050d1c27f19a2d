//! Persistence of a validated enrichment response.
//!
//! Everything an article gains from the LLM lands in one transaction,
//! together with the flip of its coordination columns. Downstream
//! consumers never observe an article that is processed but missing
//! artifacts, or vice versa.

use super::{sql, Store};
use crate::enrich::response::{word_count, EnrichmentResponse};
use crate::errors::StoreError;
use tracing::info;
use turso::params;

/// Bookkeeping for the saved response file.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub response_file: String,
    pub payload_bytes: i64,
    pub prompt_name: String,
}

impl Store {
    /// Commits every artifact of a processed article and marks it done.
    ///
    /// On any failure the transaction rolls back; the caller then records
    /// the failure via [`Store::fail_article`], which also releases the
    /// claim.
    pub async fn complete_article(
        &self,
        article_id: &str,
        response: &EnrichmentResponse,
        meta: &ResponseMeta,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let tx = conn.transaction().await?;

        for (difficulty, text) in response.summaries() {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO article_summaries
                         (article_id, difficulty, summary_text, word_count)
                     VALUES (?, ?, ?, ?);",
                )
                .await?;
            stmt.execute(params![
                article_id,
                difficulty.as_str(),
                text,
                word_count(text) as i64
            ])
            .await?;
        }

        for (difficulty, keywords) in response.keywords() {
            for keyword in keywords {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO keywords
                             (article_id, difficulty, word, frequency, explanation)
                         VALUES (?, ?, ?, ?, ?);",
                    )
                    .await?;
                stmt.execute(params![
                    article_id,
                    difficulty.as_str(),
                    keyword.word.clone(),
                    keyword.frequency,
                    keyword.explanation.clone()
                ])
                .await?;
            }
        }

        for (difficulty, questions) in response.question_sets() {
            for (position, question) in questions.iter().enumerate() {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO questions
                             (article_id, difficulty, question_text, position)
                         VALUES (?, ?, ?, ?)
                         RETURNING id;",
                    )
                    .await?;
                let mut rows = stmt
                    .query(params![
                        article_id,
                        difficulty.as_str(),
                        question.question.clone(),
                        (position + 1) as i64
                    ])
                    .await?;
                let question_id: i64 = match rows.next().await? {
                    Some(row) => row.get(0)?,
                    None => {
                        return Err(StoreError::Transaction(
                            "question insert returned no id".to_string(),
                        ))
                    }
                };

                let answer = question.answer.trim().to_uppercase();
                for (index, option) in question.options.iter().enumerate() {
                    let label = char::from(b'A' + index as u8).to_string();
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO choices
                                 (question_id, choice_label, choice_text, is_correct)
                             VALUES (?, ?, ?, ?);",
                        )
                        .await?;
                    stmt.execute(params![
                        question_id,
                        label.clone(),
                        option.clone(),
                        (label == answer) as i64
                    ])
                    .await?;
                }
            }
        }

        for (difficulty, block) in response.perspective_blocks() {
            for perspective in &block.perspectives {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO comments
                             (article_id, difficulty, perspective, attitude, is_synthesis)
                         VALUES (?, ?, ?, ?, 0);",
                    )
                    .await?;
                stmt.execute(params![
                    article_id,
                    difficulty.as_str(),
                    perspective.perspective.clone(),
                    perspective.attitude.as_str()
                ])
                .await?;
            }
            let mut stmt = tx
                .prepare(
                    "INSERT INTO comments
                         (article_id, difficulty, perspective, attitude, is_synthesis)
                     VALUES (?, ?, ?, ?, 1);",
                )
                .await?;
            stmt.execute(params![
                article_id,
                difficulty.as_str(),
                block.synthesis.perspective.clone(),
                block.synthesis.attitude.as_str()
            ])
            .await?;
        }

        for (difficulty, text) in response.backgrounds() {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO background_read (article_id, difficulty, background_text)
                     VALUES (?, ?, ?);",
                )
                .await?;
            stmt.execute(params![article_id, difficulty.as_str(), text])
                .await?;
        }

        for (difficulty, text) in response.analyses() {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO article_analysis (article_id, difficulty, analysis_text)
                     VALUES (?, ?, ?);",
                )
                .await?;
            stmt.execute(params![article_id, difficulty.as_str(), text])
                .await?;
        }

        let mut stmt = tx
            .prepare(
                "INSERT INTO response (article_id, response_file, payload_bytes, prompt_name)
                 VALUES (?, ?, ?, ?);",
            )
            .await?;
        stmt.execute(params![
            article_id,
            meta.response_file.clone(),
            meta.payload_bytes,
            meta.prompt_name.clone()
        ])
        .await?;

        let mut stmt = tx.prepare(sql::COMPLETE_ARTICLE).await?;
        let changes = stmt
            .execute(params![response.title_zh.clone(), article_id])
            .await?;
        if changes != 1 {
            return Err(StoreError::Transaction(format!(
                "article {article_id} vanished before completion"
            )));
        }

        tx.commit().await?;
        info!(article_id, "enrichment committed");
        Ok(())
    }
}
