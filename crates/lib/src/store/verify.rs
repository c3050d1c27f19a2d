//! The health report behind the verify phase.
//!
//! Read-only checks over the invariants every processed article must
//! satisfy: one linked image row, artifacts present for every tier, and
//! coordination columns in a consistent state.

use super::{sql, Store};
use crate::errors::StoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use turso::Value;

/// One failed invariant, with the ids it implicates.
#[derive(Debug, Clone, Serialize)]
pub struct HealthViolation {
    pub check: String,
    pub article_ids: Vec<String>,
}

/// The verify phase's output.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub table_counts: BTreeMap<String, i64>,
    pub violations: Vec<HealthViolation>,
}

impl HealthReport {
    pub fn ok(&self) -> bool {
        self.violations.is_empty()
    }
}

fn id_is_well_formed(id: &str) -> bool {
    id.len() == 10 && id.bytes().all(|b| b.is_ascii_digit()) && &id[8..] != "00"
}

/// Checks that must return zero rows on a healthy store. Each yields the
/// offending article ids.
const INVARIANT_CHECKS: &[(&str, &str)] = &[
    (
        "article_without_image_row",
        "SELECT a.id FROM articles a
         LEFT JOIN article_images i ON i.image_id = a.image_id AND i.article_id = a.id
         WHERE i.image_id IS NULL;",
    ),
    (
        "article_with_multiple_image_rows",
        "SELECT article_id FROM article_images
         GROUP BY article_id HAVING COUNT(*) > 1;",
    ),
    (
        "processed_but_still_in_progress",
        "SELECT id FROM articles
         WHERE deepseek_processed = 1 AND deepseek_in_progress = 1;",
    ),
    (
        "processed_without_summaries",
        "SELECT a.id FROM articles a
         WHERE a.deepseek_processed = 1
           AND NOT EXISTS (SELECT 1 FROM article_summaries s WHERE s.article_id = a.id);",
    ),
    (
        "processed_without_keywords",
        "SELECT a.id FROM articles a
         WHERE a.deepseek_processed = 1
           AND NOT EXISTS (SELECT 1 FROM keywords k WHERE k.article_id = a.id);",
    ),
    (
        "processed_without_questions",
        "SELECT a.id FROM articles a
         WHERE a.deepseek_processed = 1
           AND NOT EXISTS (SELECT 1 FROM questions q WHERE q.article_id = a.id);",
    ),
    (
        "processed_without_choices",
        "SELECT DISTINCT a.id FROM articles a
         JOIN questions q ON q.article_id = a.id
         WHERE a.deepseek_processed = 1
           AND NOT EXISTS (SELECT 1 FROM choices c WHERE c.question_id = q.id);",
    ),
    (
        "processed_without_background",
        "SELECT a.id FROM articles a
         WHERE a.deepseek_processed = 1
           AND NOT EXISTS (SELECT 1 FROM background_read b WHERE b.article_id = a.id);",
    ),
    (
        "processed_without_mid_and_hard_analysis",
        "SELECT a.id FROM articles a
         WHERE a.deepseek_processed = 1
           AND (SELECT COUNT(DISTINCT difficulty) FROM article_analysis an
                WHERE an.article_id = a.id
                  AND an.difficulty IN ('mid', 'hard')) < 2;",
    ),
    (
        "processed_without_neutral_synthesis",
        "SELECT a.id FROM articles a
         WHERE a.deepseek_processed = 1
           AND NOT EXISTS (SELECT 1 FROM comments c
                           WHERE c.article_id = a.id
                             AND c.is_synthesis = 1
                             AND c.attitude = 'neutral');",
    ),
];

impl Store {
    /// Runs every invariant check plus an on-disk existence pass over
    /// the recorded rendition paths.
    pub async fn health_report(&self) -> Result<HealthReport, StoreError> {
        let conn = self.connect().await?;
        let mut violations = Vec::new();

        // Semantic id shape: eight date digits plus a counter in 01-99.
        let mut rows = conn.query("SELECT id FROM articles;", ()).await?;
        let mut malformed = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            if !id_is_well_formed(&id) {
                malformed.push(id);
            }
        }
        if !malformed.is_empty() {
            violations.push(HealthViolation {
                check: "malformed_article_id".to_string(),
                article_ids: malformed,
            });
        }

        for (check, query) in INVARIANT_CHECKS {
            let mut rows = conn.query(query, ()).await?;
            let mut article_ids = Vec::new();
            while let Some(row) = rows.next().await? {
                if let Ok(Value::Text(id)) = row.get_value(0) {
                    article_ids.push(id);
                }
            }
            if !article_ids.is_empty() {
                violations.push(HealthViolation {
                    check: check.to_string(),
                    article_ids,
                });
            }
        }

        // Rendition files recorded in the store must exist on disk.
        let mut rows = conn
            .query(
                "SELECT article_id, local_location, small_location
                 FROM article_images
                 WHERE local_location IS NOT NULL;",
                (),
            )
            .await?;
        let mut missing_files = Vec::new();
        while let Some(row) = rows.next().await? {
            let article_id: String = row.get(0)?;
            let local: String = row.get(1)?;
            let small = match row.get_value(2)? {
                Value::Text(s) => Some(s),
                _ => None,
            };
            if !Path::new(&local).exists()
                || small.as_deref().is_some_and(|s| !Path::new(s).exists())
            {
                missing_files.push(article_id);
            }
        }
        if !missing_files.is_empty() {
            violations.push(HealthViolation {
                check: "rendition_file_missing".to_string(),
                article_ids: missing_files,
            });
        }

        let mut table_counts = BTreeMap::new();
        for table in sql::COUNTED_TABLES {
            let mut rows = conn
                .query(&format!("SELECT COUNT(*) FROM {table};"), ())
                .await?;
            if let Some(row) = rows.next().await? {
                table_counts.insert(table.to_string(), row.get(0)?);
            }
        }

        Ok(HealthReport {
            table_counts,
            violations,
        })
    }
}
