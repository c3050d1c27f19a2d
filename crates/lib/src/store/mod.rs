//! The relational store.
//!
//! Every pipeline stage coordinates exclusively through this layer: the
//! crawler inserts articles and image rows, the image stage fills in
//! rendition paths, the enrichment orchestrator claims articles via the
//! compare-and-set and commits artifacts. The store exposes typed
//! operations only; no other crate writes SQL.

mod enrichment;
pub mod sql;
mod verify;

pub use enrichment::ResponseMeta;
pub use verify::{HealthReport, HealthViolation};

use crate::errors::StoreError;
use crate::types::{
    Category, EnrichCandidate, Feed, InsertedArticle, NewArticle, NewImage, PendingImage,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use turso::{params, Connection, Database, Value};

/// A handle to the pipeline database.
///
/// Wraps a `turso::Database`, which manages its own connection pool and
/// is cheap to clone; clones share the same underlying database.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Opens (or creates) the database at `db_path` and switches it to
    /// WAL mode. Use ":memory:" for an isolated in-memory instance.
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
            }
        }
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self { db };

        // WAL is a persistent database setting, switched once here. The
        // PRAGMA returns a row, so it must go through `query`.
        let conn = store.connect().await?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(store)
    }

    /// The underlying database handle, for tests and the driver.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Opens a connection with foreign-key enforcement on. The pragma is
    /// per-connection and defaults off, so it has to be re-issued for
    /// every connection, not just once at open time.
    async fn connect(&self) -> Result<Connection, StoreError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.execute("PRAGMA foreign_keys=ON;", ())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(conn)
    }

    /// Executes the embedded schema bootstrap. Idempotent; safe to call
    /// on every start-up.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect().await?;
        for statement in sql::schema_statements(sql::SCHEMA_SQL) {
            conn.execute(&statement, ())
                .await
                .map_err(|e| StoreError::Bootstrap(format!("{statement}: {e}")))?;
        }
        Ok(())
    }

    /// Applies seed rows from a `{table: [row objects]}` JSON document,
    /// skipping rows that already exist, and returns the number of rows
    /// inserted.
    pub async fn apply_seed(&self, seed_json: &str) -> Result<usize, StoreError> {
        let seed: BTreeMap<String, Vec<serde_json::Map<String, serde_json::Value>>> =
            serde_json::from_str(seed_json)?;
        let conn = self.connect().await?;
        let mut inserted = 0usize;
        for (table, rows) in seed {
            for row in rows {
                let columns: Vec<&str> = row.keys().map(String::as_str).collect();
                let placeholders = columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
                let statement = format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders})
                     ON CONFLICT DO NOTHING;",
                    columns.join(", ")
                );
                let values: Vec<Value> = row.values().map(json_to_value).collect();
                let changes = conn.execute(&statement, values).await?;
                inserted += changes as usize;
            }
        }
        debug!(inserted, "seed data applied");
        Ok(inserted)
    }

    /// Convenience bootstrap: schema plus the embedded default seed.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.initialize_schema().await?;
        self.apply_seed(sql::SEED_JSON).await?;
        Ok(())
    }

    /// Enabled feeds in stable feed_id order.
    pub async fn enabled_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        let conn = self.connect().await?;
        let mut rows = conn.query(sql::SELECT_ENABLED_FEEDS, ()).await?;
        let mut feeds = Vec::new();
        while let Some(row) = rows.next().await? {
            feeds.push(Feed {
                feed_id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                category_id: row.get(3)?,
                enabled: row.get::<i64>(4)? != 0,
            });
        }
        Ok(feeds)
    }

    /// All categories in stable order.
    pub async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let conn = self.connect().await?;
        let mut rows = conn.query(sql::SELECT_CATEGORIES, ()).await?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next().await? {
            categories.push(Category {
                category_id: row.get(0)?,
                name: row.get(1)?,
                prompt_name: row.get(2)?,
            });
        }
        Ok(categories)
    }

    /// Inserts an article and its image row as one transaction.
    ///
    /// The semantic `YYYYMMDDnn` id is allocated here, from the count of
    /// same-day rows. The image row is created and linked back to the
    /// article inside the same transaction; there is no observable state
    /// where one exists without the other.
    ///
    /// The calendar date is local time, by design.
    pub async fn insert_article_with_image(
        &self,
        article: &NewArticle,
        image: &NewImage,
        image_dir: &Path,
    ) -> Result<InsertedArticle, StoreError> {
        let mut conn = self.connect().await?;
        let tx = conn.transaction().await?;

        let mut stmt = tx.prepare(sql::SELECT_ARTICLE_URL_EXISTS).await?;
        if stmt
            .query(params![article.url.clone()])
            .await?
            .next()
            .await?
            .is_some()
        {
            return Err(StoreError::Uniqueness(article.url.clone()));
        }

        let date = chrono::Local::now().format("%Y%m%d").to_string();
        let mut stmt = tx.prepare(sql::COUNT_SAME_DAY_ARTICLES).await?;
        let mut rows = stmt.query(params![format!("{date}%")]).await?;
        let same_day: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        let counter = same_day + 1;
        if counter > 99 {
            return Err(StoreError::CapacityExceeded { date });
        }
        let id = format!("{date}{counter:02}");

        let mut stmt = tx.prepare(sql::INSERT_ARTICLE).await?;
        stmt.execute(params![
            id.clone(),
            article.title.clone(),
            article.source.clone(),
            article.url.clone(),
            article.description.clone(),
            article.pub_date.clone().unwrap_or_default(),
            article.content.clone(),
            article.category_id
        ])
        .await
        .map_err(map_constraint)?;

        let image_name = format!("{id}.{}", image.extension);
        let web_rendition_path = image_dir.join(&image_name).to_string_lossy().to_string();
        let mut stmt = tx.prepare(sql::INSERT_IMAGE).await?;
        let mut rows = stmt
            .query(params![
                id.clone(),
                image_name,
                image.original_url.clone(),
                web_rendition_path.clone()
            ])
            .await?;
        let image_id: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => {
                return Err(StoreError::Transaction(
                    "image insert returned no id".to_string(),
                ))
            }
        };

        let mut stmt = tx.prepare(sql::LINK_ARTICLE_IMAGE).await?;
        stmt.execute(params![image_id, id.clone()]).await?;

        tx.commit().await?;
        info!(article_id = %id, image_id, "article committed");

        Ok(InsertedArticle {
            id,
            image_id,
            web_rendition_path,
        })
    }

    /// Compensating delete for an article whose image bytes could not be
    /// written after the commit. Cascades to the image row.
    pub async fn delete_article(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connect().await?;
        conn.execute("DELETE FROM article_images WHERE article_id = ?;", [id])
            .await?;
        conn.execute("DELETE FROM articles WHERE id = ?;", [id])
            .await?;
        Ok(())
    }

    /// The claim compare-and-set. Returns true when this caller won the
    /// row; false means another worker holds it or it is already done.
    pub async fn claim_article(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.connect().await?;
        let changes = conn.execute(sql::CLAIM_ARTICLE, [id]).await?;
        Ok(changes == 1)
    }

    /// Resets claims left behind by a dead process. Run at orchestrator
    /// start-up, before any claiming begins.
    pub async fn release_stale_claims(&self) -> Result<u64, StoreError> {
        let conn = self.connect().await?;
        let released = conn.execute(sql::RELEASE_STALE_CLAIMS, ()).await?;
        if released > 0 {
            info!(released, "stale claims released");
        }
        Ok(released)
    }

    /// Unprocessed articles with their category prompt names, ordered by
    /// (category_id, id) for deterministic processing.
    pub async fn unprocessed_articles(&self) -> Result<Vec<EnrichCandidate>, StoreError> {
        let conn = self.connect().await?;
        let mut rows = conn.query(sql::SELECT_UNPROCESSED, ()).await?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next().await? {
            candidates.push(EnrichCandidate {
                id: row.get(0)?,
                title: row.get(1)?,
                description: text_or_empty(row.get_value(2)?),
                content: row.get(3)?,
                category_id: row.get(4)?,
                prompt_name: row.get(5)?,
            });
        }
        Ok(candidates)
    }

    /// Records an enrichment failure and releases the claim.
    pub async fn fail_article(&self, id: &str, error: &str) -> Result<(), StoreError> {
        let conn = self.connect().await?;
        conn.execute(sql::FAIL_ARTICLE, params![error, id]).await?;
        Ok(())
    }

    /// Image rows awaiting their mobile rendition, optionally resuming
    /// past the checkpointed filename.
    pub async fn pending_images(
        &self,
        after_filename: Option<&str>,
    ) -> Result<Vec<PendingImage>, StoreError> {
        let conn = self.connect().await?;
        let mut rows = match after_filename {
            Some(name) => {
                let mut id_rows = conn.query(sql::SELECT_IMAGE_ID_BY_NAME, [name]).await?;
                let last_id: i64 = match id_rows.next().await? {
                    Some(row) => row.get(0)?,
                    None => 0,
                };
                conn.query(sql::SELECT_PENDING_IMAGES_AFTER, params![last_id])
                    .await?
            }
            None => conn.query(sql::SELECT_PENDING_IMAGES, ()).await?,
        };

        let mut pending = Vec::new();
        while let Some(row) = rows.next().await? {
            pending.push(PendingImage {
                image_id: row.get(0)?,
                article_id: row.get(1)?,
                image_name: row.get(2)?,
                local_location: row.get(3)?,
            });
        }
        Ok(pending)
    }

    /// Records both rendition paths for an image row.
    pub async fn finish_image(
        &self,
        image_id: i64,
        local_location: &str,
        small_location: &str,
    ) -> Result<(), StoreError> {
        let conn = self.connect().await?;
        conn.execute(
            sql::FINISH_IMAGE,
            params![local_location, small_location, image_id],
        )
        .await?;
        Ok(())
    }

    /// Reads a named API key. Empty keys are treated as missing.
    pub async fn api_key(&self, name: &str) -> Result<String, StoreError> {
        let conn = self.connect().await?;
        let mut rows = conn.query(sql::SELECT_API_KEY, [name]).await?;
        match rows.next().await? {
            Some(row) => {
                let key: String = row.get(0)?;
                if key.is_empty() {
                    Err(StoreError::NotFound(format!("apikey '{name}' is empty")))
                } else {
                    Ok(key)
                }
            }
            None => Err(StoreError::NotFound(format!("apikey '{name}'"))),
        }
    }

    /// Per-table row counts for the pipeline results summary.
    pub async fn table_counts(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let conn = self.connect().await?;
        let mut counts = BTreeMap::new();
        for table in sql::COUNTED_TABLES {
            let mut rows = conn
                .query(&format!("SELECT COUNT(*) FROM {table};"), ())
                .await?;
            if let Some(row) = rows.next().await? {
                counts.insert(table.to_string(), row.get(0)?);
            }
        }
        Ok(counts)
    }

    /// Deletes all pipeline-owned rows, children first, in a single
    /// transaction. Configuration and user tables are untouched.
    pub async fn purge_pipeline_data(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let mut conn = self.connect().await?;
        let tx = conn.transaction().await?;
        let mut deleted = BTreeMap::new();
        for table in sql::PURGE_TABLES {
            let mut stmt = tx.prepare(&format!("DELETE FROM {table};")).await?;
            let changes = stmt.execute(()).await?;
            deleted.insert(table.to_string(), changes);
        }
        tx.commit().await?;
        info!(?deleted, "pipeline data purged");
        Ok(deleted)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

fn text_or_empty(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        _ => String::new(),
    }
}

/// Maps turso constraint failures onto the store taxonomy.
fn map_constraint(err: turso::Error) -> StoreError {
    let message = err.to_string();
    if message.contains("UNIQUE constraint") {
        StoreError::Uniqueness(message)
    } else if message.contains("FOREIGN KEY constraint") {
        StoreError::ForeignKey(message)
    } else {
        StoreError::Database(err)
    }
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(*b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}
