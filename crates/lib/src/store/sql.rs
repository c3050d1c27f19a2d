//! SQL query strings used by the store.
//!
//! Centralised here so the access layer stays readable and the
//! database-specific syntax lives in one place.

/// The schema bootstrap file, CREATE TABLE statements delimited by
/// `-- [section]` headers.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Default seed rows applied with INSERT OR IGNORE on bootstrap.
pub const SEED_JSON: &str = include_str!("seed.json");

/// Splits the bootstrap file into executable statements, dropping
/// comment lines and section headers.
pub fn schema_statements(schema: &str) -> Vec<String> {
    schema
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(|stmt| format!("{stmt};"))
        .collect()
}

pub const SELECT_ENABLED_FEEDS: &str = "
    SELECT feed_id, name, url, category_id, enabled
    FROM feeds
    WHERE enabled = 1
    ORDER BY feed_id;
";

pub const SELECT_CATEGORIES: &str = "
    SELECT category_id, name, prompt_name
    FROM categories
    ORDER BY category_id;
";

pub const COUNT_SAME_DAY_ARTICLES: &str = "SELECT COUNT(*) FROM articles WHERE id LIKE ?;";

pub const SELECT_ARTICLE_URL_EXISTS: &str = "SELECT 1 FROM articles WHERE url = ? LIMIT 1;";

pub const INSERT_ARTICLE: &str = "
    INSERT INTO articles
        (id, title, source, url, description, pub_date, content, category_id)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?);
";

pub const INSERT_IMAGE: &str = "
    INSERT INTO article_images
        (article_id, image_name, original_url, local_location)
    VALUES (?, ?, ?, ?)
    RETURNING image_id;
";

pub const LINK_ARTICLE_IMAGE: &str = "UPDATE articles SET image_id = ? WHERE id = ?;";

/// The claim compare-and-set. Exactly one worker can win a given row;
/// the rows-affected count is the only signal.
pub const CLAIM_ARTICLE: &str = "
    UPDATE articles
    SET deepseek_in_progress = 1
    WHERE id = ?
      AND deepseek_processed = 0
      AND deepseek_in_progress = 0;
";

pub const RELEASE_STALE_CLAIMS: &str = "
    UPDATE articles
    SET deepseek_in_progress = 0
    WHERE deepseek_in_progress = 1
      AND deepseek_processed = 0;
";

pub const SELECT_UNPROCESSED: &str = "
    SELECT a.id, a.title, a.description, a.content, a.category_id, c.prompt_name
    FROM articles a
    JOIN categories c ON c.category_id = a.category_id
    WHERE a.deepseek_processed = 0
    ORDER BY a.category_id, a.id;
";

pub const FAIL_ARTICLE: &str = "
    UPDATE articles
    SET deepseek_failed = deepseek_failed + 1,
        deepseek_last_error = ?,
        deepseek_in_progress = 0
    WHERE id = ?;
";

pub const COMPLETE_ARTICLE: &str = "
    UPDATE articles
    SET deepseek_processed = 1,
        deepseek_in_progress = 0,
        deepseek_last_error = NULL,
        processed_at = CURRENT_TIMESTAMP,
        zh_title = ?
    WHERE id = ?;
";

pub const SELECT_PENDING_IMAGES: &str = "
    SELECT image_id, article_id, image_name, local_location
    FROM article_images
    WHERE small_location IS NULL AND local_location IS NOT NULL
    ORDER BY image_id;
";

pub const SELECT_IMAGE_ID_BY_NAME: &str =
    "SELECT COALESCE(MAX(image_id), 0) FROM article_images WHERE image_name = ?;";

pub const SELECT_PENDING_IMAGES_AFTER: &str = "
    SELECT image_id, article_id, image_name, local_location
    FROM article_images
    WHERE small_location IS NULL
      AND local_location IS NOT NULL
      AND image_id > ?
    ORDER BY image_id;
";

pub const FINISH_IMAGE: &str = "
    UPDATE article_images
    SET local_location = ?, small_location = ?
    WHERE image_id = ?;
";

pub const SELECT_API_KEY: &str = "SELECT key_value FROM apikey WHERE name = ?;";

/// Tables counted for the pipeline results summary, in report order.
pub const COUNTED_TABLES: &[&str] = &[
    "feeds",
    "categories",
    "articles",
    "article_images",
    "article_summaries",
    "keywords",
    "questions",
    "choices",
    "comments",
    "background_read",
    "article_analysis",
    "response",
];

/// Pipeline-owned tables cleared by the purge phase, children first.
/// Configuration and user tables are never purged.
pub const PURGE_TABLES: &[&str] = &[
    "choices",
    "questions",
    "keywords",
    "article_summaries",
    "comments",
    "background_read",
    "article_analysis",
    "response",
    "article_images",
    "articles",
];
