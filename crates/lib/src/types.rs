//! Shared row types exchanged between the store and the pipeline stages.

use serde::Serialize;

/// A configured feed source. Created once, never deleted by the pipeline.
#[derive(Debug, Clone)]
pub struct Feed {
    pub feed_id: i64,
    pub name: String,
    pub url: String,
    pub category_id: i64,
    pub enabled: bool,
}

/// A content category. `prompt_name` selects one of the fixed prompt
/// templates for every article the category produces.
#[derive(Debug, Clone)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
    pub prompt_name: String,
}

/// A canonical article ready for insertion. The semantic `YYYYMMDDnn` id
/// is allocated by the store inside the insertion transaction, never by
/// the caller.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub source: String,
    pub url: String,
    pub description: String,
    pub pub_date: Option<String>,
    pub content: String,
    pub category_id: i64,
}

/// Metadata of the image chosen for a new article. The rendition paths
/// are derived from the allocated article id by the store.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub original_url: String,
    /// File extension of the downloaded body, e.g. "jpg" or "webp".
    pub extension: String,
}

/// Result of a committed article + image insertion.
#[derive(Debug, Clone)]
pub struct InsertedArticle {
    pub id: String,
    pub image_id: i64,
    /// Where the crawler must write the downloaded image bytes.
    pub web_rendition_path: String,
}

/// An image row awaiting its mobile rendition.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub image_id: i64,
    pub article_id: String,
    pub image_name: String,
    pub local_location: String,
}

/// An unprocessed article, as handed to the enrichment orchestrator.
///
/// Serialized verbatim into the prompt's `{article_json}` placeholder.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichCandidate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(skip)]
    pub category_id: i64,
    #[serde(skip)]
    pub prompt_name: String,
}
