//! Process-wide configuration.
//!
//! The driver loads everything here exactly once at start-up and threads
//! an immutable [`Config`] to each stage. Nothing re-reads configuration
//! mid-run.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// A configuration loading problem.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Crawl mode, selecting the minimum acceptable image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlMode {
    /// Fast preview runs with small image tolerance.
    Quick,
    /// Normal batch mining.
    #[default]
    Batch,
    /// Full collection runs demanding the largest images.
    Collection,
}

/// The tunable threshold set, loadable from `thresholds.json`.
///
/// Every field has a compiled-in default so a missing file or a partial
/// file both behave predictably.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub paragraph_min_length: usize,
    pub cleaned_chars_min_global: usize,
    pub cleaned_chars_max_global: usize,
    pub sport_strict_min_chars: usize,
    pub sport_relaxed_min_chars: usize,
    pub collect_preview_min_image_bytes: u64,
    pub batch_min_image_bytes: u64,
    pub quick_min_image_bytes: u64,
    /// Hard wall-clock budget per feed, in seconds.
    pub per_feed_timeout: u64,
    /// Upper bound of accepted articles per feed per run.
    #[serde(alias = "num_per_source")]
    pub articles_per_seed: usize,
    /// 1-in-R sampling gate; 1 disables sampling.
    pub sample_rate: u32,
    /// Seed for the reproducible sampling gate.
    pub random_seed: u64,
    /// Per-request HTTP timeout for feed, page and image fetches, seconds.
    pub http_timeout: u64,
    /// Per-request deadline for LLM calls, seconds.
    pub llm_request_timeout: u64,
    /// Fixed inter-request sleep per enrichment worker, seconds.
    pub llm_request_delay_secs: u64,
    /// Size of the enrichment worker pool.
    pub llm_workers: usize,
    /// Reset `deepseek_in_progress=1, deepseek_processed=0` rows at
    /// orchestrator start-up.
    pub reset_stale_claims: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            paragraph_min_length: 30,
            cleaned_chars_min_global: 2300,
            cleaned_chars_max_global: 4500,
            sport_strict_min_chars: 1500,
            sport_relaxed_min_chars: 1200,
            collect_preview_min_image_bytes: 100 * 1024,
            batch_min_image_bytes: 70 * 1024,
            quick_min_image_bytes: 2 * 1024,
            per_feed_timeout: 240,
            articles_per_seed: 2,
            sample_rate: 1,
            random_seed: 20231024,
            http_timeout: 10,
            llm_request_timeout: 60,
            llm_request_delay_secs: 3,
            llm_workers: 1,
            reset_stale_claims: true,
        }
    }
}

impl Thresholds {
    /// Loads thresholds from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "thresholds file absent, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Minimum downloaded image size for the given crawl mode.
    pub fn min_image_bytes(&self, mode: CrawlMode) -> u64 {
        match mode {
            CrawlMode::Quick => self.quick_min_image_bytes,
            CrawlMode::Batch => self.batch_min_image_bytes,
            CrawlMode::Collection => self.collect_preview_min_image_bytes,
        }
    }
}

/// Loads the banned-word file: UTF-8, one word per line, `#` comments.
pub fn load_banned_words(path: &Path) -> Result<HashSet<String>, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "banned-words file absent, filter disabled");
        return Ok(HashSet::new());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_lowercase())
        .collect())
}

/// The immutable per-run configuration threaded to every stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub thresholds: Thresholds,
    pub banned_words: HashSet<String>,
    pub crawl_mode: CrawlMode,
    /// Root of the generated-content tree (`website/...`).
    pub site_root: PathBuf,
    /// Root of raw-response dumps written on parse failure.
    pub responses_root: PathBuf,
    /// Root of the phase log directory.
    pub log_root: PathBuf,
}

impl Config {
    /// Builds the run configuration from the working directory layout,
    /// honouring `NEWSLOOM_DB` and `NEWSLOOM_THRESHOLDS` overrides loaded
    /// from the environment (the driver calls `dotenvy::dotenv` first).
    pub fn load() -> Result<Self, ConfigError> {
        let db_path =
            std::env::var("NEWSLOOM_DB").unwrap_or_else(|_| "db/newsloom.db".to_string());
        let thresholds_path = std::env::var("NEWSLOOM_THRESHOLDS")
            .unwrap_or_else(|_| "config/thresholds.json".to_string());
        let banned_path = std::env::var("NEWSLOOM_BANNED_WORDS")
            .unwrap_or_else(|_| "config/banned_words.txt".to_string());

        let thresholds = Thresholds::load(Path::new(&thresholds_path))?;
        let banned_words = load_banned_words(Path::new(&banned_path))?;

        Ok(Self {
            db_path,
            thresholds,
            banned_words,
            crawl_mode: CrawlMode::Batch,
            site_root: PathBuf::from("website"),
            responses_root: PathBuf::from("responses"),
            log_root: PathBuf::from("log"),
        })
    }

    pub fn image_dir(&self) -> PathBuf {
        self.site_root.join("article_image")
    }

    pub fn response_dir(&self) -> PathBuf {
        self.site_root.join("article_response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let t = Thresholds::default();
        assert_eq!(t.paragraph_min_length, 30);
        assert_eq!(t.cleaned_chars_min_global, 2300);
        assert_eq!(t.cleaned_chars_max_global, 4500);
        assert_eq!(t.min_image_bytes(CrawlMode::Quick), 2 * 1024);
        assert_eq!(t.min_image_bytes(CrawlMode::Batch), 70 * 1024);
        assert_eq!(t.min_image_bytes(CrawlMode::Collection), 100 * 1024);
    }

    #[test]
    fn partial_thresholds_file_keeps_defaults_elsewhere() {
        let parsed: Thresholds =
            serde_json::from_str(r#"{"articles_per_seed": 5, "sample_rate": 3}"#).unwrap();
        assert_eq!(parsed.articles_per_seed, 5);
        assert_eq!(parsed.sample_rate, 3);
        assert_eq!(parsed.per_feed_timeout, 240);
    }

    #[test]
    fn num_per_source_alias_is_accepted() {
        let parsed: Thresholds = serde_json::from_str(r#"{"num_per_source": 4}"#).unwrap();
        assert_eq!(parsed.articles_per_seed, 4);
    }
}
