//! # newsloom-crawler
//!
//! The mining stage: one worker per enabled feed, each under a hard
//! wall-clock deadline. A worker parses its RSS feed, walks the top
//! candidates in order, cleans each article page, selects and downloads
//! a representative image, and commits the article + image pair as a
//! single transaction. Articles without an acceptable image are skipped
//! entirely — preview-first, nothing half-recorded.

pub mod imagepick;

use newsloom::config::{Config, CrawlMode};
use newsloom::errors::{ImageError, StoreError};
use newsloom::store::Store;
use newsloom::types::{Feed, NewArticle, NewImage};
use newsloom_clean::{CleanOptions, CleanOutcome, Cleaner, LengthGate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rss::Channel;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Feed candidates considered per run.
const CANDIDATE_POOL: usize = 20;

/// Per-feed failures. One feed failing never touches the others.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed fetch failed: {0}")]
    Network(String),
    #[error("Feed parse failed: {0}")]
    Parse(String),
    #[error("Feed exceeded its {0} second budget")]
    Timeout(u64),
}

/// Fatal crawl errors; anything per-feed or per-article stays in the report.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("Filter configuration rejected: {0}")]
    Clean(#[from] newsloom_clean::CleanError),
}

/// Outcome of one feed worker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedSummary {
    pub feed_name: String,
    pub accepted: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

/// Outcome of one crawl pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub feeds: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub feed_failures: usize,
    pub per_feed: Vec<FeedSummary>,
}

struct CrawlContext {
    store: Store,
    client: reqwest::Client,
    global_cleaner: Cleaner,
    sport_cleaner: Cleaner,
    prompt_names: HashMap<i64, String>,
    articles_per_seed: usize,
    min_image_bytes: u64,
    sample_rate: u32,
    random_seed: u64,
    image_dir: PathBuf,
}

/// Runs one crawl pass over every enabled feed.
pub async fn run_crawl(store: Store, config: &Config) -> Result<CrawlReport, CrawlError> {
    let thresholds = &config.thresholds;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(thresholds.http_timeout))
        .user_agent("newsloom/0.1")
        .build()
        .map_err(CrawlError::ClientBuild)?;

    let global_cleaner = Cleaner::new(
        CleanOptions {
            paragraph_min_length: thresholds.paragraph_min_length,
            length_gate: LengthGate::Global {
                min: thresholds.cleaned_chars_min_global,
                max: thresholds.cleaned_chars_max_global,
            },
            promo_brands: Vec::new(),
        },
        &config.banned_words,
    )?;
    // Quick runs relax the sport floor; batch and collection use strict.
    let sport_min = if config.crawl_mode == CrawlMode::Quick {
        thresholds.sport_relaxed_min_chars
    } else {
        thresholds.sport_strict_min_chars
    };
    let sport_cleaner = Cleaner::new(
        CleanOptions {
            paragraph_min_length: thresholds.paragraph_min_length,
            length_gate: LengthGate::Sport { min: sport_min },
            promo_brands: Vec::new(),
        },
        &config.banned_words,
    )?;

    let prompt_names: HashMap<i64, String> = store
        .categories()
        .await?
        .into_iter()
        .map(|c| (c.category_id, c.prompt_name))
        .collect();

    let feeds = store.enabled_feeds().await?;
    let per_feed_timeout = thresholds.per_feed_timeout;
    info!(feeds = feeds.len(), "crawl pass starting");

    let context = Arc::new(CrawlContext {
        store,
        client,
        global_cleaner,
        sport_cleaner,
        prompt_names,
        articles_per_seed: thresholds.articles_per_seed,
        min_image_bytes: thresholds.min_image_bytes(config.crawl_mode),
        sample_rate: thresholds.sample_rate,
        random_seed: thresholds.random_seed,
        image_dir: config.image_dir(),
    });
    std::fs::create_dir_all(&context.image_dir)
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    let mut handles = Vec::with_capacity(feeds.len());
    for feed in feeds {
        let context = context.clone();
        handles.push(tokio::spawn(async move {
            let name = feed.name.clone();
            match tokio::time::timeout(
                Duration::from_secs(per_feed_timeout),
                crawl_feed(&context, &feed),
            )
            .await
            {
                Ok(summary) => summary,
                Err(_) => {
                    // Deadline expired: committed articles stay, the rest
                    // of this feed's candidates are abandoned.
                    warn!(feed = %name, "feed exceeded its deadline");
                    FeedSummary {
                        feed_name: name,
                        error: Some(FeedError::Timeout(per_feed_timeout).to_string()),
                        ..Default::default()
                    }
                }
            }
        }));
    }

    let mut report = CrawlReport::default();
    for handle in handles {
        let summary = match handle.await {
            Ok(summary) => summary,
            Err(e) => FeedSummary {
                feed_name: "<panicked>".to_string(),
                error: Some(e.to_string()),
                ..Default::default()
            },
        };
        report.feeds += 1;
        report.accepted += summary.accepted;
        report.skipped += summary.skipped;
        if summary.error.is_some() {
            report.feed_failures += 1;
        }
        report.per_feed.push(summary);
    }

    info!(
        accepted = report.accepted,
        skipped = report.skipped,
        feed_failures = report.feed_failures,
        "crawl pass finished"
    );
    Ok(report)
}

async fn crawl_feed(context: &CrawlContext, feed: &Feed) -> FeedSummary {
    let mut summary = FeedSummary {
        feed_name: feed.name.clone(),
        ..Default::default()
    };

    let channel = match fetch_channel(&context.client, &feed.url).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!(feed = %feed.name, "feed failed: {e}");
            summary.error = Some(e.to_string());
            return summary;
        }
    };

    let sport = context
        .prompt_names
        .get(&feed.category_id)
        .is_some_and(|name| name == "sports");
    let cleaner = if sport {
        &context.sport_cleaner
    } else {
        &context.global_cleaner
    };

    let mut rng = StdRng::seed_from_u64(context.random_seed ^ feed.feed_id as u64);

    for item in channel.items().iter().take(CANDIDATE_POOL) {
        if summary.accepted >= context.articles_per_seed {
            break;
        }
        let (Some(title), Some(link)) = (item.title(), item.link()) else {
            continue;
        };
        if context.sample_rate > 1 && rng.gen_range(0..context.sample_rate) != 0 {
            continue;
        }

        match crawl_candidate(context, feed, cleaner, item, title, link).await {
            Ok(true) => summary.accepted += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                warn!(feed = %feed.name, url = link, "candidate failed: {e}");
                summary.skipped += 1;
            }
        }
    }

    info!(
        feed = %feed.name,
        accepted = summary.accepted,
        skipped = summary.skipped,
        "feed finished"
    );
    summary
}

async fn fetch_channel(client: &reqwest::Client, feed_url: &str) -> Result<Channel, FeedError> {
    info!("Fetching RSS feed from: {feed_url}");
    let content = client
        .get(feed_url)
        .send()
        .await
        .map_err(|e| FeedError::Network(e.to_string()))?
        .error_for_status()
        .map_err(|e| FeedError::Network(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| FeedError::Network(e.to_string()))?;
    Channel::read_from(&content[..]).map_err(|e| FeedError::Parse(e.to_string()))
}

/// Processes one feed entry. Returns Ok(true) on an accepted, committed
/// article; Ok(false) on a policy skip.
async fn crawl_candidate(
    context: &CrawlContext,
    feed: &Feed,
    cleaner: &Cleaner,
    item: &rss::Item,
    title: &str,
    link: &str,
) -> Result<bool, CrawlError> {
    let article_url = match Url::parse(link) {
        Ok(url) => url,
        Err(e) => {
            warn!(url = link, "unparseable item link: {e}");
            return Ok(false);
        }
    };

    let raw_html = match context.client.get(article_url.clone()).send().await {
        Ok(response) => match response.error_for_status() {
            Ok(response) => match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(url = link, "body read failed: {e}");
                    return Ok(false);
                }
            },
            Err(e) => {
                warn!(url = link, "article fetch failed: {e}");
                return Ok(false);
            }
        },
        Err(e) => {
            warn!(url = link, "article fetch failed: {e}");
            return Ok(false);
        }
    };

    let cleaned = match cleaner.clean(&raw_html, title) {
        CleanOutcome::Cleaned(cleaned) => cleaned,
        CleanOutcome::Rejected(reason) => {
            info!(url = link, reason = reason.as_str(), "article rejected");
            return Ok(false);
        }
    };

    let image = match acquire_image(context, &raw_html, &article_url).await {
        Ok(image) => image,
        Err(e) => {
            info!(url = link, "no acceptable image: {e}");
            return Ok(false);
        }
    };

    // Parse the pubDate (RFC 2822) into a sortable ISO 8601 form.
    let pub_date = item.pub_date().and_then(|date_str| {
        chrono::DateTime::parse_from_rfc2822(date_str)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .ok()
    });

    let article = NewArticle {
        title: newsloom_clean::normalize_text(title),
        source: feed.name.clone(),
        url: link.to_string(),
        description: newsloom_clean::normalize_text(item.description().unwrap_or_default()),
        pub_date,
        content: cleaned.normalized_text,
        category_id: feed.category_id,
    };
    let new_image = NewImage {
        original_url: image.url.to_string(),
        extension: image.extension,
    };

    let inserted = match context
        .store
        .insert_article_with_image(&article, &new_image, &context.image_dir)
        .await
    {
        Ok(inserted) => inserted,
        Err(StoreError::Uniqueness(_)) => {
            info!(url = link, reason = "duplicate_url", "article rejected");
            return Ok(false);
        }
        Err(StoreError::CapacityExceeded { date }) => {
            warn!(url = link, date = %date, "daily article capacity exceeded");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    // The bytes land only after the rows committed; a failed write
    // compensates by deleting the pair again.
    if let Err(e) = tokio::fs::write(&inserted.web_rendition_path, &image.bytes).await {
        warn!(article_id = %inserted.id, "image write failed, rolling back: {e}");
        context.store.delete_article(&inserted.id).await?;
        return Ok(false);
    }

    info!(article_id = %inserted.id, url = link, "article accepted");
    Ok(true)
}

/// Walks the candidate cascade; the first candidate passing the download
/// gates wins.
async fn acquire_image(
    context: &CrawlContext,
    raw_html: &str,
    article_url: &Url,
) -> Result<imagepick::DownloadedImage, ImageError> {
    let candidates = imagepick::select_candidates(raw_html, article_url);
    if candidates.is_empty() {
        return Err(ImageError::NoCandidate);
    }
    let mut last_error = ImageError::NoCandidate;
    for candidate in candidates {
        match imagepick::download_image(&context.client, &candidate, context.min_image_bytes).await
        {
            Ok(image) => return Ok(image),
            Err(e) => {
                info!(url = %candidate, "image candidate rejected: {e}");
                last_error = e;
            }
        }
    }
    Err(last_error)
}
