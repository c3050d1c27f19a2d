//! # newsloom-image
//!
//! The rendition stage: a single sequential worker over every image row
//! whose mobile rendition is missing. Each image gets a web rendition
//! (bounded, original format) and a mobile rendition (bounded, WebP,
//! under a 50 KB budget). A checkpoint file written after each
//! successful commit makes the stage resumable after a crash.

pub mod rendition;

use newsloom::errors::{ImageError, StoreError};
use newsloom::store::Store;
use newsloom::types::PendingImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ImageStageError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Checkpoint parse error: {0}")]
    Checkpoint(#[from] serde_json::Error),
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Rendition failed: {0}")]
    Render(#[from] ImageError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointCounts {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// The resumable progress marker, written after every successful
/// per-image commit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_processed_filename: Option<String>,
    pub timestamp: String,
    pub counts: CheckpointCounts,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self, ImageStageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, path: &Path) -> Result<(), ImageStageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn advance(&mut self, filename: &str, path: &Path) -> Result<(), ImageStageError> {
        self.last_processed_filename = Some(filename.to_string());
        self.timestamp = chrono::Local::now().to_rfc3339();
        self.save(path)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageStageReport {
    pub pending: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The mobile rendition path for a given web rendition path:
/// `<stem>_mobile.webp` alongside the original.
pub fn mobile_path(local_location: &str) -> PathBuf {
    let path = Path::new(local_location);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_mobile.webp"))
}

/// Runs the rendition stage, resuming past the checkpoint.
pub async fn run_image_stage(
    store: Store,
    checkpoint_path: &Path,
) -> Result<ImageStageReport, ImageStageError> {
    let mut checkpoint = Checkpoint::load(checkpoint_path)?;
    let pending = store
        .pending_images(checkpoint.last_processed_filename.as_deref())
        .await?;
    let mut report = ImageStageReport {
        pending: pending.len(),
        ..Default::default()
    };
    info!(pending = pending.len(), "image stage starting");

    for row in pending {
        let mobile = mobile_path(&row.local_location);
        let mobile_str = mobile.to_string_lossy().to_string();

        // Skip rule: an existing mobile file means the row was already
        // processed; record the paths and move the checkpoint along.
        if mobile.exists() {
            store
                .finish_image(row.image_id, &row.local_location, &mobile_str)
                .await?;
            report.skipped += 1;
            checkpoint.counts.skipped += 1;
            checkpoint.advance(&row.image_name, checkpoint_path)?;
            continue;
        }

        match process_image(&row, &mobile).await {
            Ok(()) => {
                store
                    .finish_image(row.image_id, &row.local_location, &mobile_str)
                    .await?;
                report.processed += 1;
                checkpoint.counts.processed += 1;
                checkpoint.advance(&row.image_name, checkpoint_path)?;
            }
            Err(e) => {
                // Record and continue; the row stays pending for a later
                // run.
                warn!(image = %row.image_name, "rendition failed: {e}");
                report.failed += 1;
                checkpoint.counts.failed += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "image stage finished"
    );
    Ok(report)
}

/// Produces both renditions for one image. Runs on the blocking pool;
/// decode and encode are CPU-bound.
async fn process_image(row: &PendingImage, mobile: &Path) -> Result<(), ImageStageError> {
    let local = PathBuf::from(&row.local_location);
    let mobile = mobile.to_path_buf();
    tokio::task::spawn_blocking(move || render_both(&local, &mobile)).await??;
    Ok(())
}

fn render_both(local: &Path, mobile: &Path) -> Result<(), ImageError> {
    let bytes = std::fs::read(local).map_err(|e| ImageError::Decode(e.to_string()))?;
    let decoded =
        image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;

    // Web rendition first: bounded, same format, overwriting the
    // original path. An already-fitting image is left untouched.
    if let Some(web) = rendition::bound(&decoded, rendition::WEB_MAX.0, rendition::WEB_MAX.1) {
        web.save(local).map_err(|e| ImageError::Encode(e.to_string()))?;
    }

    let mobile_rendition = rendition::encode_mobile(&decoded)?;
    std::fs::write(mobile, &mobile_rendition.bytes)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(())
}
