//! Phase execution: each pipeline phase runs under the same harness,
//! which captures its outcome, writes the per-phase log file, and feeds
//! the pipeline results summary.

use anyhow::Result;
use newsloom::config::Config;
use newsloom::enrich::{run_enrichment, EnrichOptions};
use newsloom::providers::ai::deepseek::DeepSeekProvider;
use newsloom::store::Store;
use newsloom_crawler::run_crawl;
use newsloom_image::run_image_stage;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

/// Outcome of one phase, as logged and as summarised on the console.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseResult {
    pub name: String,
    pub success: bool,
    pub headline: String,
    pub summary: serde_json::Value,
}

pub struct PhaseRunner {
    config: Config,
    run_ts: String,
    dry_run: bool,
}

impl PhaseRunner {
    pub fn new(config: Config, run_ts: String, dry_run: bool) -> Self {
        Self {
            config,
            run_ts,
            dry_run,
        }
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.config.site_root.join("image_stage_checkpoint.json")
    }

    /// Wraps a phase outcome: writes `log/phase_<name>_<ts>.log` and
    /// folds errors into a failed result instead of propagating them.
    fn finish(
        &self,
        name: &str,
        outcome: Result<(String, serde_json::Value)>,
    ) -> PhaseResult {
        let result = match outcome {
            Ok((headline, summary)) => PhaseResult {
                name: name.to_string(),
                success: true,
                headline,
                summary,
            },
            Err(e) => {
                error!(phase = name, "phase failed: {e:#}");
                PhaseResult {
                    name: name.to_string(),
                    success: false,
                    headline: format!("failed: {e:#}"),
                    summary: json!({ "error": format!("{e:#}") }),
                }
            }
        };

        let log_path = self
            .config
            .log_root
            .join(format!("phase_{}_{}.log", name, self.run_ts));
        let body = format!(
            "phase: {}\nstatus: {}\nsummary: {}\n",
            result.name,
            if result.success { "ok" } else { "failed" },
            result.summary
        );
        if let Err(e) = std::fs::write(&log_path, body) {
            error!(phase = name, "could not write phase log: {e}");
        }
        result
    }

    pub async fn run_purge(&self, store: &Store) -> PhaseResult {
        if self.dry_run {
            let outcome = async {
                let counts = store.table_counts().await?;
                Ok((
                    "dry run, nothing deleted".to_string(),
                    json!({ "would_delete": counts }),
                ))
            }
            .await;
            return self.finish("purge", outcome);
        }

        let outcome = async {
            let deleted = store.purge_pipeline_data().await?;
            for dir in [
                self.config.image_dir(),
                self.config.response_dir(),
                self.config.responses_root.clone(),
            ] {
                if dir.exists() {
                    std::fs::remove_dir_all(&dir)?;
                }
            }
            let checkpoint = self.checkpoint_path();
            if checkpoint.exists() {
                std::fs::remove_file(&checkpoint)?;
            }
            let total: u64 = deleted.values().sum();
            Ok((
                format!("{total} rows deleted"),
                json!({ "deleted": deleted }),
            ))
        }
        .await;
        self.finish("purge", outcome)
    }

    pub async fn run_mine(&self, store: &Store) -> PhaseResult {
        if self.dry_run {
            let outcome = async {
                let feeds = store.enabled_feeds().await?;
                Ok((
                    format!(
                        "dry run, would crawl {} feeds x {} articles",
                        feeds.len(),
                        self.config.thresholds.articles_per_seed
                    ),
                    json!({ "enabled_feeds": feeds.len() }),
                ))
            }
            .await;
            return self.finish("mine", outcome);
        }

        let outcome = async {
            let report = run_crawl(store.clone(), &self.config).await?;
            Ok((
                format!(
                    "{} accepted, {} skipped, {} feed failures",
                    report.accepted, report.skipped, report.feed_failures
                ),
                serde_json::to_value(&report)?,
            ))
        }
        .await;
        self.finish("mine", outcome)
    }

    pub async fn run_images(&self, store: &Store) -> PhaseResult {
        if self.dry_run {
            let outcome = async {
                let pending = store.pending_images(None).await?;
                Ok((
                    format!("dry run, {} images pending", pending.len()),
                    json!({ "pending": pending.len() }),
                ))
            }
            .await;
            return self.finish("images", outcome);
        }

        let outcome = async {
            let report = run_image_stage(store.clone(), &self.checkpoint_path()).await?;
            Ok((
                format!(
                    "{} processed, {} skipped, {} failed",
                    report.processed, report.skipped, report.failed
                ),
                serde_json::to_value(&report)?,
            ))
        }
        .await;
        self.finish("images", outcome)
    }

    pub async fn run_deepseek(
        &self,
        store: &Store,
        provider: Result<Arc<DeepSeekProvider>>,
    ) -> PhaseResult {
        if self.dry_run {
            let outcome = async {
                let candidates = store.unprocessed_articles().await?;
                Ok((
                    format!("dry run, {} articles unprocessed", candidates.len()),
                    json!({ "unprocessed": candidates.len() }),
                ))
            }
            .await;
            return self.finish("deepseek", outcome);
        }

        let outcome = async {
            let provider = provider?;
            let options = EnrichOptions::from_config(&self.config);
            let report = run_enrichment(store.clone(), provider, options).await?;
            Ok((
                format!(
                    "{} processed, {} failed, {} claim losses",
                    report.processed, report.failed, report.claim_lost
                ),
                serde_json::to_value(&report)?,
            ))
        }
        .await;
        self.finish("deepseek", outcome)
    }

    pub async fn run_verify(&self, store: &Store) -> PhaseResult {
        let outcome = async {
            let report = store.health_report().await?;
            let headline = if report.ok() {
                "all invariants hold".to_string()
            } else {
                format!("{} invariant violations", report.violations.len())
            };
            let ok = report.ok();
            let summary = serde_json::to_value(&report)?;
            if ok {
                Ok((headline, summary))
            } else {
                // A failing health report fails the phase but still
                // carries the full report in its log.
                anyhow::bail!("{headline}: {summary}")
            }
        }
        .await;
        self.finish("verify", outcome)
    }

    /// Writes `log/pipeline_results_<ts>.json`: per-table counts plus
    /// each phase's summary.
    pub async fn write_results(
        &self,
        store: &Store,
        results: &[PhaseResult],
    ) -> Result<PathBuf> {
        let path = self
            .config
            .log_root
            .join(format!("pipeline_results_{}.json", self.run_ts));
        let table_counts = store.table_counts().await?;
        let body = json!({
            "timestamp": self.run_ts,
            "table_counts": table_counts,
            "phases": results,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&body)?)?;
        Ok(path)
    }
}
