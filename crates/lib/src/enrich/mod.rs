//! The LLM enrichment orchestrator.
//!
//! Workers claim unprocessed articles through a single-statement
//! compare-and-set, call the provider under a deadline, validate the
//! structured response, and commit all artifacts in one transaction.
//! The claim CAS is the only cross-worker protocol; a failed article
//! returns to the unprocessed set with its failure counter incremented,
//! so the pipeline is self-healing across invocations.

pub mod response;

use crate::config::Config;
use crate::errors::{StoreError, StructureError};
use crate::prompts::{self, PromptName};
use crate::providers::ai::LlmProvider;
use crate::store::{ResponseMeta, Store};
use crate::types::EnrichCandidate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Fatal orchestrator errors. Per-article problems never surface here;
/// they are folded into the [`EnrichReport`].
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Orchestrator tuning, derived from the run configuration.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub workers: usize,
    pub request_delay: Duration,
    pub sample_rate: u32,
    pub random_seed: u64,
    pub reset_stale_claims: bool,
    /// Where validated response JSON files are written.
    pub response_dir: PathBuf,
    /// Where raw bodies are dumped on parse failure.
    pub raw_response_dir: PathBuf,
}

impl EnrichOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.thresholds.llm_workers.max(1),
            request_delay: Duration::from_secs(config.thresholds.llm_request_delay_secs),
            sample_rate: config.thresholds.sample_rate,
            random_seed: config.thresholds.random_seed,
            reset_stale_claims: config.thresholds.reset_stale_claims,
            response_dir: config.response_dir(),
            raw_response_dir: config.responses_root.clone(),
        }
    }
}

/// Summary of one orchestrator run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichReport {
    pub candidates: usize,
    pub sampled_out: usize,
    pub claim_lost: usize,
    pub processed: usize,
    pub failed: usize,
}

enum Outcome {
    Processed,
    Failed,
    ClaimLost,
}

/// Runs one enrichment pass over every unprocessed article.
pub async fn run_enrichment(
    store: Store,
    provider: Arc<dyn LlmProvider>,
    options: EnrichOptions,
) -> Result<EnrichReport, EnrichError> {
    if options.reset_stale_claims {
        store.release_stale_claims().await?;
    }
    std::fs::create_dir_all(&options.response_dir)?;
    std::fs::create_dir_all(&options.raw_response_dir)?;

    let candidates = store.unprocessed_articles().await?;
    let mut report = EnrichReport {
        candidates: candidates.len(),
        ..Default::default()
    };
    info!(candidates = candidates.len(), "enrichment pass starting");

    // The sampling gate is evaluated in candidate order with a fixed
    // seed, so a given run configuration always selects the same set.
    let mut rng = StdRng::seed_from_u64(options.random_seed);
    let selected: Vec<EnrichCandidate> = candidates
        .into_iter()
        .filter(|_| options.sample_rate <= 1 || rng.gen_range(0..options.sample_rate) == 0)
        .collect();
    report.sampled_out = report.candidates - selected.len();

    let semaphore = Arc::new(Semaphore::new(options.workers));
    let options = Arc::new(options);
    let mut handles = Vec::with_capacity(selected.len());

    for candidate in selected {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let store = store.clone();
        let provider = provider.clone();
        let options = options.clone();

        handles.push(tokio::spawn(async move {
            let outcome = process_candidate(&store, provider.as_ref(), &options, &candidate).await;
            // Rate shaping: each worker slot sleeps out the delay before
            // taking another article.
            if !options.request_delay.is_zero() {
                tokio::time::sleep(options.request_delay).await;
            }
            drop(permit);
            outcome
        }));
    }

    for handle in handles {
        match handle.await {
            Ok(Outcome::Processed) => report.processed += 1,
            Ok(Outcome::Failed) => report.failed += 1,
            Ok(Outcome::ClaimLost) => report.claim_lost += 1,
            Err(e) => {
                error!("enrichment task panicked: {e}");
                report.failed += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        failed = report.failed,
        claim_lost = report.claim_lost,
        sampled_out = report.sampled_out,
        "enrichment pass finished"
    );
    Ok(report)
}

async fn process_candidate(
    store: &Store,
    provider: &dyn LlmProvider,
    options: &EnrichOptions,
    candidate: &EnrichCandidate,
) -> Outcome {
    let id = candidate.id.as_str();
    match store.claim_article(id).await {
        Ok(true) => {}
        Ok(false) => return Outcome::ClaimLost,
        Err(e) => {
            error!(article_id = id, "claim failed: {e}");
            return Outcome::Failed;
        }
    }

    let prompt_name = PromptName::from_name(&candidate.prompt_name);
    let prompt = match prompts::render(prompt_name, candidate) {
        Ok(prompt) => prompt,
        Err(e) => return fail(store, id, &format!("prompt render: {e}")).await,
    };

    let body = match provider.enrich(&prompt).await {
        Ok(body) => body,
        Err(e) => {
            warn!(article_id = id, "LLM request failed: {e}");
            return fail(store, id, &e.to_string()).await;
        }
    };

    let parsed = match response::parse_response(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            if matches!(e, StructureError::NotJson(_)) {
                save_raw_body(options, id, &body);
            }
            warn!(article_id = id, "response rejected: {e}");
            return fail(store, id, &e.to_string()).await;
        }
    };

    if let Err(e) = parsed.validate() {
        warn!(article_id = id, "response invalid: {e}");
        return fail(store, id, &e.to_string()).await;
    }

    let response_file = options
        .response_dir
        .join(format!("article_{id}_response.json"));
    let pretty = match serde_json::to_string_pretty(&parsed) {
        Ok(pretty) => pretty,
        Err(e) => return fail(store, id, &format!("response serialization: {e}")).await,
    };
    if let Err(e) = std::fs::write(&response_file, &pretty) {
        return fail(store, id, &format!("response file write: {e}")).await;
    }

    let meta = ResponseMeta {
        response_file: response_file.to_string_lossy().to_string(),
        payload_bytes: body.len() as i64,
        prompt_name: prompt_name.as_str().to_string(),
    };
    if let Err(e) = store.complete_article(id, &parsed, &meta).await {
        error!(article_id = id, "completion transaction failed: {e}");
        return fail(store, id, &e.to_string()).await;
    }

    Outcome::Processed
}

/// Records the failure and releases the claim. Failing to record is
/// itself only logged: the row stays claimed and the stale-claim reset
/// recovers it on the next run.
async fn fail(store: &Store, id: &str, message: &str) -> Outcome {
    if let Err(e) = store.fail_article(id, message).await {
        error!(article_id = id, "failure bookkeeping failed: {e}");
    }
    Outcome::Failed
}

fn save_raw_body(options: &EnrichOptions, id: &str, body: &str) {
    let path = options
        .raw_response_dir
        .join(format!("raw_response_{id}.txt"));
    if let Err(e) = std::fs::write(&path, body) {
        warn!(article_id = id, "could not save raw response: {e}");
    }
}
