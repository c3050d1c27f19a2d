//! # newsloom-cli: the pipeline driver
//!
//! Composes the pipeline phases on operator demand. The driver loads
//! configuration exactly once, writes a log file per phase, and never
//! touches article data itself — it only supervises the stages and
//! reports what they did.

mod phases;

use anyhow::{bail, Result};
use clap::Parser;
use newsloom::config::Config;
use newsloom::providers::ai::deepseek::DeepSeekProvider;
use newsloom::store::Store;
use phases::{PhaseResult, PhaseRunner};
use std::fs::File;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "newsloom", version, about = "Content mining and enrichment pipeline")]
struct Cli {
    /// Run all phases in order: mine, images, deepseek, verify
    #[arg(long)]
    full: bool,
    /// Clean pipeline data and generated files (destructive)
    #[arg(long)]
    purge: bool,
    /// Run the crawler
    #[arg(long)]
    mine: bool,
    /// Run the image rendition stage
    #[arg(long)]
    images: bool,
    /// Run the LLM enrichment orchestrator
    #[arg(long)]
    deepseek: bool,
    /// Emit the health report
    #[arg(long)]
    verify: bool,
    /// Upper bound of accepted articles per feed
    #[arg(long)]
    articles_per_seed: Option<usize>,
    /// Preview only; no side effects
    #[arg(long)]
    dry_run: bool,
    /// Detailed log output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn selected_phases(&self) -> Vec<&'static str> {
        if self.full {
            return vec!["mine", "images", "deepseek", "verify"];
        }
        let mut phases = Vec::new();
        if self.purge {
            phases.push("purge");
        }
        if self.mine {
            phases.push("mine");
        }
        if self.images {
            phases.push("images");
        }
        if self.deepseek {
            phases.push("deepseek");
        }
        if self.verify {
            phases.push("verify");
        }
        phases
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let phases = cli.selected_phases();
    if phases.is_empty() {
        bail!("no phase selected; try --full, --mine, --images, --deepseek, --verify or --purge");
    }

    let mut config = Config::load()?;
    if let Some(n) = cli.articles_per_seed {
        config.thresholds.articles_per_seed = n;
    }

    let run_ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    std::fs::create_dir_all(&config.log_root)?;

    // All tracing output goes to the run log; the console only carries
    // the per-phase summaries.
    let log_file = File::create(config.log_root.join(format!("pipeline_{run_ts}.log")))?;
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = fmt::Subscriber::builder()
        .with_writer(log_file)
        .with_env_filter(filter)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(?phases, dry_run = cli.dry_run, "pipeline run starting");

    let store = Store::open(&config.db_path).await?;
    store.initialize().await?;

    let runner = PhaseRunner::new(config.clone(), run_ts.clone(), cli.dry_run);
    let mut results: Vec<PhaseResult> = Vec::new();
    for phase in &phases {
        let result = match *phase {
            "purge" => runner.run_purge(&store).await,
            "mine" => runner.run_mine(&store).await,
            "images" => runner.run_images(&store).await,
            "deepseek" => runner.run_deepseek(&store, build_provider(&store, &config).await).await,
            "verify" => runner.run_verify(&store).await,
            other => unreachable!("unknown phase {other}"),
        };
        let marker = if result.success { "✅" } else { "❌" };
        println!("{marker} phase {}: {}", result.name, result.headline);
        results.push(result);
    }

    if cli.full && !cli.dry_run {
        let results_path = runner.write_results(&store, &results).await?;
        println!("Results summary: {}", results_path.display());
    }
    println!(
        "Logs: {}",
        config.log_root.join(format!("pipeline_{run_ts}.log")).display()
    );

    if results.iter().any(|r| !r.success) {
        // A failed phase is the run's exit status.
        std::process::exit(1);
    }
    Ok(())
}

/// Wires the DeepSeek provider from the stored API key and the endpoint
/// configuration. Returning the error as a value lets the phase runner
/// report it as a phase failure instead of aborting the run.
async fn build_provider(
    store: &Store,
    config: &Config,
) -> Result<Arc<DeepSeekProvider>> {
    let api_key = store.api_key("DeepSeek").await?;
    let api_url = std::env::var("NEWSLOOM_LLM_URL")
        .unwrap_or_else(|_| "https://api.deepseek.com/v1/chat/completions".to_string());
    let model =
        std::env::var("NEWSLOOM_LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());
    let provider = DeepSeekProvider::new(
        api_url,
        api_key,
        model,
        config.thresholds.llm_request_timeout,
    )?;
    Ok(Arc::new(provider))
}
