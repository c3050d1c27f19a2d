//! Integration tests for the enrichment orchestrator: the happy path,
//! idempotent re-runs, and the failure surfaces around parsing and
//! validation.

mod common;

use anyhow::Result;
use common::{insert_plain_article, scalar, test_store, valid_response, ScriptedProvider};
use newsloom::enrich::{run_enrichment, EnrichOptions};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn options(dir: &TempDir) -> EnrichOptions {
    EnrichOptions {
        workers: 1,
        request_delay: Duration::ZERO,
        sample_rate: 1,
        random_seed: 7,
        reset_stale_claims: true,
        response_dir: dir.path().join("website/article_response"),
        raw_response_dir: dir.path().join("responses"),
    }
}

#[tokio::test]
async fn valid_response_is_persisted_across_all_artifact_tables() -> Result<()> {
    // --- Arrange ---
    let store = test_store().await?;
    insert_plain_article(&store, "2025102401", 1).await?;
    let dir = TempDir::new()?;
    let provider = ScriptedProvider::new(valid_response("2025102401").to_string());

    // --- Act ---
    let report = run_enrichment(store.clone(), Arc::new(provider.clone()), options(&dir)).await?;

    // --- Assert ---
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(provider.calls(), 1);

    let processed = scalar(
        &store,
        "SELECT deepseek_processed FROM articles WHERE id = '2025102401'",
    )
    .await?;
    assert_eq!(processed, 1);
    assert_eq!(
        scalar(
            &store,
            "SELECT deepseek_in_progress FROM articles WHERE id = '2025102401'"
        )
        .await?,
        0
    );

    // Four summaries: easy, mid, hard, zh_hard.
    assert_eq!(
        scalar(&store, "SELECT COUNT(*) FROM article_summaries").await?,
        4
    );
    // Ten keywords per English tier.
    assert_eq!(scalar(&store, "SELECT COUNT(*) FROM keywords").await?, 30);
    // 8 + 10 + 12 questions, four choices each.
    assert_eq!(scalar(&store, "SELECT COUNT(*) FROM questions").await?, 30);
    assert_eq!(scalar(&store, "SELECT COUNT(*) FROM choices").await?, 120);
    // Two perspectives plus one synthesis per tier.
    assert_eq!(scalar(&store, "SELECT COUNT(*) FROM comments").await?, 9);
    assert_eq!(
        scalar(
            &store,
            "SELECT COUNT(*) FROM comments WHERE is_synthesis = 1 AND attitude = 'neutral'"
        )
        .await?,
        3
    );
    assert_eq!(
        scalar(&store, "SELECT COUNT(*) FROM background_read").await?,
        3
    );
    assert_eq!(
        scalar(&store, "SELECT COUNT(*) FROM article_analysis").await?,
        2
    );
    assert_eq!(scalar(&store, "SELECT COUNT(*) FROM response").await?, 1);

    let response_file = dir
        .path()
        .join("website/article_response/article_2025102401_response.json");
    assert!(response_file.exists());
    Ok(())
}

#[tokio::test]
async fn rerun_after_completion_makes_no_llm_calls() -> Result<()> {
    let store = test_store().await?;
    insert_plain_article(&store, "2025102401", 1).await?;
    let dir = TempDir::new()?;
    let provider = ScriptedProvider::new(valid_response("2025102401").to_string());

    run_enrichment(store.clone(), Arc::new(provider.clone()), options(&dir)).await?;
    let second = run_enrichment(store.clone(), Arc::new(provider.clone()), options(&dir)).await?;

    assert_eq!(second.candidates, 0);
    assert_eq!(provider.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn non_json_body_saves_raw_response_and_records_failure() -> Result<()> {
    // --- Arrange ---
    let store = test_store().await?;
    insert_plain_article(&store, "2025102401", 1).await?;
    let dir = TempDir::new()?;
    let provider = ScriptedProvider::new("not json");

    // --- Act ---
    let report = run_enrichment(store.clone(), Arc::new(provider), options(&dir)).await?;

    // --- Assert ---
    assert_eq!(report.failed, 1);
    let raw = dir.path().join("responses/raw_response_2025102401.txt");
    assert_eq!(std::fs::read_to_string(raw)?, "not json");

    assert_eq!(
        scalar(
            &store,
            "SELECT deepseek_failed FROM articles WHERE id = '2025102401'"
        )
        .await?,
        1
    );
    assert_eq!(
        scalar(
            &store,
            "SELECT deepseek_in_progress FROM articles WHERE id = '2025102401'"
        )
        .await?,
        0
    );
    assert_eq!(
        scalar(
            &store,
            "SELECT deepseek_processed FROM articles WHERE id = '2025102401'"
        )
        .await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn biased_synthesis_fails_validation_and_persists_nothing() -> Result<()> {
    let store = test_store().await?;
    insert_plain_article(&store, "2025102401", 1).await?;
    let dir = TempDir::new()?;

    let mut body = valid_response("2025102401");
    body["perspectives_mid"]["synthesis"]["attitude"] = "positive".into();
    let provider = ScriptedProvider::new(body.to_string());

    let report = run_enrichment(store.clone(), Arc::new(provider), options(&dir)).await?;

    assert_eq!(report.failed, 1);
    assert_eq!(
        scalar(&store, "SELECT COUNT(*) FROM article_summaries").await?,
        0
    );
    assert_eq!(scalar(&store, "SELECT COUNT(*) FROM comments").await?, 0);
    let last_error = {
        let conn = store.db().connect()?;
        let mut rows = conn
            .query(
                "SELECT deepseek_last_error FROM articles WHERE id = '2025102401'",
                (),
            )
            .await?;
        let row = rows.next().await?.unwrap();
        row.get::<String>(0)?
    };
    assert!(last_error.contains("neutral"));
    Ok(())
}

#[tokio::test]
async fn out_of_band_summary_is_rejected() -> Result<()> {
    let store = test_store().await?;
    insert_plain_article(&store, "2025102401", 1).await?;
    let dir = TempDir::new()?;

    let mut body = valid_response("2025102401");
    body["summary_easy"] = "far too short".into();
    let provider = ScriptedProvider::new(body.to_string());

    let report = run_enrichment(store.clone(), Arc::new(provider), options(&dir)).await?;

    assert_eq!(report.failed, 1);
    assert_eq!(
        scalar(&store, "SELECT COUNT(*) FROM article_summaries").await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn sampling_gate_limits_the_selected_set() -> Result<()> {
    let store = test_store().await?;
    for n in 1..=6 {
        insert_plain_article(&store, &format!("202510240{n}"), 1).await?;
    }
    let dir = TempDir::new()?;
    let provider = ScriptedProvider::new(valid_response("ignored").to_string());

    let mut opts = options(&dir);
    opts.sample_rate = 3;
    let report = run_enrichment(store.clone(), Arc::new(provider.clone()), opts).await?;

    assert_eq!(report.candidates, 6);
    assert_eq!(report.sampled_out + report.processed + report.failed, 6);
    assert_eq!(provider.calls(), report.processed);
    Ok(())
}
