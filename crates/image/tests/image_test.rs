//! Integration tests for the rendition stage: the mobile budget, the
//! skip rule, and checkpoint resume.

use anyhow::Result;
use newsloom::types::{NewArticle, NewImage};
use newsloom_image::{mobile_path, run_image_stage, Checkpoint};
use newsloom_test_utils::TestSetup;
use std::path::Path;
use tempfile::TempDir;

fn gradient_jpeg(path: &Path, width: u32, height: u32) -> Result<()> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 7 % 256) as u8,
            (y * 13 % 256) as u8,
            ((x + y) * 3 % 256) as u8,
        ])
    });
    image::DynamicImage::ImageRgb8(img).save(path)?;
    Ok(())
}

async fn seed_article_with_image(
    setup: &TestSetup,
    n: usize,
    image_dir: &Path,
    width: u32,
    height: u32,
) -> Result<String> {
    let article = NewArticle {
        title: format!("Headline {n}"),
        source: "Test Wire".to_string(),
        url: format!("http://example.com/story-{n}"),
        description: "A story.".to_string(),
        pub_date: None,
        content: "Cleaned body.".to_string(),
        category_id: 1,
    };
    let image = NewImage {
        original_url: format!("http://example.com/img-{n}.jpg"),
        extension: "jpg".to_string(),
    };
    let inserted = setup
        .store
        .insert_article_with_image(&article, &image, image_dir)
        .await?;
    gradient_jpeg(Path::new(&inserted.web_rendition_path), width, height)?;
    Ok(inserted.web_rendition_path)
}

#[tokio::test]
async fn renditions_fit_their_boxes_and_the_mobile_budget() -> Result<()> {
    // --- Arrange ---
    let setup = TestSetup::new().await?;
    let dir = TempDir::new()?;
    let image_dir = dir.path().join("website/article_image");
    std::fs::create_dir_all(&image_dir)?;
    let web_path = seed_article_with_image(&setup, 1, &image_dir, 2000, 1500).await?;
    let checkpoint = dir.path().join("image_stage_checkpoint.json");

    // --- Act ---
    let report = run_image_stage(setup.store.clone(), &checkpoint).await?;

    // --- Assert ---
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let web = image::open(&web_path)?;
    assert!(web.width() <= 1024 && web.height() <= 768);

    let mobile = mobile_path(&web_path);
    assert!(mobile.exists());
    let mobile_meta = std::fs::metadata(&mobile)?;
    assert!(mobile_meta.len() <= 50 * 1024, "mobile rendition over budget");
    let decoded = image::open(&mobile)?;
    assert!(decoded.width() <= 600 && decoded.height() <= 450);

    let small_set = setup
        .count("SELECT COUNT(*) FROM article_images WHERE small_location IS NOT NULL")
        .await?;
    assert_eq!(small_set, 1);
    Ok(())
}

#[tokio::test]
async fn existing_mobile_file_is_skipped_not_reencoded() -> Result<()> {
    let setup = TestSetup::new().await?;
    let dir = TempDir::new()?;
    let image_dir = dir.path().join("website/article_image");
    std::fs::create_dir_all(&image_dir)?;
    let web_path = seed_article_with_image(&setup, 1, &image_dir, 800, 600).await?;

    // Pre-plant a mobile file: the stage must treat the row as done.
    let mobile = mobile_path(&web_path);
    std::fs::write(&mobile, b"sentinel")?;

    let checkpoint = dir.path().join("checkpoint.json");
    let report = run_image_stage(setup.store.clone(), &checkpoint).await?;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed, 0);
    assert_eq!(std::fs::read(&mobile)?, b"sentinel");
    let small_set = setup
        .count("SELECT COUNT(*) FROM article_images WHERE small_location IS NOT NULL")
        .await?;
    assert_eq!(small_set, 1);
    Ok(())
}

#[tokio::test]
async fn second_run_resumes_past_the_checkpoint() -> Result<()> {
    let setup = TestSetup::new().await?;
    let dir = TempDir::new()?;
    let image_dir = dir.path().join("website/article_image");
    std::fs::create_dir_all(&image_dir)?;
    seed_article_with_image(&setup, 1, &image_dir, 900, 700).await?;
    let checkpoint = dir.path().join("checkpoint.json");

    let first = run_image_stage(setup.store.clone(), &checkpoint).await?;
    assert_eq!(first.processed, 1);

    let saved = Checkpoint::load(&checkpoint)?;
    assert!(saved.last_processed_filename.is_some());
    assert_eq!(saved.counts.processed, 1);

    // Everything already done: nothing pending past the checkpoint.
    let second = run_image_stage(setup.store.clone(), &checkpoint).await?;
    assert_eq!(second.pending, 0);
    assert_eq!(second.processed, 0);
    Ok(())
}

#[tokio::test]
async fn small_source_keeps_its_dimensions() -> Result<()> {
    let setup = TestSetup::new().await?;
    let dir = TempDir::new()?;
    let image_dir = dir.path().join("website/article_image");
    std::fs::create_dir_all(&image_dir)?;
    let web_path = seed_article_with_image(&setup, 1, &image_dir, 320, 240).await?;
    let checkpoint = dir.path().join("checkpoint.json");

    run_image_stage(setup.store.clone(), &checkpoint).await?;

    // Never upscaled, neither rendition.
    let web = image::open(&web_path)?;
    assert_eq!((web.width(), web.height()), (320, 240));
    let mobile = image::open(mobile_path(&web_path))?;
    assert_eq!((mobile.width(), mobile.height()), (320, 240));
    Ok(())
}

#[tokio::test]
async fn unreadable_file_is_recorded_and_the_stage_continues() -> Result<()> {
    let setup = TestSetup::new().await?;
    let dir = TempDir::new()?;
    let image_dir = dir.path().join("website/article_image");
    std::fs::create_dir_all(&image_dir)?;

    // First image is corrupt, second is fine.
    let bad_path = seed_article_with_image(&setup, 1, &image_dir, 800, 600).await?;
    std::fs::write(&bad_path, b"not an image")?;
    seed_article_with_image(&setup, 2, &image_dir, 800, 600).await?;

    let checkpoint = dir.path().join("checkpoint.json");
    let report = run_image_stage(setup.store.clone(), &checkpoint).await?;

    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 1);
    Ok(())
}
