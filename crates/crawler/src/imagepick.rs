//! Image candidate selection.
//!
//! Candidates are gathered from the article page in a fixed priority
//! order; the first one that survives every gate (URL filter, content
//! type, minimum byte size) wins.

use newsloom::errors::ImageError;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// URL substrings that mark decorative or tracking images.
const BLOCKED_SUBSTRINGS: &[&str] = &[
    "favicon",
    "logo",
    "placeholder",
    "spacer",
    "blank",
    "icon",
    "icons",
    "sprite",
    "badge",
    "pixel",
];

/// Candidate URLs in priority order: og:image, twitter:image,
/// rel=image_src, the largest srcset entry, a scoped `<img>`, then any
/// `<img>`. Unresolvable and gate-failing URLs are dropped here;
/// download gates run later.
pub fn select_candidates(raw_html: &str, article_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(raw_html);
    let mut raw_candidates: Vec<String> = Vec::new();

    let meta_og = Selector::parse(r#"meta[property="og:image"]"#).expect("static selector");
    if let Some(content) = document
        .select(&meta_og)
        .find_map(|el| el.value().attr("content"))
    {
        raw_candidates.push(content.to_string());
    }

    let meta_twitter = Selector::parse(r#"meta[name="twitter:image"]"#).expect("static selector");
    if let Some(content) = document
        .select(&meta_twitter)
        .find_map(|el| el.value().attr("content"))
    {
        raw_candidates.push(content.to_string());
    }

    let link_src = Selector::parse(r#"link[rel="image_src"]"#).expect("static selector");
    if let Some(href) = document
        .select(&link_src)
        .find_map(|el| el.value().attr("href"))
    {
        raw_candidates.push(href.to_string());
    }

    let picture_source = Selector::parse("picture source[srcset]").expect("static selector");
    let srcset_entries: Vec<SrcsetEntry> = document
        .select(&picture_source)
        .filter_map(|el| el.value().attr("srcset"))
        .flat_map(parse_srcset)
        .collect();
    if let Some(best) = best_srcset_entry(srcset_entries) {
        raw_candidates.push(best);
    }

    let scoped_img = Selector::parse("article img, figure img, div.article img")
        .expect("static selector");
    if let Some(src) = document
        .select(&scoped_img)
        .find_map(|el| el.value().attr("src"))
    {
        raw_candidates.push(src.to_string());
    }

    let any_img = Selector::parse("img").expect("static selector");
    if let Some(src) = document
        .select(&any_img)
        .find_map(|el| el.value().attr("src"))
    {
        raw_candidates.push(src.to_string());
    }

    let mut seen = Vec::new();
    let mut candidates = Vec::new();
    for raw in raw_candidates {
        let Ok(resolved) = article_url.join(raw.trim()) else {
            continue;
        };
        if !url_passes_gates(resolved.as_str()) {
            debug!(url = %resolved, "image candidate blocked by URL filter");
            continue;
        }
        if seen.contains(&resolved) {
            continue;
        }
        seen.push(resolved.clone());
        candidates.push(resolved);
    }
    candidates
}

/// The URL substring gate, case-insensitive.
pub fn url_passes_gates(url: &str) -> bool {
    let lower = url.to_lowercase();
    !BLOCKED_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

#[derive(Debug, Clone, PartialEq)]
struct SrcsetEntry {
    url: String,
    width: Option<u32>,
    density: Option<f32>,
}

/// Parses `URL WIDTHw` / `URL DENSITYx` tuples out of a srcset value.
fn parse_srcset(srcset: &str) -> Vec<SrcsetEntry> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?.to_string();
            let descriptor = parts.next().unwrap_or_default();
            let (width, density) = if let Some(w) = descriptor.strip_suffix('w') {
                (w.parse().ok(), None)
            } else if let Some(d) = descriptor.strip_suffix('x') {
                (None, d.parse().ok())
            } else {
                (None, None)
            };
            Some(SrcsetEntry {
                url,
                width,
                density,
            })
        })
        .collect()
}

/// Chooses the largest entry: max width first, then max density.
fn best_srcset_entry(entries: Vec<SrcsetEntry>) -> Option<String> {
    entries
        .into_iter()
        .max_by(|a, b| {
            let wa = a.width.unwrap_or(0);
            let wb = b.width.unwrap_or(0);
            wa.cmp(&wb).then(
                a.density
                    .unwrap_or(0.0)
                    .partial_cmp(&b.density.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        })
        .map(|entry| entry.url)
}

/// A downloaded, gate-passing image body.
#[derive(Debug)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub url: Url,
}

/// Downloads one candidate and applies the content-type and size gates.
pub async fn download_image(
    client: &reqwest::Client,
    url: &Url,
    min_bytes: u64,
) -> Result<DownloadedImage, ImageError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ImageError::Http(e.to_string()))?;
    if !response.status().is_success() {
        return Err(ImageError::Http(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    if content_type.contains("image/png") {
        return Err(ImageError::ContentType(content_type));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ImageError::Http(e.to_string()))?;
    if (bytes.len() as u64) < min_bytes {
        return Err(ImageError::BelowMinBytes {
            got: bytes.len() as u64,
            min: min_bytes,
        });
    }

    let extension = extension_for(&content_type, url);
    Ok(DownloadedImage {
        bytes: bytes.to_vec(),
        extension,
        url: url.clone(),
    })
}

/// Picks the stored file extension from the content type, falling back
/// to the URL path.
fn extension_for(content_type: &str, url: &Url) -> String {
    if content_type.contains("image/jpeg") || content_type.contains("image/jpg") {
        return "jpg".to_string();
    }
    if content_type.contains("image/webp") {
        return "webp".to_string();
    }
    let path = url.path().to_lowercase();
    for ext in ["jpg", "jpeg", "webp", "gif"] {
        if path.ends_with(&format!(".{ext}")) {
            return if ext == "jpeg" { "jpg".to_string() } else { ext.to_string() };
        }
    }
    "jpg".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/story/1").unwrap()
    }

    #[test]
    fn og_image_comes_first() {
        let html = r#"
            <html><head>
            <meta name="twitter:image" content="/img/b.jpg">
            <meta property="og:image" content="/img/a.jpg">
            </head><body><img src="/img/c.jpg"></body></html>
        "#;
        let candidates = select_candidates(html, &base());
        assert_eq!(candidates[0].path(), "/img/a.jpg");
        assert_eq!(candidates[1].path(), "/img/b.jpg");
        assert_eq!(candidates[2].path(), "/img/c.jpg");
    }

    #[test]
    fn blocked_substrings_drop_candidates() {
        let html = r#"
            <html><head>
            <meta property="og:image" content="/assets/logo.jpg">
            <meta name="twitter:image" content="/img/photo.jpg">
            </head></html>
        "#;
        let candidates = select_candidates(html, &base());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path(), "/img/photo.jpg");
    }

    #[test]
    fn srcset_prefers_width_then_density() {
        let entries = parse_srcset("/a.jpg 320w, /b.jpg 1280w, /c.jpg 640w");
        assert_eq!(best_srcset_entry(entries).unwrap(), "/b.jpg");

        let entries = parse_srcset("/a.jpg 1x, /b.jpg 2x");
        assert_eq!(best_srcset_entry(entries).unwrap(), "/b.jpg");
    }

    #[test]
    fn relative_urls_resolve_against_the_article() {
        let html = r#"<html><head><meta property="og:image" content="hero.jpg"></head></html>"#;
        let candidates = select_candidates(html, &base());
        assert_eq!(
            candidates[0].as_str(),
            "https://news.example.com/story/hero.jpg"
        );
    }

    #[test]
    fn extension_prefers_content_type_over_path() {
        let url = Url::parse("https://cdn.example.com/x.webp").unwrap();
        assert_eq!(extension_for("image/jpeg", &url), "jpg");
        assert_eq!(extension_for("", &url), "webp");
        let bare = Url::parse("https://cdn.example.com/x").unwrap();
        assert_eq!(extension_for("", &bare), "jpg");
    }
}
