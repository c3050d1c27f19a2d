//! The drop filters of the cleaning cascade.

use regex::Regex;

/// Byline strings that appear verbatim (compared case-insensitively).
const KNOWN_BYLINES: &[&str] = &[
    "associated press",
    "reuters",
    "afp",
    "staff reports",
    "staff writer",
    "contributed reporting",
    "the editorial board",
];

/// Promo paragraphs often lead with one of these glyphs.
const PROMO_GLYPHS: &[char] = &['🔥', '💰', '🛒', '⚡', '🎉', '👉', '✨', '🏷'];

const VIDEO_MARKERS: &[&str] = &["watch:", "video:", "full episode"];

const FILLER_TITLE_HITS: &[&str] = &["wordle", "puzzle", "sudoku", "crossword"];

/// Builds the promo pattern over the fixed sale/affiliate terms plus the
/// configured brand names.
pub fn promo_pattern(brands: &[String]) -> Result<Regex, regex::Error> {
    let mut terms: Vec<String> = vec![
        r"\d+%\s*off".to_string(),
        r"\boff\b".to_string(),
        r"\bsave\b".to_string(),
        r"\bdiscount\b".to_string(),
        r"\bbuy now\b".to_string(),
        r"\bsign up\b".to_string(),
        r"\bsponsored\b".to_string(),
        r"\baffiliate commission\b".to_string(),
    ];
    for brand in brands {
        terms.push(format!(r"\b{}\b", regex::escape(brand)));
    }
    Regex::new(&format!("(?i)({})", terms.join("|")))
}

pub fn starts_with_promo_glyph(paragraph: &str) -> bool {
    paragraph
        .chars()
        .next()
        .is_some_and(|c| PROMO_GLYPHS.contains(&c))
}

/// Byline detection: exact known hits, the doubled "Name Surname Name
/// Surname" artifact, short all-caps credit lines, and "Name:" prefixes
/// naming a known byline.
pub fn is_byline(paragraph: &str) -> bool {
    let lower = paragraph.to_lowercase();
    if KNOWN_BYLINES.contains(&lower.trim()) {
        return true;
    }
    if is_doubled_name(paragraph) {
        return true;
    }
    if is_short_all_caps(paragraph) {
        return true;
    }
    if let Some((name, _)) = paragraph.split_once(':') {
        if KNOWN_BYLINES.contains(&name.trim().to_lowercase().as_str()) {
            return true;
        }
    }
    false
}

/// "Jane Doe Jane Doe": a scraping artifact where the byline renders
/// twice. Four capitalised tokens with the first pair repeated.
fn is_doubled_name(paragraph: &str) -> bool {
    let tokens: Vec<&str> = paragraph.split_whitespace().collect();
    if tokens.len() != 4 {
        return false;
    }
    let capitalised = tokens
        .iter()
        .all(|t| t.chars().next().is_some_and(|c| c.is_uppercase()));
    capitalised && tokens[0] == tokens[2] && tokens[1] == tokens[3]
}

/// Short all-caps credit lines, e.g. "CNN NEWSROOM".
fn is_short_all_caps(paragraph: &str) -> bool {
    let tokens: Vec<&str> = paragraph.split_whitespace().collect();
    if !(2..=3).contains(&tokens.len()) {
        return false;
    }
    tokens.iter().all(|t| {
        t.chars().any(|c| c.is_alphabetic()) && t.chars().all(|c| !c.is_lowercase())
    })
}

/// Known publisher phrases that never belong in the body.
pub fn is_publisher_boilerplate(paragraph: &str) -> bool {
    (paragraph.starts_with("Follow ") && paragraph.chars().count() < 80)
        || paragraph.starts_with("Funding:")
}

/// Strips the trailing run of footer-looking paragraphs: copyright
/// lines, street addresses, and bare numeric sequences.
pub fn strip_trailing_footer(paragraphs: &mut Vec<String>) {
    while paragraphs.last().is_some_and(|p| looks_like_footer(p)) {
        paragraphs.pop();
    }
}

fn looks_like_footer(paragraph: &str) -> bool {
    let lower = paragraph.to_lowercase();
    if paragraph.starts_with('©')
        || lower.starts_with("copyright")
        || lower.contains("all rights reserved")
    {
        return true;
    }
    if is_numeric_run(paragraph) {
        return true;
    }
    looks_like_address(&lower)
}

/// Short sequences of digits and separators, e.g. dangling phone numbers
/// or page markers.
fn is_numeric_run(paragraph: &str) -> bool {
    paragraph.chars().count() < 40
        && paragraph.chars().any(|c| c.is_ascii_digit())
        && paragraph
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "-.,()+/".contains(c))
}

fn looks_like_address(lower: &str) -> bool {
    const STREET_WORDS: &[&str] = &[
        " street", " st.", " avenue", " ave.", " road", " rd.", " boulevard", " suite", " floor",
    ];
    lower.chars().take(4).any(|c| c.is_ascii_digit())
        && STREET_WORDS.iter().any(|w| lower.contains(w))
}

pub fn is_video(combined: &str) -> bool {
    let lower = combined.to_lowercase();
    VIDEO_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn is_filler_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    FILLER_TITLE_HITS.iter().any(|hit| lower.contains(hit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_byline_is_dropped() {
        assert!(is_byline("Associated Press"));
        assert!(is_byline("REUTERS"));
    }

    #[test]
    fn doubled_name_is_dropped() {
        assert!(is_byline("Jane Doe Jane Doe"));
        assert!(!is_byline("Jane Doe John Doe"));
    }

    #[test]
    fn short_all_caps_is_dropped() {
        assert!(is_byline("CNN NEWSROOM"));
        assert!(!is_byline("BREAKING news update now"));
    }

    #[test]
    fn promo_terms_match_case_insensitively() {
        let pattern = promo_pattern(&[]).unwrap();
        assert!(pattern.is_match("Save 20% with this deal"));
        assert!(pattern.is_match("Sign up today"));
        assert!(!pattern.is_match("The rescue team arrived at dawn"));
    }

    #[test]
    fn configured_brand_names_extend_the_promo_filter() {
        let pattern = promo_pattern(&["ExampleMart".to_string()]).unwrap();
        assert!(pattern.is_match("ExampleMart has it cheaper"));
    }

    #[test]
    fn trailing_footer_run_is_stripped() {
        let mut paragraphs = vec![
            "Real closing paragraph of the article body.".to_string(),
            "© 2025 Example News. All rights reserved.".to_string(),
            "123 Example Street, Springfield".to_string(),
        ];
        strip_trailing_footer(&mut paragraphs);
        assert_eq!(paragraphs.len(), 1);
    }

    #[test]
    fn body_paragraph_with_digits_is_not_a_footer() {
        let mut paragraphs =
            vec!["The committee approved 12 measures during the 2025 session.".to_string()];
        strip_trailing_footer(&mut paragraphs);
        assert_eq!(paragraphs.len(), 1);
    }
}
