//! # newsloom-clean: Content Cleaning
//!
//! This crate turns raw article HTML into an ordered list of cleaned,
//! publication-ready paragraphs. It is a pure transformation: no I/O, no
//! state. The crawler owns fetching; this crate owns deciding what
//! survives onto the page.
//!
//! Cleaning runs as an ordered cascade — normalisation, paragraph
//! extraction, then a series of drop filters — followed by a length gate
//! and the article-level rejection filters (video, transcript, filler,
//! banned words).

mod filters;
mod normalize;

pub use normalize::normalize_text;

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use thiserror::Error;

/// Why an article was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooShort,
    TooLong,
    Video,
    Transcript,
    Filler,
    BannedWord,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::Video => "video",
            Self::Transcript => "transcript",
            Self::Filler => "filler",
            Self::BannedWord => "banned_word",
        }
    }
}

/// A successfully cleaned article body.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub paragraphs: Vec<String>,
    pub normalized_text: String,
}

/// The cleaner's verdict on one article.
#[derive(Debug, Clone)]
pub enum CleanOutcome {
    Cleaned(Cleaned),
    Rejected(RejectReason),
}

/// The length gate applied to the concatenated cleaned text.
///
/// Sport categories only enforce a lower bound; everything else must
/// land inside the global band.
#[derive(Debug, Clone, Copy)]
pub enum LengthGate {
    Global { min: usize, max: usize },
    Sport { min: usize },
}

impl Default for LengthGate {
    fn default() -> Self {
        Self::Global {
            min: 2300,
            max: 4500,
        }
    }
}

/// Cleaning thresholds, built by the crawler from the run configuration.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub paragraph_min_length: usize,
    pub length_gate: LengthGate,
    /// Brand names whose mention marks a paragraph as promotional.
    pub promo_brands: Vec<String>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            paragraph_min_length: 30,
            length_gate: LengthGate::default(),
            promo_brands: Vec::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A configured cleaner. Compiles its filter patterns once; `clean` is a
/// pure function of the input HTML and title.
#[derive(Debug, Clone)]
pub struct Cleaner {
    options: CleanOptions,
    banned_words: Option<Regex>,
    promo_pattern: Regex,
    speaker_pattern: Regex,
}

impl Cleaner {
    pub fn new(
        options: CleanOptions,
        banned_words: &HashSet<String>,
    ) -> Result<Self, CleanError> {
        let banned_words = if banned_words.is_empty() {
            None
        } else {
            let mut words: Vec<String> =
                banned_words.iter().map(|w| regex::escape(w)).collect();
            words.sort();
            Some(Regex::new(&format!(r"(?i)\b({})\b", words.join("|")))?)
        };
        let promo_pattern = filters::promo_pattern(&options.promo_brands)?;
        let speaker_pattern = Regex::new(r"^[A-Z][A-Za-z .'-]{0,30}:\s+\S")?;
        Ok(Self {
            options,
            banned_words,
            promo_pattern,
            speaker_pattern,
        })
    }

    /// Runs the full cascade over one article.
    pub fn clean(&self, raw_html: &str, title: &str) -> CleanOutcome {
        let mut paragraphs = extract_paragraphs(raw_html);

        paragraphs.retain(|p| p.chars().count() >= self.options.paragraph_min_length);
        paragraphs.retain(|p| !filters::is_byline(p));
        paragraphs.retain(|p| !self.is_promo(p));
        paragraphs.retain(|p| !filters::is_publisher_boilerplate(p));
        filters::strip_trailing_footer(&mut paragraphs);
        paragraphs.retain(|p| !p.starts_with("Related:"));
        paragraphs.dedup();

        let normalized_text = paragraphs.join("\n\n");

        let length = normalized_text.chars().count();
        match self.options.length_gate {
            LengthGate::Global { min, max } => {
                if length < min {
                    return CleanOutcome::Rejected(RejectReason::TooShort);
                }
                if length > max {
                    return CleanOutcome::Rejected(RejectReason::TooLong);
                }
            }
            LengthGate::Sport { min } => {
                if length < min {
                    return CleanOutcome::Rejected(RejectReason::TooShort);
                }
            }
        }

        let combined = format!("{title}\n{normalized_text}");
        if filters::is_video(&combined) {
            return CleanOutcome::Rejected(RejectReason::Video);
        }
        if self.is_transcript(&combined, &paragraphs) {
            return CleanOutcome::Rejected(RejectReason::Transcript);
        }
        if filters::is_filler_title(title) {
            return CleanOutcome::Rejected(RejectReason::Filler);
        }
        if let Some(banned) = &self.banned_words {
            if banned.is_match(&combined) {
                return CleanOutcome::Rejected(RejectReason::BannedWord);
            }
        }

        CleanOutcome::Cleaned(Cleaned {
            paragraphs,
            normalized_text,
        })
    }

    fn is_promo(&self, paragraph: &str) -> bool {
        if paragraph.chars().count() >= 80 {
            return false;
        }
        filters::starts_with_promo_glyph(paragraph) || self.promo_pattern.is_match(paragraph)
    }

    /// A transcript shows either a run of "Speaker: utterance" lines or
    /// talks about its own audio.
    fn is_transcript(&self, combined: &str, paragraphs: &[String]) -> bool {
        let speaker_lines = paragraphs
            .iter()
            .filter(|p| self.speaker_pattern.is_match(p))
            .count();
        if speaker_lines >= 3 {
            return true;
        }
        let lower = combined.to_lowercase();
        lower.contains("transcript") && lower.contains("audio")
    }
}

/// Extracts candidate paragraphs in document order, normalised to ASCII
/// punctuation and collapsed whitespace. HTML entities are decoded by
/// the parser itself.
fn extract_paragraphs(raw_html: &str) -> Vec<String> {
    let document = Html::parse_document(raw_html);
    let selector = Selector::parse("p").expect("static selector");
    document
        .select(&selector)
        .map(|p| normalize_text(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> Cleaner {
        Cleaner::new(CleanOptions::default(), &HashSet::new()).unwrap()
    }

    fn html_of(paragraphs: &[&str]) -> String {
        let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
        format!("<html><body><article>{body}</article></body></html>")
    }

    #[test]
    fn paragraphs_keep_document_order() {
        let long_a = "a".repeat(40);
        let long_b = "b".repeat(40);
        let html = html_of(&[&long_a, &long_b]);
        let paragraphs = extract_paragraphs(&html);
        assert_eq!(paragraphs, vec![long_a, long_b]);
    }

    #[test]
    fn short_paragraphs_are_dropped() {
        let opts = CleanOptions {
            length_gate: LengthGate::Sport { min: 10 },
            ..CleanOptions::default()
        };
        let cleaner = Cleaner::new(opts, &HashSet::new()).unwrap();
        let keep = "This paragraph is comfortably longer than thirty characters.";
        let html = html_of(&["too short", keep]);
        match cleaner.clean(&html, "Title") {
            CleanOutcome::Cleaned(cleaned) => assert_eq!(cleaned.paragraphs, vec![keep]),
            CleanOutcome::Rejected(reason) => panic!("rejected: {reason:?}"),
        }
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let p = "The same sentence appears twice in a row in this document.";
        let opts = CleanOptions {
            length_gate: LengthGate::Sport { min: 10 },
            ..CleanOptions::default()
        };
        let cleaner = Cleaner::new(opts, &HashSet::new()).unwrap();
        let html = html_of(&[p, p]);
        match cleaner.clean(&html, "Title") {
            CleanOutcome::Cleaned(cleaned) => assert_eq!(cleaned.paragraphs.len(), 1),
            CleanOutcome::Rejected(reason) => panic!("rejected: {reason:?}"),
        }
    }

    #[test]
    fn banned_word_in_title_rejects_even_with_clean_body() {
        let banned: HashSet<String> = ["gore".to_string()].into_iter().collect();
        let opts = CleanOptions {
            length_gate: LengthGate::Sport { min: 10 },
            ..CleanOptions::default()
        };
        let cleaner = Cleaner::new(opts, &banned).unwrap();
        let html = html_of(&["A perfectly ordinary paragraph about gardening and weather."]);
        match cleaner.clean(&html, "Gore at the scene") {
            CleanOutcome::Rejected(reason) => assert_eq!(reason, RejectReason::BannedWord),
            CleanOutcome::Cleaned(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn banned_word_matches_whole_words_only() {
        let banned: HashSet<String> = ["gore".to_string()].into_iter().collect();
        let opts = CleanOptions {
            length_gate: LengthGate::Sport { min: 10 },
            ..CleanOptions::default()
        };
        let cleaner = Cleaner::new(opts, &banned).unwrap();
        // "Gorey" must not match the banned word "gore".
        let html = html_of(&["Edward Gorey illustrated many beloved children's books."]);
        assert!(matches!(
            cleaner.clean(&html, "An illustrator remembered"),
            CleanOutcome::Cleaned(_)
        ));
    }

    #[test]
    fn watch_prefix_rejects_as_video() {
        let body = "The broadcast covered the landing in detail for several minutes. "
            .repeat(45);
        let html = html_of(&[&body]);
        match cleaner().clean(&html, "Watch: the moment of landing") {
            CleanOutcome::Rejected(reason) => assert_eq!(reason, RejectReason::Video),
            CleanOutcome::Cleaned(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn wordle_title_rejects_as_filler() {
        let body = "Some generously long body text that sails past every length check."
            .repeat(40);
        let html = html_of(&[&body]);
        // Long enough to pass the gate, still filler by title.
        let opts = CleanOptions {
            length_gate: LengthGate::Sport { min: 100 },
            ..CleanOptions::default()
        };
        let cleaner = Cleaner::new(opts, &HashSet::new()).unwrap();
        match cleaner.clean(&html, "Today's Wordle hints and answer") {
            CleanOutcome::Rejected(reason) => assert_eq!(reason, RejectReason::Filler),
            CleanOutcome::Cleaned(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn transcript_speaker_runs_reject() {
        let opts = CleanOptions {
            length_gate: LengthGate::Sport { min: 10 },
            ..CleanOptions::default()
        };
        let cleaner = Cleaner::new(opts, &HashSet::new()).unwrap();
        let html = html_of(&[
            "Smith: Thank you all for joining us today on the program.",
            "Jones: Glad to be here, it has been quite the season already.",
            "Smith: Let us start with the result from Saturday afternoon.",
        ]);
        match cleaner.clean(&html, "Interview") {
            CleanOutcome::Rejected(reason) => assert_eq!(reason, RejectReason::Transcript),
            CleanOutcome::Cleaned(_) => panic!("expected rejection"),
        }
    }
}
