//! The structured enrichment response and its validator.
//!
//! The LLM must return one JSON object covering every difficulty tier.
//! Parsing is strict: the body has to be a single object, and the
//! validator enforces the tier cardinalities and the neutral-synthesis
//! rule before anything is persisted.

use crate::errors::StructureError;
use serde::{Deserialize, Serialize};

/// Difficulty tiers keyed throughout the artifact tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Mid,
    Hard,
    ZhHard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Mid => "mid",
            Self::Hard => "hard",
            Self::ZhHard => "zh_hard",
        }
    }
}

/// A perspective's stance. The synthesis must always be `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attitude {
    Positive,
    Neutral,
    Negative,
}

impl Attitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// One keyword entry. The explanation key varies by tier
/// (`easy_explanation`, `mid_explanation`, `hard_explanation`), so it is
/// accepted under any of those names.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Keyword {
    pub word: String,
    #[serde(default)]
    pub frequency: i64,
    #[serde(
        alias = "easy_explanation",
        alias = "mid_explanation",
        alias = "hard_explanation"
    )]
    pub explanation: String,
}

/// One multiple-choice item: four options, the answer given as a letter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// A single stance on the article.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Perspective {
    pub perspective: String,
    pub attitude: Attitude,
}

/// The per-tier perspectives block: two stances plus a synthesis.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerspectiveBlock {
    pub perspectives: Vec<Perspective>,
    pub synthesis: Perspective,
}

/// The complete per-article enrichment object, as returned by the LLM.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentResponse {
    pub article_id: String,
    pub title_zh: String,
    pub summary_easy: String,
    pub summary_mid: String,
    pub summary_hard: String,
    pub summary_zh_hard: String,
    pub key_words_easy: Vec<Keyword>,
    pub key_words_mid: Vec<Keyword>,
    pub key_words_hard: Vec<Keyword>,
    pub background_reading_easy: String,
    pub background_reading_mid: String,
    pub background_reading_hard: String,
    pub article_analysis_mid: String,
    pub article_analysis_hard: String,
    pub multiple_choice_questions_easy: Vec<QuizQuestion>,
    pub multiple_choice_questions_mid: Vec<QuizQuestion>,
    pub multiple_choice_questions_hard: Vec<QuizQuestion>,
    pub perspectives_easy: PerspectiveBlock,
    pub perspectives_mid: PerspectiveBlock,
    pub perspectives_hard: PerspectiveBlock,
}

/// Word-count bands for the English summaries.
const SUMMARY_BANDS: &[(&str, usize, usize)] = &[
    ("summary_easy", 100, 200),
    ("summary_mid", 300, 500),
    ("summary_hard", 500, 700),
];

const KEYWORDS_PER_TIER: usize = 10;
const QUESTION_COUNTS: &[(&str, usize)] = &[
    ("multiple_choice_questions_easy", 8),
    ("multiple_choice_questions_mid", 10),
    ("multiple_choice_questions_hard", 12),
];
const PERSPECTIVES_PER_TIER: usize = 2;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Parses a raw response body into the enrichment object.
///
/// The body must be exactly one JSON object: fenced or prefixed output is
/// rejected as `NotJson` so the caller can dump the raw body to disk.
/// A parseable object missing mandatory keys maps to `MissingField`.
pub fn parse_response(body: &str) -> Result<EnrichmentResponse, StructureError> {
    let value: serde_json::Value = serde_json::from_str(body.trim())
        .map_err(|e| StructureError::NotJson(e.to_string()))?;
    if !value.is_object() {
        return Err(StructureError::NotJson(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| StructureError::MissingField(e.to_string()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl EnrichmentResponse {
    /// Enforces the contract's cardinalities and invariants.
    ///
    /// The Chinese summary is deliberately not word-counted: whitespace
    /// segmentation does not apply to Chinese text.
    pub fn validate(&self) -> Result<(), StructureError> {
        for &(field, min, max) in SUMMARY_BANDS {
            let words = word_count(self.summary(field));
            if words < min || words > max {
                return Err(StructureError::WordCountOutOfBand {
                    field,
                    words,
                    min,
                    max,
                });
            }
        }

        for (field, keywords) in [
            ("key_words_easy", &self.key_words_easy),
            ("key_words_mid", &self.key_words_mid),
            ("key_words_hard", &self.key_words_hard),
        ] {
            if keywords.len() != KEYWORDS_PER_TIER {
                return Err(StructureError::Cardinality {
                    field,
                    expected: KEYWORDS_PER_TIER,
                    actual: keywords.len(),
                });
            }
        }

        for &(field, expected) in QUESTION_COUNTS {
            let actual = self.questions(field).len();
            if actual != expected {
                return Err(StructureError::Cardinality {
                    field,
                    expected,
                    actual,
                });
            }
        }

        for (field, block) in [
            ("perspectives_easy", &self.perspectives_easy),
            ("perspectives_mid", &self.perspectives_mid),
            ("perspectives_hard", &self.perspectives_hard),
        ] {
            if block.perspectives.len() != PERSPECTIVES_PER_TIER {
                return Err(StructureError::Cardinality {
                    field,
                    expected: PERSPECTIVES_PER_TIER,
                    actual: block.perspectives.len(),
                });
            }
            if block.synthesis.attitude != Attitude::Neutral {
                return Err(StructureError::AttitudeInvariant(
                    block.synthesis.attitude.as_str().to_string(),
                ));
            }
        }

        Ok(())
    }

    fn summary(&self, field: &str) -> &str {
        match field {
            "summary_easy" => &self.summary_easy,
            "summary_mid" => &self.summary_mid,
            _ => &self.summary_hard,
        }
    }

    fn questions(&self, field: &str) -> &[QuizQuestion] {
        match field {
            "multiple_choice_questions_easy" => &self.multiple_choice_questions_easy,
            "multiple_choice_questions_mid" => &self.multiple_choice_questions_mid,
            _ => &self.multiple_choice_questions_hard,
        }
    }

    /// The English-tier summaries with their difficulty keys.
    pub fn summaries(&self) -> [(Difficulty, &str); 4] {
        [
            (Difficulty::Easy, self.summary_easy.as_str()),
            (Difficulty::Mid, self.summary_mid.as_str()),
            (Difficulty::Hard, self.summary_hard.as_str()),
            (Difficulty::ZhHard, self.summary_zh_hard.as_str()),
        ]
    }

    pub fn keywords(&self) -> [(Difficulty, &[Keyword]); 3] {
        [
            (Difficulty::Easy, self.key_words_easy.as_slice()),
            (Difficulty::Mid, self.key_words_mid.as_slice()),
            (Difficulty::Hard, self.key_words_hard.as_slice()),
        ]
    }

    pub fn backgrounds(&self) -> [(Difficulty, &str); 3] {
        [
            (Difficulty::Easy, self.background_reading_easy.as_str()),
            (Difficulty::Mid, self.background_reading_mid.as_str()),
            (Difficulty::Hard, self.background_reading_hard.as_str()),
        ]
    }

    pub fn analyses(&self) -> [(Difficulty, &str); 2] {
        [
            (Difficulty::Mid, self.article_analysis_mid.as_str()),
            (Difficulty::Hard, self.article_analysis_hard.as_str()),
        ]
    }

    pub fn question_sets(&self) -> [(Difficulty, &[QuizQuestion]); 3] {
        [
            (
                Difficulty::Easy,
                self.multiple_choice_questions_easy.as_slice(),
            ),
            (
                Difficulty::Mid,
                self.multiple_choice_questions_mid.as_slice(),
            ),
            (
                Difficulty::Hard,
                self.multiple_choice_questions_hard.as_slice(),
            ),
        ]
    }

    pub fn perspective_blocks(&self) -> [(Difficulty, &PerspectiveBlock); 3] {
        [
            (Difficulty::Easy, &self.perspectives_easy),
            (Difficulty::Mid, &self.perspectives_mid),
            (Difficulty::Hard, &self.perspectives_hard),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_json_is_rejected() {
        let err = parse_response("not json").unwrap_err();
        assert!(matches!(err, StructureError::NotJson(_)));
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = parse_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, StructureError::NotJson(_)));
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = parse_response(r#"{"article_id": "2025010101"}"#).unwrap_err();
        assert!(matches!(err, StructureError::MissingField(_)));
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("one  two\nthree"), 3);
        assert_eq!(word_count(""), 0);
    }
}
