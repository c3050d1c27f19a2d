//! The category-bound prompt family.
//!
//! Five fixed templates; each article's category selects one via its
//! `prompt_name`. Rendering is a single placeholder substitution, no
//! templating language involved.

mod templates;

use crate::types::EnrichCandidate;

/// The placeholder every template carries exactly once.
pub const ARTICLE_PLACEHOLDER: &str = "{article_json}";

/// The fixed prompt family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptName {
    #[default]
    Default,
    Sports,
    Technology,
    Science,
    Political,
}

impl PromptName {
    /// Looks up a template by a category's `prompt_name` column.
    /// Unknown names fall back to the default template.
    pub fn from_name(name: &str) -> Self {
        match name {
            "sports" => Self::Sports,
            "technology" => Self::Technology,
            "science" => Self::Science,
            "political" => Self::Political,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Sports => "sports",
            Self::Technology => "technology",
            Self::Science => "science",
            Self::Political => "political",
        }
    }

    fn lead(&self) -> &'static str {
        match self {
            Self::Default => templates::DEFAULT_LEAD,
            Self::Sports => templates::SPORTS_LEAD,
            Self::Technology => templates::TECHNOLOGY_LEAD,
            Self::Science => templates::SCIENCE_LEAD,
            Self::Political => templates::POLITICAL_LEAD,
        }
    }

    /// The full template: the category lead plus the shared contract.
    pub fn template(&self) -> String {
        format!("{}\n{}", self.lead(), templates::RESPONSE_CONTRACT)
    }
}

/// Renders the prompt for one article: the candidate is serialized to
/// JSON and substituted at the template's single placeholder.
pub fn render(prompt: PromptName, article: &EnrichCandidate) -> Result<String, serde_json::Error> {
    let article_json = serde_json::to_string(article)?;
    Ok(prompt.template().replace(ARTICLE_PLACEHOLDER, &article_json))
}
