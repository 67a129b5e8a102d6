use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::mongodb::Id;

/// Minimum number of options a question must offer.
pub const MIN_OPTIONS: usize = 2;

/// One answer to a question. The `label` is shown to voters; the `key` is
/// the canonical form used for matching submissions and grouping the tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOption {
    pub label: String,
    pub key: String,
}

impl VoteOption {
    pub fn new(label: &str) -> Self {
        let label = label.trim();
        Self {
            label: label.to_string(),
            key: Self::key_for(label),
        }
    }

    /// Canonical key for any raw option text.
    pub fn key_for(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.key == Self::key_for(raw)
    }
}

/// A question put to the assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingQuestion {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub options: Vec<VoteOption>,
}

impl VotingQuestion {
    /// Find the option matching the submitted text, ignoring case.
    pub fn option(&self, raw: &str) -> Option<&VoteOption> {
        self.options.iter().find(|option| option.matches(raw))
    }

    /// Display label for a canonical option key.
    pub fn label_for(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.key == key)
            .map(|option| option.label.as_str())
    }
}

/// A question as submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("The question title must not be empty")]
    EmptyTitle,
    #[error("A question needs at least two options, got {0}")]
    TooFewOptions(usize),
    #[error("Option {0} is empty")]
    EmptyOption(usize),
}

impl TryFrom<QuestionSpec> for VotingQuestion {
    type Error = QuestionError;

    /// Validate the spec and assign the question a fresh ID.
    fn try_from(spec: QuestionSpec) -> Result<Self, Self::Error> {
        let title = spec.title.trim();
        if title.is_empty() {
            return Err(QuestionError::EmptyTitle);
        }
        if spec.options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions(spec.options.len()));
        }
        if let Some(index) = spec.options.iter().position(|opt| opt.trim().is_empty()) {
            return Err(QuestionError::EmptyOption(index + 1));
        }
        Ok(Self {
            id: Id::new(),
            title: title.to_string(),
            description: spec.description.trim().to_string(),
            options: spec.options.iter().map(|opt| VoteOption::new(opt)).collect(),
        })
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl QuestionSpec {
        pub fn example() -> Self {
            Self {
                title: "Aprobación del presupuesto".to_string(),
                description: "Presupuesto anual de mantenimiento".to_string(),
                options: vec!["Sí".to_string(), "No".to_string()],
            }
        }
    }

    impl VotingQuestion {
        pub fn example() -> Self {
            QuestionSpec::example().try_into().unwrap()
        }
    }
}
