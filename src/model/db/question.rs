use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::model::common::session::{VoteOption, VotingQuestion};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbOption {
    pub label: String,
    pub key: String,
}

/// A stored question. Also embedded in the session document while voting
/// on it is open or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbQuestion {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub options: Vec<DbOption>,
}

impl From<&VotingQuestion> for DbQuestion {
    fn from(question: &VotingQuestion) -> Self {
        Self {
            id: question.id.into(),
            title: question.title.clone(),
            description: question.description.clone(),
            options: question
                .options
                .iter()
                .map(|option| DbOption {
                    label: option.label.clone(),
                    key: option.key.clone(),
                })
                .collect(),
        }
    }
}

impl From<DbQuestion> for VotingQuestion {
    fn from(question: DbQuestion) -> Self {
        Self {
            id: question.id.into(),
            title: question.title,
            description: question.description,
            options: question
                .options
                .into_iter()
                .map(|option| VoteOption {
                    label: option.label,
                    key: option.key,
                })
                .collect(),
        }
    }
}
