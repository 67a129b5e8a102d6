use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

use crate::model::common::session::VotingSession;

use super::question::DbQuestion;

/// Primary key of the single live session document.
pub const CURRENT_SESSION: &str = "current";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbSession {
    #[serde(rename = "_id")]
    pub key: String,
    pub session_id: Option<ObjectId>,
    pub active: bool,
    pub question: Option<DbQuestion>,
    pub started_at: Option<DateTime>,
    pub ended_at: Option<DateTime>,
    pub results_visible: bool,
}

impl DbSession {
    /// Filter matching the live session document.
    pub fn current_filter() -> Document {
        doc! { "_id": CURRENT_SESSION }
    }
}

impl From<&VotingSession> for DbSession {
    fn from(session: &VotingSession) -> Self {
        Self {
            key: CURRENT_SESSION.to_string(),
            session_id: session.id.map(Into::into),
            active: session.active,
            question: session.question.as_ref().map(Into::into),
            started_at: session.started_at.map(DateTime::from_chrono),
            ended_at: session.ended_at.map(DateTime::from_chrono),
            results_visible: session.results_visible,
        }
    }
}

impl From<DbSession> for VotingSession {
    fn from(session: DbSession) -> Self {
        Self {
            id: session.session_id.map(Into::into),
            active: session.active,
            question: session.question.map(Into::into),
            started_at: session.started_at.map(|dt| dt.to_chrono()),
            ended_at: session.ended_at.map(|dt| dt.to_chrono()),
            results_visible: session.results_visible,
        }
    }
}
