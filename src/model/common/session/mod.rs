mod question;
mod state;

pub use question::{QuestionError, QuestionSpec, VoteOption, VotingQuestion, MIN_OPTIONS};
pub use state::SessionPhase;

use chrono::{serde::ts_milliseconds_option, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// The single live voting session.
///
/// Every call to [`VotingSession::start`] opens a new session with a fresh
/// ID; ballots are tied to that ID, so the same voter may vote once per
/// question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub active: bool,
    pub question: Option<VotingQuestion>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub ended_at: Option<DateTime<Utc>>,
    pub results_visible: bool,
}

impl VotingSession {
    pub fn phase(&self) -> SessionPhase {
        match (&self.question, self.active) {
            (Some(_), true) => SessionPhase::Open,
            (Some(_), false) => SessionPhase::Closed,
            (None, _) => SessionPhase::Idle,
        }
    }

    /// The session ID and question, but only while ballots are accepted.
    pub fn ballot_box(&self) -> Option<(Id, &VotingQuestion)> {
        if !self.phase().accepts_ballots() {
            return None;
        }
        Some((self.id?, self.question.as_ref()?))
    }

    /// Open voting on `question`. Fails if voting is already open.
    pub fn start(&mut self, question: VotingQuestion, now: DateTime<Utc>) -> Result<Id> {
        if self.phase() == SessionPhase::Open {
            return Err(Error::AlreadyActive);
        }
        let id = Id::new();
        self.id = Some(id);
        self.active = true;
        self.question = Some(question);
        self.started_at = Some(now);
        self.ended_at = None;
        Ok(id)
    }

    /// Close voting. Returns `false` (and changes nothing) if voting was not open.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase() != SessionPhase::Open {
            return false;
        }
        self.active = false;
        self.ended_at = Some(now);
        true
    }

    pub fn set_results_visible(&mut self, visible: bool) {
        self.results_visible = visible;
    }

    /// Return to `Idle`, forgetting the question and timestamps.
    /// Result visibility is an independent display setting and is kept.
    pub fn reset(&mut self) {
        *self = Self {
            results_visible: self.results_visible,
            ..Self::default()
        };
    }
}
