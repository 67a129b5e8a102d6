use serde::{Deserialize, Serialize};

/// States in the voting session lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No question; nothing to vote on.
    Idle,
    /// A question is set and ballots are being accepted.
    Open,
    /// The question is kept for reporting, but no more ballots are accepted.
    Closed,
}

impl SessionPhase {
    pub fn accepts_ballots(&self) -> bool {
        *self == Self::Open
    }
}
