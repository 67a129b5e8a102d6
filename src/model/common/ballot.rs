use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Weight of an apartment that has no entry in the weight table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// An admitted vote. Ballots are write-once: they are never modified, and
/// only disappear when the whole session is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    /// The voting session this ballot was cast in.
    pub session_id: Id,
    pub national_id: String,
    pub apartment: String,
    /// Canonical option key, see [`VoteOption`](super::session::VoteOption).
    pub option: String,
    pub weight: f64,
    #[serde(with = "ts_milliseconds")]
    pub cast_at: DateTime<Utc>,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Ballot {
        pub fn example(session_id: Id, national_id: &str, option: &str, weight: f64) -> Self {
            Self {
                session_id,
                national_id: national_id.to_string(),
                apartment: format!("A{national_id}"),
                option: option.to_string(),
                weight,
                cast_at: Utc::now(),
            }
        }
    }
}
