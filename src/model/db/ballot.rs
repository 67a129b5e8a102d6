use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::model::common::ballot::Ballot;

/// A cast ballot. `(session_id, national_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbBallot {
    pub session_id: ObjectId,
    pub national_id: String,
    pub apartment: String,
    pub option: String,
    pub weight: f64,
    pub cast_at: DateTime,
}

impl From<&Ballot> for DbBallot {
    fn from(ballot: &Ballot) -> Self {
        Self {
            session_id: ballot.session_id.into(),
            national_id: ballot.national_id.clone(),
            apartment: ballot.apartment.clone(),
            option: ballot.option.clone(),
            weight: ballot.weight,
            cast_at: DateTime::from_chrono(ballot.cast_at),
        }
    }
}

impl From<DbBallot> for Ballot {
    fn from(ballot: DbBallot) -> Self {
        Self {
            session_id: ballot.session_id.into(),
            national_id: ballot.national_id,
            apartment: ballot.apartment,
            option: ballot.option,
            weight: ballot.weight,
            cast_at: ballot.cast_at.to_chrono(),
        }
    }
}
