use serde::{Deserialize, Serialize};

use crate::model::common::voter::Voter;

/// A voter roll entry, keyed by national ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbVoter {
    pub national_id: String,
    pub apartment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_apartment: Option<String>,
}

impl From<&Voter> for DbVoter {
    fn from(voter: &Voter) -> Self {
        Self {
            national_id: voter.national_id.clone(),
            apartment: voter.apartment.clone(),
            attendance_apartment: voter.attendance_apartment.clone(),
        }
    }
}

impl From<DbVoter> for Voter {
    fn from(voter: DbVoter) -> Self {
        Self {
            national_id: voter.national_id,
            apartment: voter.apartment,
            attendance_apartment: voter.attendance_apartment,
        }
    }
}
