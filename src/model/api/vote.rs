use serde::{Deserialize, Serialize};

/// Who wants to vote, and for which apartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterIdentity {
    pub national_id: String,
    pub apartment: String,
}

/// Body of `POST /votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(flatten)]
    pub voter: VoterIdentity,
    pub option: String,
}

/// A successful admission check.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub valid: bool,
    pub weight: f64,
}

impl Admission {
    pub fn admitted(weight: f64) -> Self {
        Self {
            valid: true,
            weight,
        }
    }
}
