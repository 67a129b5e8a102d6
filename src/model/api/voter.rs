use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::common::voter::Voter;

/// Body of `POST /voters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVoter {
    pub national_id: String,
    pub apartment: String,
    #[serde(default)]
    pub attendance_apartment: Option<String>,
}

impl TryFrom<NewVoter> for Voter {
    type Error = crate::error::Error;

    fn try_from(new: NewVoter) -> Result<Self> {
        Voter::new(
            new.national_id,
            new.apartment,
            new.attendance_apartment.as_deref(),
        )
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl NewVoter {
        pub fn example() -> Self {
            Voter::example().into()
        }
    }

    impl From<Voter> for NewVoter {
        fn from(voter: Voter) -> Self {
            Self {
                national_id: voter.national_id,
                apartment: voter.apartment,
                attendance_apartment: voter.attendance_apartment,
            }
        }
    }
}
