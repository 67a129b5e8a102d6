use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An entry in the voter roll: a national ID (cédula) and the apartment it
/// votes for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub national_id: String,
    pub apartment: String,
    /// When present, the vote must be cast under this apartment instead of
    /// the one on file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_apartment: Option<String>,
}

impl Voter {
    /// Create a voter, trimming every field and rejecting empty ones.
    pub fn new(
        national_id: impl AsRef<str>,
        apartment: impl AsRef<str>,
        attendance_apartment: Option<&str>,
    ) -> Result<Self> {
        let national_id = national_id.as_ref().trim();
        let apartment = apartment.as_ref().trim();
        if national_id.is_empty() {
            return Err(Error::bad_request("National ID must not be empty"));
        }
        if apartment.is_empty() {
            return Err(Error::bad_request("Apartment must not be empty"));
        }
        let attendance_apartment = attendance_apartment
            .map(str::trim)
            .filter(|apartment| !apartment.is_empty())
            .map(str::to_string);
        Ok(Self {
            national_id: national_id.to_string(),
            apartment: apartment.to_string(),
            attendance_apartment,
        })
    }

    /// The apartment this voter's ballot must be cast under.
    pub fn voting_apartment(&self) -> &str {
        self.attendance_apartment
            .as_deref()
            .unwrap_or(&self.apartment)
    }
}
