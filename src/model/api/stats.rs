use serde::{Deserialize, Serialize};

use crate::model::common::{attendance::AttendanceStats, session::SessionPhase};

/// Assembly-wide counters for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Ballots cast in the current session.
    pub ballots: u64,
    pub voters: u64,
    /// Apartments with an explicit weight.
    pub apartments: usize,
    pub questions: usize,
    pub phase: SessionPhase,
    pub results_visible: bool,
    pub attendance: AttendanceStats,
}
