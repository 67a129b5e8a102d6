use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::session::SessionPhase;

/// Capacity of the event channel; slow subscribers skip older events.
pub const EVENT_CAPACITY: usize = 256;

/// Something changed that live displays should refresh for.
///
/// Events carry no vote contents, so they are safe to publish to anonymous
/// subscribers even while results are hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AssemblyEvent {
    #[serde(rename_all = "camelCase")]
    BallotCast {
        #[serde(with = "ts_milliseconds")]
        cast_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    SessionChanged {
        phase: SessionPhase,
        results_visible: bool,
    },
    SessionReset,
    AttendanceChanged,
    RollChanged,
}

impl AssemblyEvent {
    /// Name used for the server-sent event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BallotCast { .. } => "ballot",
            Self::SessionChanged { .. } => "session",
            Self::SessionReset => "reset",
            Self::AttendanceChanged => "attendance",
            Self::RollChanged => "roll",
        }
    }
}
