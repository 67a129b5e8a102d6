use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Staff privilege levels, lowest first. Higher rights include every
/// lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rights {
    /// Checks residents in and out at the attendance desk.
    AttendanceDesk,
    /// Runs the assembly: roll, weights, questions, voting and results.
    Coordinator,
}

impl Display for Rights {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AttendanceDesk => "attendance desk",
            Self::Coordinator => "coordinator",
        })
    }
}

/// A staff role, used as the type parameter of
/// [`AuthToken`](super::AuthToken) to pick the rights a route requires.
pub trait Role {
    const RIGHTS: Rights;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinator;

impl Role for Coordinator {
    const RIGHTS: Rights = Rights::Coordinator;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceDesk;

impl Role for AttendanceDesk {
    const RIGHTS: Rights = Rights::AttendanceDesk;
}
