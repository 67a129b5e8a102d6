use serde::{Deserialize, Serialize};

/// Body of `POST /attendance/<national_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub apartment: String,
}

/// Body of `PATCH /attendance/<national_id>`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct AttendanceUpdate {
    pub enabled: bool,
}
