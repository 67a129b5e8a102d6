use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::model::common::attendance::AttendanceRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbAttendance {
    pub national_id: String,
    pub apartment: String,
    pub enabled: bool,
    pub registered_at: DateTime,
}

impl From<&AttendanceRecord> for DbAttendance {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            national_id: record.national_id.clone(),
            apartment: record.apartment.clone(),
            enabled: record.enabled,
            registered_at: DateTime::from_chrono(record.registered_at),
        }
    }
}

impl From<DbAttendance> for AttendanceRecord {
    fn from(record: DbAttendance) -> Self {
        Self {
            national_id: record.national_id,
            apartment: record.apartment,
            enabled: record.enabled,
            registered_at: record.registered_at.to_chrono(),
        }
    }
}
