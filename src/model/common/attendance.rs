use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Check-in record for a voter physically present at the assembly.
/// Disabling a record keeps its history but stops the voter from voting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub national_id: String,
    pub apartment: String,
    pub enabled: bool,
    #[serde(with = "ts_milliseconds")]
    pub registered_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// A fresh, enabled check-in.
    pub fn check_in(national_id: &str, apartment: &str, now: DateTime<Utc>) -> Self {
        Self {
            national_id: national_id.to_string(),
            apartment: apartment.to_string(),
            enabled: true,
            registered_at: now,
        }
    }
}

/// Counters shown at the attendance desk.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub enabled: usize,
    pub registered: usize,
}

impl AttendanceStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut stats, record| {
                stats.registered += 1;
                if record.enabled {
                    stats.enabled += 1;
                }
                stats
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_enabled_records() {
        let now = Utc::now();
        let mut disabled = AttendanceRecord::check_in("2", "A102", now);
        disabled.enabled = false;
        let records = vec![
            AttendanceRecord::check_in("1", "A101", now),
            disabled,
            AttendanceRecord::check_in("3", "A103", now),
        ];
        assert_eq!(
            AttendanceStats::from_records(&records),
            AttendanceStats {
                enabled: 2,
                registered: 3
            }
        );
        assert_eq!(AttendanceStats::from_records(&Vec::new()), AttendanceStats::default());
    }
}
