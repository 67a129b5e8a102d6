use chrono::Utc;

use crate::error::{Error, Rejection, Result};
use crate::model::common::attendance::{AttendanceRecord, AttendanceStats};

use super::{Assembly, AssemblyEvent};

impl Assembly {
    /// Check a voter in at the assembly. The voter must be on the roll and
    /// the apartment must be the one on file.
    pub async fn register_attendance(
        &self,
        national_id: &str,
        apartment: &str,
    ) -> Result<AttendanceRecord> {
        let national_id = national_id.trim();
        let apartment = apartment.trim();
        let voter = self
            .read("find voter", || self.store.find_voter(national_id))
            .await?;
        match voter {
            Some(voter) if voter.apartment == apartment => (),
            _ => {
                info!("Refused check-in of {national_id} for apartment {apartment}");
                return Err(Rejection::VoterNotRegistered.into());
            }
        }

        let record = AttendanceRecord::check_in(national_id, apartment, Utc::now());
        self.read("put attendance", || self.store.put_attendance(&record))
            .await?;
        info!("Checked in {national_id} for apartment {apartment}");
        self.publish(AssemblyEvent::AttendanceChanged);
        Ok(record)
    }

    /// Enable or disable an existing check-in.
    pub async fn set_attendance_enabled(
        &self,
        national_id: &str,
        enabled: bool,
    ) -> Result<AttendanceRecord> {
        let national_id = national_id.trim();
        let record = self
            .read("set attendance", || {
                self.store.set_attendance_enabled(national_id, enabled)
            })
            .await?
            .ok_or_else(|| Error::not_found(format!("Attendance record for {national_id}")))?;
        info!("Attendance of {national_id} set to enabled={enabled}");
        self.publish(AssemblyEvent::AttendanceChanged);
        Ok(record)
    }

    pub async fn attendance_status(&self, national_id: &str) -> Result<AttendanceRecord> {
        let national_id = national_id.trim();
        self.read("find attendance", || self.store.find_attendance(national_id))
            .await?
            .ok_or_else(|| Error::not_found(format!("Attendance record for {national_id}")))
    }

    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        self.read("list attendance", || self.store.list_attendance())
            .await
    }

    pub async fn attendance_stats(&self) -> Result<AttendanceStats> {
        let records = self.list_attendance().await?;
        Ok(AttendanceStats::from_records(&records))
    }
}
