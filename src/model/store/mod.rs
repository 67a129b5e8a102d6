//! Persistence behind the assembly service.
//!
//! [`Store`] is the seam between the voting rules and the database: the
//! rules only ever see domain types and [`StoreError`]s. Two implementations
//! exist, [`MongoStore`] for deployments and [`MemoryStore`] for tests and
//! single-process use. Both enforce the same uniqueness constraints.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use thiserror::Error;

use crate::model::{
    common::{
        attendance::AttendanceRecord,
        ballot::Ballot,
        session::{VotingQuestion, VotingSession},
        voter::Voter,
        weights::WeightTable,
    },
    mongodb::Id,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached, timed out, or failed the operation.
    #[error("{0}")]
    Unavailable(String),
    /// A write collided with a unique key.
    #[error("{0}")]
    Duplicate(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if crate::model::mongodb::is_duplicate_key_error(&err) {
            Self::Duplicate(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the voter with this voter's national ID.
    async fn upsert_voter(&self, voter: &Voter) -> StoreResult<()>;
    async fn find_voter(&self, national_id: &str) -> StoreResult<Option<Voter>>;
    async fn list_voters(&self) -> StoreResult<Vec<Voter>>;
    async fn count_voters(&self) -> StoreResult<u64>;

    /// Insert or replace the attendance record with this national ID.
    async fn put_attendance(&self, record: &AttendanceRecord) -> StoreResult<()>;
    /// Set the `enabled` flag of an existing record and return the updated
    /// record, or `None` if there is no record. Never creates one.
    async fn set_attendance_enabled(
        &self,
        national_id: &str,
        enabled: bool,
    ) -> StoreResult<Option<AttendanceRecord>>;
    async fn find_attendance(&self, national_id: &str) -> StoreResult<Option<AttendanceRecord>>;
    async fn list_attendance(&self) -> StoreResult<Vec<AttendanceRecord>>;

    async fn has_voted(&self, session_id: Id, national_id: &str) -> StoreResult<bool>;
    /// Append a ballot. Fails with [`StoreError::Duplicate`], leaving the
    /// store unchanged, if a ballot for the same session and national ID
    /// already exists.
    async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()>;
    /// Every ballot, or only those of one session, oldest first.
    async fn list_ballots(&self, session_id: Option<Id>) -> StoreResult<Vec<Ballot>>;
    /// The `limit` most recent ballots of a session, newest first.
    async fn recent_ballots(&self, session_id: Id, limit: usize) -> StoreResult<Vec<Ballot>>;
    async fn count_ballots(&self, session_id: Option<Id>) -> StoreResult<u64>;

    /// Replace the whole weight table.
    async fn replace_weights(&self, table: &WeightTable) -> StoreResult<()>;
    async fn load_weights(&self) -> StoreResult<WeightTable>;
    async fn find_weight(&self, apartment: &str) -> StoreResult<Option<f64>>;

    /// The live session; a default (idle) session if none was saved yet.
    async fn load_session(&self) -> StoreResult<VotingSession>;
    async fn save_session(&self, session: &VotingSession) -> StoreResult<()>;
    /// Atomically delete every ballot and save `session`.
    async fn reset(&self, session: &VotingSession) -> StoreResult<()>;

    async fn insert_question(&self, question: &VotingQuestion) -> StoreResult<()>;
    async fn list_questions(&self) -> StoreResult<Vec<VotingQuestion>>;
    async fn find_question(&self, id: Id) -> StoreResult<Option<VotingQuestion>>;
    /// Returns whether a question was deleted.
    async fn delete_question(&self, id: Id) -> StoreResult<bool>;
}
