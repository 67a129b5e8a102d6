use std::collections::BTreeMap;

use rocket::tokio::sync::Mutex;

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

use super::{Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    voters: BTreeMap<String, Voter>,
    attendance: BTreeMap<String, AttendanceRecord>,
    /// In insertion order.
    ballots: Vec<Ballot>,
    weights: WeightTable,
    session: VotingSession,
    /// In creation order.
    questions: Vec<VotingQuestion>,
}

/// A store held entirely in process memory. Every operation takes a single
/// lock, so each one is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn upsert_voter(&self, voter: &Voter) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .voters
            .insert(voter.national_id.clone(), voter.clone());
        Ok(())
    }

    async fn find_voter(&self, national_id: &str) -> StoreResult<Option<Voter>> {
        Ok(self.state.lock().await.voters.get(national_id).cloned())
    }

    async fn list_voters(&self) -> StoreResult<Vec<Voter>> {
        Ok(self.state.lock().await.voters.values().cloned().collect())
    }

    async fn count_voters(&self) -> StoreResult<u64> {
        Ok(self.state.lock().await.voters.len() as u64)
    }

    async fn put_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .attendance
            .insert(record.national_id.clone(), record.clone());
        Ok(())
    }

    async fn set_attendance_enabled(
        &self,
        national_id: &str,
        enabled: bool,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut state = self.state.lock().await;
        Ok(state.attendance.get_mut(national_id).map(|record| {
            record.enabled = enabled;
            record.clone()
        }))
    }

    async fn find_attendance(&self, national_id: &str) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.state.lock().await.attendance.get(national_id).cloned())
    }

    async fn list_attendance(&self) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(self.state.lock().await.attendance.values().cloned().collect())
    }

    async fn has_voted(&self, session_id: Id, national_id: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .ballots
            .iter()
            .any(|b| b.session_id == session_id && b.national_id == national_id))
    }

    async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let duplicate = state
            .ballots
            .iter()
            .any(|b| b.session_id == ballot.session_id && b.national_id == ballot.national_id);
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "ballot for {} in session {}",
                ballot.national_id, ballot.session_id
            )));
        }
        state.ballots.push(ballot.clone());
        Ok(())
    }

    async fn list_ballots(&self, session_id: Option<Id>) -> StoreResult<Vec<Ballot>> {
        let state = self.state.lock().await;
        Ok(state
            .ballots
            .iter()
            .filter(|b| session_id.map_or(true, |id| b.session_id == id))
            .cloned()
            .collect())
    }

    async fn recent_ballots(&self, session_id: Id, limit: usize) -> StoreResult<Vec<Ballot>> {
        let state = self.state.lock().await;
        Ok(state
            .ballots
            .iter()
            .rev()
            .filter(|b| b.session_id == session_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_ballots(&self, session_id: Option<Id>) -> StoreResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .ballots
            .iter()
            .filter(|b| session_id.map_or(true, |id| b.session_id == id))
            .count() as u64)
    }

    async fn replace_weights(&self, table: &WeightTable) -> StoreResult<()> {
        self.state.lock().await.weights = table.clone();
        Ok(())
    }

    async fn load_weights(&self) -> StoreResult<WeightTable> {
        Ok(self.state.lock().await.weights.clone())
    }

    async fn find_weight(&self, apartment: &str) -> StoreResult<Option<f64>> {
        Ok(self.state.lock().await.weights.get(apartment))
    }

    async fn load_session(&self) -> StoreResult<VotingSession> {
        Ok(self.state.lock().await.session.clone())
    }

    async fn save_session(&self, session: &VotingSession) -> StoreResult<()> {
        self.state.lock().await.session = session.clone();
        Ok(())
    }

    async fn reset(&self, session: &VotingSession) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.ballots.clear();
        state.session = session.clone();
        Ok(())
    }

    async fn insert_question(&self, question: &VotingQuestion) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.questions.iter().any(|q| q.id == question.id) {
            return Err(StoreError::Duplicate(format!("question {}", question.id)));
        }
        state.questions.push(question.clone());
        Ok(())
    }

    async fn list_questions(&self) -> StoreResult<Vec<VotingQuestion>> {
        Ok(self.state.lock().await.questions.clone())
    }

    async fn find_question(&self, id: Id) -> StoreResult<Option<VotingQuestion>> {
        let state = self.state.lock().await;
        Ok(state.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn delete_question(&self, id: Id) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.questions.len();
        state.questions.retain(|q| q.id != id);
        Ok(state.questions.len() != before)
    }
}
