use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReplaceOptions, ReturnDocument},
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    common::{
        attendance::AttendanceRecord,
        ballot::Ballot,
        session::{VotingQuestion, VotingSession},
        voter::Voter,
        weights::{WeightEntry, WeightTable},
    },
    db::{DbAttendance, DbBallot, DbQuestion, DbSession, DbVoter, DbWeight},
    mongodb::{ensure_indexes_exist, Coll, Id},
};

use super::{Store, StoreError, StoreResult};

/// A store backed by a MongoDB database. Multi-document writes run in
/// transactions, so the server must be a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    voters: Coll<DbVoter>,
    attendance: Coll<DbAttendance>,
    ballots: Coll<DbBallot>,
    weights: Coll<DbWeight>,
    sessions: Coll<DbSession>,
    questions: Coll<DbQuestion>,
}

impl MongoStore {
    /// Wrap the given database, creating any missing indexes.
    pub async fn new(client: Client, db: &Database) -> StoreResult<Self> {
        ensure_indexes_exist(db).await?;
        Ok(Self {
            client,
            voters: Coll::from_db(db),
            attendance: Coll::from_db(db),
            ballots: Coll::from_db(db),
            weights: Coll::from_db(db),
            sessions: Coll::from_db(db),
            questions: Coll::from_db(db),
        })
    }

    fn upsert() -> ReplaceOptions {
        ReplaceOptions::builder().upsert(true).build()
    }

    fn session_filter(session_id: Option<Id>) -> Document {
        match session_id {
            Some(id) => doc! { "session_id": ObjectId::from(id) },
            None => doc! {},
        }
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn upsert_voter(&self, voter: &Voter) -> StoreResult<()> {
        let filter = doc! { "national_id": &voter.national_id };
        self.voters
            .replace_one(filter, DbVoter::from(voter), Self::upsert())
            .await?;
        Ok(())
    }

    async fn find_voter(&self, national_id: &str) -> StoreResult<Option<Voter>> {
        let filter = doc! { "national_id": national_id };
        Ok(self.voters.find_one(filter, None).await?.map(Into::into))
    }

    async fn list_voters(&self) -> StoreResult<Vec<Voter>> {
        let options = FindOptions::builder().sort(doc! { "national_id": 1 }).build();
        let voters: Vec<DbVoter> = self.voters.find(None, options).await?.try_collect().await?;
        Ok(voters.into_iter().map(Into::into).collect())
    }

    async fn count_voters(&self) -> StoreResult<u64> {
        Ok(self.voters.count_documents(None, None).await?)
    }

    async fn put_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        let filter = doc! { "national_id": &record.national_id };
        self.attendance
            .replace_one(filter, DbAttendance::from(record), Self::upsert())
            .await?;
        Ok(())
    }

    async fn set_attendance_enabled(
        &self,
        national_id: &str,
        enabled: bool,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let filter = doc! { "national_id": national_id };
        let update = doc! { "$set": { "enabled": enabled } };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let record = self
            .attendance
            .find_one_and_update(filter, update, options)
            .await?;
        Ok(record.map(Into::into))
    }

    async fn find_attendance(&self, national_id: &str) -> StoreResult<Option<AttendanceRecord>> {
        let filter = doc! { "national_id": national_id };
        Ok(self.attendance.find_one(filter, None).await?.map(Into::into))
    }

    async fn list_attendance(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let options = FindOptions::builder()
            .sort(doc! { "registered_at": 1, "national_id": 1 })
            .build();
        let records: Vec<DbAttendance> = self
            .attendance
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn has_voted(&self, session_id: Id, national_id: &str) -> StoreResult<bool> {
        let filter = doc! {
            "session_id": ObjectId::from(session_id),
            "national_id": national_id,
        };
        Ok(self.ballots.count_documents(filter, None).await? > 0)
    }

    async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()> {
        // The unique (session_id, national_id) index turns a racing second
        // insert into a duplicate key error.
        self.ballots
            .insert_one(DbBallot::from(ballot), None)
            .await?;
        Ok(())
    }

    async fn list_ballots(&self, session_id: Option<Id>) -> StoreResult<Vec<Ballot>> {
        let options = FindOptions::builder()
            .sort(doc! { "cast_at": 1, "_id": 1 })
            .build();
        let ballots: Vec<DbBallot> = self
            .ballots
            .find(Self::session_filter(session_id), options)
            .await?
            .try_collect()
            .await?;
        Ok(ballots.into_iter().map(Into::into).collect())
    }

    async fn recent_ballots(&self, session_id: Id, limit: usize) -> StoreResult<Vec<Ballot>> {
        let options = FindOptions::builder()
            .sort(doc! { "cast_at": -1, "_id": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();
        let ballots: Vec<DbBallot> = self
            .ballots
            .find(Self::session_filter(Some(session_id)), options)
            .await?
            .try_collect()
            .await?;
        Ok(ballots.into_iter().map(Into::into).collect())
    }

    async fn count_ballots(&self, session_id: Option<Id>) -> StoreResult<u64> {
        Ok(self
            .ballots
            .count_documents(Self::session_filter(session_id), None)
            .await?)
    }

    async fn replace_weights(&self, table: &WeightTable) -> StoreResult<()> {
        let rows: Vec<DbWeight> = table
            .iter()
            .map(|(apartment, weight)| DbWeight {
                apartment: apartment.to_string(),
                weight,
            })
            .collect();

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        self.weights
            .delete_many_with_session(doc! {}, None, &mut session)
            .await?;
        if !rows.is_empty() {
            self.weights
                .insert_many_with_session(rows, None, &mut session)
                .await?;
        }
        session.commit_transaction().await?;
        Ok(())
    }

    async fn load_weights(&self) -> StoreResult<WeightTable> {
        let rows: Vec<DbWeight> = self.weights.find(None, None).await?.try_collect().await?;
        WeightTable::from_entries(rows.into_iter().map(|row| WeightEntry {
            apartment: row.apartment,
            weight: row.weight,
        }))
        .map_err(|e| StoreError::Unavailable(format!("Corrupt weight table: {e}")))
    }

    async fn find_weight(&self, apartment: &str) -> StoreResult<Option<f64>> {
        let filter = doc! { "apartment": apartment.trim() };
        Ok(self
            .weights
            .find_one(filter, None)
            .await?
            .map(|row| row.weight))
    }

    async fn load_session(&self) -> StoreResult<VotingSession> {
        Ok(self
            .sessions
            .find_one(DbSession::current_filter(), None)
            .await?
            .map(Into::into)
            .unwrap_or_default())
    }

    async fn save_session(&self, session: &VotingSession) -> StoreResult<()> {
        self.sessions
            .replace_one(
                DbSession::current_filter(),
                DbSession::from(session),
                Self::upsert(),
            )
            .await?;
        Ok(())
    }

    async fn reset(&self, session: &VotingSession) -> StoreResult<()> {
        let mut db_session = self.client.start_session(None).await?;
        db_session.start_transaction(None).await?;
        let deleted = self
            .ballots
            .delete_many_with_session(doc! {}, None, &mut db_session)
            .await?;
        self.sessions
            .replace_one_with_session(
                DbSession::current_filter(),
                DbSession::from(session),
                Self::upsert(),
                &mut db_session,
            )
            .await?;
        db_session.commit_transaction().await?;
        debug!("Reset deleted {} ballots", deleted.deleted_count);
        Ok(())
    }

    async fn insert_question(&self, question: &VotingQuestion) -> StoreResult<()> {
        self.questions
            .insert_one(DbQuestion::from(question), None)
            .await?;
        Ok(())
    }

    async fn list_questions(&self) -> StoreResult<Vec<VotingQuestion>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let questions: Vec<DbQuestion> = self
            .questions
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(questions.into_iter().map(Into::into).collect())
    }

    async fn find_question(&self, id: Id) -> StoreResult<Option<VotingQuestion>> {
        Ok(self
            .questions
            .find_one(id.as_doc(), None)
            .await?
            .map(Into::into))
    }

    async fn delete_question(&self, id: Id) -> StoreResult<bool> {
        let result = self.questions.delete_one(id.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }
}
