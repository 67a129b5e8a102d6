use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{DbAttendance, DbBallot, DbQuestion, DbSession, DbVoter, DbWeight};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for DbVoter {
    const NAME: &'static str = "voters";
}

impl MongoCollection for DbAttendance {
    const NAME: &'static str = "attendance";
}

impl MongoCollection for DbBallot {
    const NAME: &'static str = "ballots";
}

impl MongoCollection for DbWeight {
    const NAME: &'static str = "weights";
}

impl MongoCollection for DbSession {
    const NAME: &'static str = "sessions";
}

impl MongoCollection for DbQuestion {
    const NAME: &'static str = "questions";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter roll.
    let voter_index = IndexModel::builder()
        .keys(doc! {"national_id": 1})
        .options(unique.clone())
        .build();
    Coll::<DbVoter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Attendance ledger.
    let attendance_index = IndexModel::builder()
        .keys(doc! {"national_id": 1})
        .options(unique.clone())
        .build();
    Coll::<DbAttendance>::from_db(db)
        .create_index(attendance_index, None)
        .await?;

    // Ballots: one per voter per session.
    let ballot_index = IndexModel::builder()
        .keys(doc! {"session_id": 1, "national_id": 1})
        .options(unique.clone())
        .build();
    Coll::<DbBallot>::from_db(db)
        .create_index(ballot_index, None)
        .await?;
    let recent_index = IndexModel::builder()
        .keys(doc! {"session_id": 1, "cast_at": -1})
        .build();
    Coll::<DbBallot>::from_db(db)
        .create_index(recent_index, None)
        .await?;

    // Weight table.
    let weight_index = IndexModel::builder()
        .keys(doc! {"apartment": 1})
        .options(unique)
        .build();
    Coll::<DbWeight>::from_db(db)
        .create_index(weight_index, None)
        .await?;

    Ok(())
}
