use chrono::Utc;
use rocket::tokio::try_join;

use crate::error::{Error, Rejection, Result};
use crate::model::{
    api::vote::{Admission, VoteRequest, VoterIdentity},
    common::{
        attendance::AttendanceRecord,
        ballot::{Ballot, DEFAULT_WEIGHT},
        session::VotingQuestion,
        voter::Voter,
    },
    mongodb::Id,
    store::StoreError,
};

use super::{Assembly, AssemblyEvent};

/// Decide whether a voter may cast a ballot for `apartment`, given what the
/// store knows about them in an open session. Failures are reported in a
/// fixed order: duplicate, not registered, apartment mismatch, not checked in.
pub fn check_admission(
    already_voted: bool,
    voter: Option<&Voter>,
    attendance: Option<&AttendanceRecord>,
    apartment: &str,
) -> std::result::Result<(), Rejection> {
    if already_voted {
        return Err(Rejection::AlreadyVoted);
    }
    let voter = voter.ok_or(Rejection::VoterNotRegistered)?;
    if voter.voting_apartment().trim() != apartment.trim() {
        return Err(Rejection::ApartmentMismatch);
    }
    match attendance {
        Some(record) if record.enabled => Ok(()),
        _ => Err(Rejection::NotCheckedIn),
    }
}

/// An admitted voter, ready to have a ballot recorded.
struct Admitted {
    session_id: Id,
    question: VotingQuestion,
    weight: f64,
}

impl Assembly {
    /// Check whether the voter could vote right now, without voting.
    pub async fn validate(&self, identity: &VoterIdentity) -> Result<Admission> {
        let admitted = self.admit(identity).await?;
        Ok(Admission::admitted(admitted.weight))
    }

    /// Validate from scratch and record the ballot.
    pub async fn submit_vote(&self, request: &VoteRequest) -> Result<Ballot> {
        // Held until the ballot is stored: no stop or reset in between.
        let _ballot_box = self.session_lock.read().await;
        let admitted = self.admit(&request.voter).await?;

        let option = admitted.question.option(&request.option).ok_or_else(|| {
            info!(
                "Rejected ballot from {}: unknown option {:?}",
                request.voter.national_id, request.option
            );
            Error::from(Rejection::InvalidOption)
        })?;

        let ballot = Ballot {
            session_id: admitted.session_id,
            national_id: request.voter.national_id.trim().to_string(),
            apartment: request.voter.apartment.trim().to_string(),
            option: option.key.clone(),
            weight: admitted.weight,
            cast_at: Utc::now(),
        };

        // Never retried: a timed-out insert may still have landed.
        match self
            .retry
            .once("insert ballot", self.store.insert_ballot(&ballot))
            .await
        {
            Ok(()) => (),
            Err(StoreError::Duplicate(_)) => {
                info!("Rejected concurrent duplicate ballot from {}", ballot.national_id);
                return Err(Rejection::AlreadyVoted.into());
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "Accepted ballot from {} (apartment {}, weight {})",
            ballot.national_id, ballot.apartment, ballot.weight
        );
        self.publish(AssemblyEvent::BallotCast {
            cast_at: ballot.cast_at,
        });
        Ok(ballot)
    }

    /// Run the admission pipeline: the session check, then the independent
    /// lookups concurrently, then the decision.
    async fn admit(&self, identity: &VoterIdentity) -> Result<Admitted> {
        let national_id = identity.national_id.trim();
        let apartment = identity.apartment.trim();

        let session = self.current_session().await?;
        let (session_id, question) = match session.ballot_box() {
            Some((id, question)) => (id, question.clone()),
            None => {
                info!("Rejected {national_id}: voting is not open");
                return Err(Rejection::SessionInactive.into());
            }
        };

        let (already_voted, voter, attendance, weight) = try_join!(
            self.read("check vote", || self.store.has_voted(session_id, national_id)),
            self.read("find voter", || self.store.find_voter(national_id)),
            self.read("find attendance", || self.store.find_attendance(national_id)),
            self.read("find weight", || self.store.find_weight(apartment)),
        )?;

        if let Err(rejection) =
            check_admission(already_voted, voter.as_ref(), attendance.as_ref(), apartment)
        {
            info!("Rejected {national_id} for apartment {apartment}: {rejection}");
            return Err(rejection.into());
        }

        Ok(Admitted {
            session_id,
            question,
            weight: weight.unwrap_or(DEFAULT_WEIGHT),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use rocket::tokio::{spawn, time::sleep};

    use crate::assembly::RetryPolicy;
    use crate::model::{
        api::voter::NewVoter,
        common::{
            session::{QuestionSpec, SessionPhase, VotingSession},
            weights::{WeightEntry, WeightTable},
        },
        store::{MemoryStore, Store, StoreResult},
    };

    use super::*;

    fn record(enabled: bool) -> AttendanceRecord {
        let mut record = AttendanceRecord::check_in("123456789", "A101", Utc::now());
        record.enabled = enabled;
        record
    }

    #[test]
    fn admission_precedence() {
        let voter = Voter::example();
        let enabled = record(true);
        let disabled = record(false);

        assert_eq!(
            check_admission(true, None, None, "Z999"),
            Err(Rejection::AlreadyVoted)
        );
        assert_eq!(
            check_admission(false, None, Some(&enabled), "A101"),
            Err(Rejection::VoterNotRegistered)
        );
        assert_eq!(
            check_admission(false, Some(&voter), None, "A102"),
            Err(Rejection::ApartmentMismatch)
        );
        assert_eq!(
            check_admission(false, Some(&voter), None, "A101"),
            Err(Rejection::NotCheckedIn)
        );
        assert_eq!(
            check_admission(false, Some(&voter), Some(&disabled), "A101"),
            Err(Rejection::NotCheckedIn)
        );
        assert_eq!(
            check_admission(false, Some(&voter), Some(&enabled), " A101 "),
            Ok(())
        );
    }

    #[test]
    fn attendance_apartment_overrides_registry() {
        let voter = Voter::new("123456789", "A101", Some("B202")).unwrap();
        let enabled = record(true);
        assert_eq!(
            check_admission(false, Some(&voter), Some(&enabled), "A101"),
            Err(Rejection::ApartmentMismatch)
        );
        assert_eq!(
            check_admission(false, Some(&voter), Some(&enabled), "B202"),
            Ok(())
        );
    }

    /// Register, weigh and check in the example voter, and open voting.
    async fn ready_assembly() -> Assembly {
        let assembly = Assembly::example();
        prepare(&assembly).await;
        assembly
    }

    async fn prepare(assembly: &Assembly) {
        assembly.register_voter(NewVoter::example()).await.unwrap();
        assembly
            .import_weights(vec![WeightEntry {
                apartment: "A101".to_string(),
                weight: 1.5,
            }])
            .await
            .unwrap();
        assembly
            .register_attendance("123456789", "A101")
            .await
            .unwrap();
        assembly
            .start_voting(QuestionSpec::example())
            .await
            .unwrap();
    }

    #[rocket::async_test]
    async fn example_voter_is_admitted_with_weight() {
        let assembly = ready_assembly().await;
        let admission = assembly.validate(&VoterIdentity::example()).await.unwrap();
        assert_eq!(admission, Admission::admitted(1.5));

        let ballot = assembly
            .submit_vote(&VoteRequest::new(VoterIdentity::example(), " SÍ "))
            .await
            .unwrap();
        assert_eq!(ballot.option, "sí");
        assert_eq!(ballot.weight, 1.5);
        assert_eq!(ballot.apartment, "A101");

        // A second attempt is a duplicate, whatever the option.
        let err = assembly
            .submit_vote(&VoteRequest::new(VoterIdentity::example(), "No"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::AlreadyVoted)));
        let err = assembly
            .validate(&VoterIdentity::example())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::AlreadyVoted)));
    }

    #[rocket::async_test]
    async fn unweighted_apartments_weigh_one() {
        let assembly = ready_assembly().await;
        assembly.register_voter(Voter::example2().into()).await.unwrap();
        assembly
            .register_attendance("987654321", "A102")
            .await
            .unwrap();
        let admission = assembly
            .validate(&VoterIdentity::example2())
            .await
            .unwrap();
        assert_eq!(admission.weight, DEFAULT_WEIGHT);
    }

    #[rocket::async_test]
    async fn rejections() {
        let assembly = Assembly::example();

        // Nothing is open yet.
        let err = assembly
            .validate(&VoterIdentity::example())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::SessionInactive)));

        let assembly = ready_assembly().await;
        let unknown = VoterIdentity {
            national_id: "000".to_string(),
            apartment: "A101".to_string(),
        };
        let err = assembly.validate(&unknown).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::VoterNotRegistered)));

        let mut mismatch = VoterIdentity::example();
        mismatch.apartment = "A102".to_string();
        let err = assembly.validate(&mismatch).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::ApartmentMismatch)));

        let err = assembly
            .submit_vote(&VoteRequest::new(VoterIdentity::example(), "Tal vez"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::InvalidOption)));

        assembly
            .set_attendance_enabled("123456789", false)
            .await
            .unwrap();
        let err = assembly
            .validate(&VoterIdentity::example())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::NotCheckedIn)));

        assembly.stop_voting().await.unwrap();
        let err = assembly
            .submit_vote(&VoteRequest::new(VoterIdentity::example(), "Sí"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::SessionInactive)));
    }

    #[test]
    fn concurrent_duplicates_admit_exactly_one() {
        let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let assembly = ready_assembly().await;
            let tasks: Vec<_> = (0..16)
                .map(|i| {
                    let assembly = assembly.clone();
                    let option = if i % 2 == 0 { "Sí" } else { "No" };
                    rocket::tokio::spawn(async move {
                        assembly
                            .submit_vote(&VoteRequest::new(VoterIdentity::example(), option))
                            .await
                    })
                })
                .collect();

            let mut accepted = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => accepted += 1,
                    Err(err) => assert!(matches!(err, Error::Rejected(Rejection::AlreadyVoted))),
                }
            }
            assert_eq!(accepted, 1);

            let ballots = assembly.session_ballots().await.unwrap();
            assert_eq!(ballots.len(), 1);
            let voters: HashSet<_> = ballots.iter().map(|b| &b.national_id).collect();
            assert_eq!(voters.len(), 1);
        });
    }

    /// A memory store whose weight lookups take a while, so a vote can be
    /// caught between admission and insertion.
    struct SlowWeights {
        inner: MemoryStore,
        delay: Duration,
    }

    #[rocket::async_trait]
    impl Store for SlowWeights {
        async fn upsert_voter(&self, voter: &Voter) -> StoreResult<()> {
            self.inner.upsert_voter(voter).await
        }
        async fn find_voter(&self, national_id: &str) -> StoreResult<Option<Voter>> {
            self.inner.find_voter(national_id).await
        }
        async fn list_voters(&self) -> StoreResult<Vec<Voter>> {
            self.inner.list_voters().await
        }
        async fn count_voters(&self) -> StoreResult<u64> {
            self.inner.count_voters().await
        }
        async fn put_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
            self.inner.put_attendance(record).await
        }
        async fn set_attendance_enabled(
            &self,
            national_id: &str,
            enabled: bool,
        ) -> StoreResult<Option<AttendanceRecord>> {
            self.inner.set_attendance_enabled(national_id, enabled).await
        }
        async fn find_attendance(&self, national_id: &str) -> StoreResult<Option<AttendanceRecord>> {
            self.inner.find_attendance(national_id).await
        }
        async fn list_attendance(&self) -> StoreResult<Vec<AttendanceRecord>> {
            self.inner.list_attendance().await
        }
        async fn has_voted(&self, session_id: Id, national_id: &str) -> StoreResult<bool> {
            self.inner.has_voted(session_id, national_id).await
        }
        async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()> {
            self.inner.insert_ballot(ballot).await
        }
        async fn list_ballots(&self, session_id: Option<Id>) -> StoreResult<Vec<Ballot>> {
            self.inner.list_ballots(session_id).await
        }
        async fn recent_ballots(&self, session_id: Id, limit: usize) -> StoreResult<Vec<Ballot>> {
            self.inner.recent_ballots(session_id, limit).await
        }
        async fn count_ballots(&self, session_id: Option<Id>) -> StoreResult<u64> {
            self.inner.count_ballots(session_id).await
        }
        async fn replace_weights(&self, table: &WeightTable) -> StoreResult<()> {
            self.inner.replace_weights(table).await
        }
        async fn load_weights(&self) -> StoreResult<WeightTable> {
            self.inner.load_weights().await
        }
        async fn find_weight(&self, apartment: &str) -> StoreResult<Option<f64>> {
            sleep(self.delay).await;
            self.inner.find_weight(apartment).await
        }
        async fn load_session(&self) -> StoreResult<VotingSession> {
            self.inner.load_session().await
        }
        async fn save_session(&self, session: &VotingSession) -> StoreResult<()> {
            self.inner.save_session(session).await
        }
        async fn reset(&self, session: &VotingSession) -> StoreResult<()> {
            self.inner.reset(session).await
        }
        async fn insert_question(&self, question: &VotingQuestion) -> StoreResult<()> {
            self.inner.insert_question(question).await
        }
        async fn list_questions(&self) -> StoreResult<Vec<VotingQuestion>> {
            self.inner.list_questions().await
        }
        async fn find_question(&self, id: Id) -> StoreResult<Option<VotingQuestion>> {
            self.inner.find_question(id).await
        }
        async fn delete_question(&self, id: Id) -> StoreResult<bool> {
            self.inner.delete_question(id).await
        }
    }

    /// A ready assembly whose votes stall in admission for 200ms.
    async fn slow_assembly() -> (Assembly, Arc<SlowWeights>) {
        let store = Arc::new(SlowWeights {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(200),
        });
        let assembly = Assembly::new(store.clone(), RetryPolicy::new(1000, 1, 1), 5);
        prepare(&assembly).await;
        (assembly, store)
    }

    #[rocket::async_test]
    async fn reset_waits_for_votes_in_flight() {
        let (assembly, store) = slow_assembly().await;

        let voting = assembly.clone();
        let vote = spawn(async move {
            voting
                .submit_vote(&VoteRequest::new(VoterIdentity::example(), "Sí"))
                .await
        });
        // Let the vote get admitted and stall on the weight lookup.
        sleep(Duration::from_millis(50)).await;

        let session = assembly.reset_session(true).await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(vote.await.unwrap().is_ok());

        // The reset came after the ballot, so nothing is left behind.
        assert!(store.list_ballots(None).await.unwrap().is_empty());
        assert_eq!(assembly.tally().await.unwrap().total_count, 0);
    }

    #[rocket::async_test]
    async fn stop_waits_for_votes_in_flight() {
        let (assembly, _) = slow_assembly().await;

        let voting = assembly.clone();
        let vote = spawn(async move {
            voting
                .submit_vote(&VoteRequest::new(VoterIdentity::example(), "No"))
                .await
        });
        sleep(Duration::from_millis(50)).await;

        let closed = assembly.stop_voting().await.unwrap();
        let ballot = vote.await.unwrap().unwrap();
        assert_eq!(closed.id, Some(ballot.session_id));
        assert!(ballot.cast_at <= closed.ended_at.unwrap());
        assert_eq!(assembly.tally().await.unwrap().total_count, 1);

        // Once closed, later votes are refused.
        let err = assembly
            .submit_vote(&VoteRequest::new(VoterIdentity::example2(), "No"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::SessionInactive)));
    }
}
