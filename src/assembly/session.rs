use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{
    common::session::{QuestionSpec, VotingQuestion, VotingSession},
    mongodb::Id,
};

use super::{Assembly, AssemblyEvent};

impl Assembly {
    pub async fn current_session(&self) -> Result<VotingSession> {
        self.read("load session", || self.store.load_session())
            .await
    }

    /// Open voting on a new question.
    pub async fn start_voting(&self, spec: QuestionSpec) -> Result<VotingSession> {
        let question =
            VotingQuestion::try_from(spec).map_err(|e| Error::bad_request(e.to_string()))?;
        self.open(question).await
    }

    /// Open voting on a question from the question bank.
    pub async fn start_question(&self, question_id: Id) -> Result<VotingSession> {
        let question = self
            .read("find question", || self.store.find_question(question_id))
            .await?
            .ok_or_else(|| Error::not_found(format!("Question {question_id}")))?;
        self.open(question).await
    }

    async fn open(&self, question: VotingQuestion) -> Result<VotingSession> {
        let _guard = self.session_lock.write().await;
        let mut session = self.current_session().await?;
        let session_id = session.start(question, Utc::now())?;
        self.read("save session", || self.store.save_session(&session))
            .await?;
        info!(
            "Voting opened on {:?} (session {session_id})",
            session.question.as_ref().map(|q| &q.title)
        );
        self.publish_session(&session);
        Ok(session)
    }

    /// Close voting. Does nothing if voting is not open.
    pub async fn stop_voting(&self) -> Result<VotingSession> {
        let _guard = self.session_lock.write().await;
        let mut session = self.current_session().await?;
        if session.stop(Utc::now()) {
            self.read("save session", || self.store.save_session(&session))
                .await?;
            info!("Voting closed");
            self.publish_session(&session);
        } else {
            debug!("Stop requested while voting was not open");
        }
        Ok(session)
    }

    pub async fn set_results_visible(&self, visible: bool) -> Result<VotingSession> {
        let _guard = self.session_lock.write().await;
        let mut session = self.current_session().await?;
        session.set_results_visible(visible);
        self.read("save session", || self.store.save_session(&session))
            .await?;
        info!("Results visibility set to {visible}");
        self.publish_session(&session);
        Ok(session)
    }

    /// Delete every ballot and return to idle, in one atomic store operation.
    /// Refused unless `confirm` is set.
    pub async fn reset_session(&self, confirm: bool) -> Result<VotingSession> {
        if !confirm {
            return Err(Error::bad_request(
                "Reset deletes every ballot; set `confirm` to true to proceed",
            ));
        }
        let _guard = self.session_lock.write().await;
        let mut session = self.current_session().await?;
        session.reset();
        self.read("reset session", || self.store.reset(&session))
            .await?;
        warn!("Voting session reset; all ballots deleted");
        self.publish(AssemblyEvent::SessionReset);
        Ok(session)
    }

    fn publish_session(&self, session: &VotingSession) {
        self.publish(AssemblyEvent::SessionChanged {
            phase: session.phase(),
            results_visible: session.results_visible,
        });
    }

    /// Add a question to the question bank.
    pub async fn create_question(&self, spec: QuestionSpec) -> Result<VotingQuestion> {
        let question =
            VotingQuestion::try_from(spec).map_err(|e| Error::bad_request(e.to_string()))?;
        self.write_once("insert question", self.store.insert_question(&question))
            .await?;
        info!("Created question {} ({})", question.id, question.title);
        Ok(question)
    }

    pub async fn list_questions(&self) -> Result<Vec<VotingQuestion>> {
        self.read("list questions", || self.store.list_questions())
            .await
    }

    /// Remove a question from the bank. A session already voting on it keeps
    /// its own copy.
    pub async fn delete_question(&self, question_id: Id) -> Result<()> {
        let deleted = self
            .read("delete question", || self.store.delete_question(question_id))
            .await?;
        if deleted {
            info!("Deleted question {question_id}");
            Ok(())
        } else {
            Err(Error::not_found(format!("Question {question_id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::tokio::sync::broadcast::error::TryRecvError;

    use crate::model::common::session::SessionPhase;

    use super::*;

    #[rocket::async_test]
    async fn start_stop_restart() {
        let assembly = Assembly::example();
        let mut events = assembly.subscribe();

        let first = assembly.start_voting(QuestionSpec::example()).await.unwrap();
        assert_eq!(first.phase(), SessionPhase::Open);
        assert!(first.started_at.is_some());
        assert_eq!(
            events.try_recv(),
            Ok(AssemblyEvent::SessionChanged {
                phase: SessionPhase::Open,
                results_visible: false
            })
        );

        assert!(matches!(
            assembly.start_voting(QuestionSpec::example()).await,
            Err(Error::AlreadyActive)
        ));

        let closed = assembly.stop_voting().await.unwrap();
        assert_eq!(closed.phase(), SessionPhase::Closed);
        assert!(closed.ended_at.is_some());
        assert_eq!(closed.id, first.id);

        // Stopping again is a no-op.
        let _ = events.try_recv();
        assert_eq!(assembly.stop_voting().await.unwrap(), closed);
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        let second = assembly.start_voting(QuestionSpec::example()).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.ended_at, None);
    }

    #[rocket::async_test]
    async fn invalid_questions_are_bad_requests() {
        let assembly = Assembly::example();
        let mut spec = QuestionSpec::example();
        spec.options.truncate(1);
        assert!(matches!(
            assembly.start_voting(spec.clone()).await,
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            assembly.create_question(spec).await,
            Err(Error::BadRequest(_))
        ));
        assert_eq!(
            assembly.current_session().await.unwrap().phase(),
            SessionPhase::Idle
        );
    }

    #[rocket::async_test]
    async fn reset_requires_confirmation() {
        let assembly = Assembly::example();
        assembly.set_results_visible(true).await.unwrap();
        assembly.start_voting(QuestionSpec::example()).await.unwrap();

        assert!(matches!(
            assembly.reset_session(false).await,
            Err(Error::BadRequest(_))
        ));
        assert_eq!(
            assembly.current_session().await.unwrap().phase(),
            SessionPhase::Open
        );

        let session = assembly.reset_session(true).await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.question, None);
        assert_eq!(session.started_at, None);
        assert!(session.results_visible);
        assert_eq!(assembly.current_session().await.unwrap(), session);
    }

    #[rocket::async_test]
    async fn question_bank() {
        let assembly = Assembly::example();
        let question = assembly
            .create_question(QuestionSpec::example())
            .await
            .unwrap();
        assert_eq!(assembly.list_questions().await.unwrap(), vec![question.clone()]);

        let session = assembly.start_question(question.id).await.unwrap();
        assert_eq!(session.question.as_ref(), Some(&question));

        assembly.delete_question(question.id).await.unwrap();
        assert!(matches!(
            assembly.delete_question(question.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            assembly.start_question(question.id).await,
            Err(Error::NotFound(_))
        ));
        // The open session keeps its copy.
        assert_eq!(
            assembly.current_session().await.unwrap().question,
            Some(question)
        );
    }
}
