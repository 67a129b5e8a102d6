use rocket::http::Status;

use crate::error::{Error, Result};
use crate::model::{
    api::stats::Stats,
    common::{
        attendance::AttendanceStats,
        ballot::Ballot,
        tally::{Tally, TallyReport},
    },
};

use super::Assembly;

fn export_error(err: impl std::fmt::Display) -> Error {
    Error::Status(
        Status::InternalServerError,
        format!("Failed to write export: {err}"),
    )
}

/// Header of the results export.
pub const EXPORT_HEADER: [&str; 3] = ["Apartamento", "Voto", "Peso"];

impl Assembly {
    /// Every ballot cast in the current session; empty while idle.
    pub async fn session_ballots(&self) -> Result<Vec<Ballot>> {
        let session = self.current_session().await?;
        match session.id {
            Some(id) => {
                self.read("list ballots", || self.store.list_ballots(Some(id)))
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn tally(&self) -> Result<Tally> {
        Ok(Tally::from_ballots(&self.session_ballots().await?))
    }

    /// The tally of the current session. Callers who are not administrators
    /// only get the totals until results are made visible.
    pub async fn tally_report(&self, admin: bool) -> Result<TallyReport> {
        let session = self.current_session().await?;
        let ballots = match session.id {
            Some(id) => {
                self.read("list ballots", || self.store.list_ballots(Some(id)))
                    .await?
            }
            None => Vec::new(),
        };
        let tally = Tally::from_ballots(&ballots);
        let report = TallyReport::new(&tally, session.question.as_ref(), session.results_visible);
        if admin || session.results_visible {
            Ok(report)
        } else {
            Ok(report.summary_only())
        }
    }

    /// The most recent ballots of the current session, newest first. The
    /// count is capped by the configured limit.
    pub async fn recent_ballots(&self, limit: Option<usize>) -> Result<Vec<Ballot>> {
        let limit = limit
            .unwrap_or(self.recent_limit)
            .min(self.recent_limit);
        let session = self.current_session().await?;
        match session.id {
            Some(id) => {
                self.read("recent ballots", || self.store.recent_ballots(id, limit))
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// The current session's ballots as `Apartamento,Voto,Peso` CSV, with
    /// options written as their display labels.
    pub async fn export_csv(&self) -> Result<String> {
        let session = self.current_session().await?;
        let ballots = self.session_ballots().await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(EXPORT_HEADER).map_err(export_error)?;
        for ballot in &ballots {
            let label = session
                .question
                .as_ref()
                .and_then(|q| q.label_for(&ballot.option))
                .unwrap_or(&ballot.option);
            let weight = ballot.weight.to_string();
            writer
                .write_record([ballot.apartment.as_str(), label, weight.as_str()])
                .map_err(export_error)?;
        }
        let bytes = writer.into_inner().map_err(export_error)?;
        String::from_utf8(bytes).map_err(export_error)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let session = self.current_session().await?;
        let ballots = match session.id {
            Some(id) => {
                self.read("count ballots", || self.store.count_ballots(Some(id)))
                    .await?
            }
            None => 0,
        };
        let voters = self.read("count voters", || self.store.count_voters()).await?;
        let apartments = self.weights().await?.len();
        let questions = self.list_questions().await?.len();
        let attendance: AttendanceStats = self.attendance_stats().await?;
        Ok(Stats {
            ballots,
            voters,
            apartments,
            questions,
            phase: session.phase(),
            results_visible: session.results_visible,
            attendance,
        })
    }
}
