use rocket::{
    http::Header,
    response::stream::{Event, EventStream},
    serde::json::Json,
    tokio::{select, sync::broadcast::error::RecvError},
    Responder, Route, Shutdown, State,
};

use crate::{
    error::Result,
    model::{
        api::stats::Stats,
        auth::AuthToken,
        common::{ballot::Ballot, tally::TallyReport},
    },
    Assembly,
};

pub fn routes() -> Vec<Route> {
    routes![tally, recent_ballots, export_ballots, stats, events]
}

/// Administrators always see the per-option breakdown; everyone else only
/// sees it once results are made visible.
#[get("/tally")]
pub async fn tally(
    token: Option<AuthToken>,
    assembly: &State<Assembly>,
) -> Result<Json<TallyReport>> {
    Ok(Json(assembly.tally_report(token.is_some()).await?))
}

#[get("/ballots/recent?<limit>")]
pub async fn recent_ballots(
    _token: AuthToken,
    limit: Option<usize>,
    assembly: &State<Assembly>,
) -> Result<Json<Vec<Ballot>>> {
    Ok(Json(assembly.recent_ballots(limit).await?))
}

#[derive(Responder)]
#[response(content_type = "text/csv")]
pub struct CsvExport {
    body: String,
    disposition: Header<'static>,
}

#[get("/ballots/export")]
pub async fn export_ballots(_token: AuthToken, assembly: &State<Assembly>) -> Result<CsvExport> {
    Ok(CsvExport {
        body: assembly.export_csv().await?,
        disposition: Header::new(
            "Content-Disposition",
            "attachment; filename=\"resultados.csv\"",
        ),
    })
}

#[get("/stats")]
pub async fn stats(_token: AuthToken, assembly: &State<Assembly>) -> Result<Json<Stats>> {
    Ok(Json(assembly.stats().await?))
}

/// Live notifications for result screens. Events never carry vote contents;
/// clients refetch `/tally` when they see one.
#[get("/events")]
pub fn events(assembly: &State<Assembly>, mut end: Shutdown) -> EventStream![] {
    let mut rx = assembly.subscribe();
    EventStream! {
        loop {
            let event = select! {
                msg = rx.recv() => match msg {
                    Ok(event) => event,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Event subscriber skipped {skipped} events");
                        continue;
                    }
                },
                _ = &mut end => break,
            };
            yield Event::json(&event).event(event.name());
        }
    }
}
