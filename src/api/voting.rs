use rocket::{http::Status, response::status, serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::vote::{Admission, VoteRequest, VoterIdentity},
        common::ballot::Ballot,
    },
    Assembly,
};

pub fn routes() -> Vec<Route> {
    routes![validate, vote]
}

/// Check a voter before showing them the ballot. Nothing is recorded.
#[post("/votes/validate", data = "<identity>", format = "json")]
pub async fn validate(
    identity: Json<VoterIdentity>,
    assembly: &State<Assembly>,
) -> Result<Json<Admission>> {
    Ok(Json(assembly.validate(&identity).await?))
}

/// Cast a ballot. Admission is checked again here, so a stale validation
/// cannot be replayed.
#[post("/votes", data = "<request>", format = "json")]
pub async fn vote(
    request: Json<VoteRequest>,
    assembly: &State<Assembly>,
) -> Result<status::Custom<Json<Ballot>>> {
    let ballot = assembly.submit_vote(&request).await?;
    Ok(status::Custom(Status::Created, Json(ballot)))
}
