use rocket::{
    data::{Data, ToByteUnit},
    http::Status,
    response::status,
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::voter::NewVoter,
        auth::{AttendanceDesk, AuthToken},
        common::{
            roll::ImportSummary,
            voter::Voter,
            weights::{WeightEntry, WeightTable},
        },
    },
    Assembly,
};

/// Largest roll upload accepted.
const ROLL_LIMIT_MIB: u64 = 2;

pub fn routes() -> Vec<Route> {
    routes![
        register_voter,
        list_voters,
        get_voter,
        import_roll,
        import_weights,
        get_weights,
    ]
}

#[post("/voters", data = "<voter>", format = "json")]
pub async fn register_voter(
    _token: AuthToken,
    voter: Json<NewVoter>,
    assembly: &State<Assembly>,
) -> Result<status::Custom<Json<Voter>>> {
    let voter = assembly.register_voter(voter.0).await?;
    Ok(status::Custom(Status::Created, Json(voter)))
}

#[get("/voters")]
pub async fn list_voters(
    _token: AuthToken<AttendanceDesk>,
    assembly: &State<Assembly>,
) -> Result<Json<Vec<Voter>>> {
    Ok(Json(assembly.list_voters().await?))
}

#[get("/voters/<national_id>")]
pub async fn get_voter(
    _token: AuthToken<AttendanceDesk>,
    national_id: &str,
    assembly: &State<Assembly>,
) -> Result<Json<Voter>> {
    Ok(Json(assembly.lookup_voter(national_id).await?))
}

/// Upload a `cedula,apartamento,peso` roll as the raw request body.
#[post("/voters/import", data = "<roll>")]
pub async fn import_roll(
    _token: AuthToken,
    roll: Data<'_>,
    assembly: &State<Assembly>,
) -> Result<Json<ImportSummary>> {
    let text = roll
        .open(ROLL_LIMIT_MIB.mebibytes())
        .into_string()
        .await
        .map_err(|e| Error::bad_request(format!("Unreadable roll: {e}")))?;
    if !text.is_complete() {
        return Err(Error::Status(
            Status::PayloadTooLarge,
            format!("Rolls are limited to {ROLL_LIMIT_MIB} MiB"),
        ));
    }
    Ok(Json(assembly.import_roll(&text).await?))
}

#[post("/weights", data = "<entries>", format = "json")]
pub async fn import_weights(
    _token: AuthToken,
    entries: Json<Vec<WeightEntry>>,
    assembly: &State<Assembly>,
) -> Result<Json<WeightTable>> {
    Ok(Json(assembly.import_weights(entries.0).await?))
}

#[get("/weights")]
pub async fn get_weights(_token: AuthToken, assembly: &State<Assembly>) -> Result<Json<WeightTable>> {
    Ok(Json(assembly.weights().await?))
}
