use rocket::{
    catcher::Catcher,
    http::Status,
    response::status,
    serde::json::Json,
    Request, Route,
};

use crate::error::ErrorBody;

pub mod attendance;
pub mod auth;
pub mod results;
pub mod session;
pub mod voters;
pub mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(voters::routes());
    routes.extend(attendance::routes());
    routes.extend(session::routes());
    routes.extend(voting::routes());
    routes.extend(results::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Give errors raised outside our handlers (failed guards, malformed JSON,
/// unknown routes) the same JSON shape as [`crate::error::Error`].
#[catch(default)]
fn default_catcher(status: Status, req: &Request) -> status::Custom<Json<ErrorBody>> {
    let error = match status.code {
        400 | 422 => "BadRequest",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "NotFound",
        409 => "Conflict",
        503 => "Unavailable",
        _ => "Error",
    };
    let message = match status.reason() {
        Some(reason) => format!("{reason}: {} {}", req.method(), req.uri()),
        None => format!("{} {}", req.method(), req.uri()),
    };
    status::Custom(status, Json(ErrorBody { error, message }))
}
