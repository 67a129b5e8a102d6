use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::admin::AdminCredentials,
        auth::{AttendanceDesk, AuthToken, Coordinator, Rights, AUTH_TOKEN_COOKIE},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate, logout]
}

/// Log in as the coordinator or the attendance desk. Responds with the
/// rights granted.
#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    config: &State<Config>,
) -> Result<Json<Rights>> {
    let Some(rights) = config.authenticate(&credentials) else {
        warn!("Failed staff login for {:?}", credentials.username);
        return Err(Error::Unauthorized(
            "No staff account found with the provided username and password combination."
                .to_string(),
        ));
    };

    let username = credentials.0.username;
    let cookie = match rights {
        Rights::Coordinator => AuthToken::<Coordinator>::new(username).into_cookie(config)?,
        Rights::AttendanceDesk => AuthToken::<AttendanceDesk>::new(username).into_cookie(config)?,
    };
    cookies.add(cookie);
    info!("Staff login with {rights} rights");
    Ok(Json(rights))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
