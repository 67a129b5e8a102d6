use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{self, FromRequest},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Config;

use super::rights::{Coordinator, Rights, Role};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Proof that the request comes from logged-in staff with at least the
/// rights of `R`. A bare `AuthToken` requires the coordinator.
///
/// Voters never authenticate: the national ID they type in is trusted and
/// only checked against the roll and the attendance ledger.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<R = Coordinator> {
    #[serde(rename = "sub")]
    username: String,
    #[serde(rename = "rgt")]
    rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R: Role> AuthToken<R> {
    /// A token for `username` with exactly the rights of `R`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            rights: R::RIGHTS,
            phantom: PhantomData,
        }
    }
}

impl<R> AuthToken<R> {
    /// The staff member this token was issued to.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn rights(&self) -> Rights {
        self.rights
    }

    /// Does this token carry `target` rights or more?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights >= target
    }

    /// Sign this token into a cookie that expires after the configured TTL.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>, JwtError> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(time::Duration::seconds(config.auth_ttl().num_seconds()))
            .same_site(SameSite::Strict)
            .http_only(true)
            .finish())
    }

    /// Deserialize a token from a cookie, checking signature and expiry.
    /// The rights are whatever the cookie was issued with.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role + Send,
{
    type Error = Error;

    /// Get an AuthToken from the cookie and check it grants the rights of
    /// `R`. Fails with 401 if the cookie is missing, forged or expired, and
    /// with 403 if the rights fall short; wrap the guard in `Option` for
    /// routes that also serve anonymous callers.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                let err = Error::Status(Status::InternalServerError, "Config not loaded".into());
                return request::Outcome::Failure((Status::InternalServerError, err));
            }
        };

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                let err = Error::Unauthorized("Staff login required".to_string());
                return request::Outcome::Failure((Status::Unauthorized, err));
            }
        };

        let token = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(err) => {
                debug!("Rejected auth token: {err}");
                return request::Outcome::Failure((Status::Unauthorized, err.into()));
            }
        };

        if token.permits(R::RIGHTS) {
            request::Outcome::Success(token)
        } else {
            let err = Error::Forbidden(format!(
                "{} has {} rights; {} required",
                token.username, token.rights, R::RIGHTS
            ));
            request::Outcome::Failure((Status::Forbidden, err))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::model::auth::AttendanceDesk;

    use super::*;

    #[test]
    fn cookie_round_trip() {
        let config = Config::example();
        let cookie = AuthToken::<Coordinator>::new("coordinator")
            .into_cookie(&config)
            .unwrap();
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));

        let token = AuthToken::<Coordinator>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(token.username(), "coordinator");
        assert_eq!(token.rights(), Rights::Coordinator);
    }

    #[test]
    fn coordinator_outranks_the_desk() {
        let config = Config::example();
        let desk = AuthToken::<AttendanceDesk>::new("desk")
            .into_cookie(&config)
            .unwrap();
        let token = AuthToken::<Coordinator>::from_cookie(&desk, &config).unwrap();
        assert_eq!(token.rights(), Rights::AttendanceDesk);
        assert!(token.permits(Rights::AttendanceDesk));
        assert!(!token.permits(Rights::Coordinator));

        let coordinator = AuthToken::<Coordinator>::new("coordinator");
        assert!(coordinator.permits(Rights::AttendanceDesk));
        assert!(coordinator.permits(Rights::Coordinator));
    }

    #[test]
    fn forged_and_expired_tokens_are_rejected() {
        let config = Config::example();
        let forged = Cookie::new(AUTH_TOKEN_COOKIE, "not-a-jwt");
        assert!(AuthToken::<Coordinator>::from_cookie(&forged, &config).is_err());

        let claims = Claims {
            token: AuthToken::<Coordinator>::new("coordinator"),
            expire_at: Utc::now() - Duration::hours(1),
        };
        let expired = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap();
        let expired = Cookie::new(AUTH_TOKEN_COOKIE, expired);
        assert!(AuthToken::<Coordinator>::from_cookie(&expired, &config).is_err());
    }
}
