use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a prospective ballot is refused. These are expected outcomes
/// of the voting rules, not failures of the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Rejection {
    #[error("Voting is not open at the moment")]
    SessionInactive,
    #[error("This national ID has already voted")]
    AlreadyVoted,
    #[error("The voter is not registered for this apartment")]
    VoterNotRegistered,
    #[error("The apartment does not match the one on file for this voter")]
    ApartmentMismatch,
    #[error("The voter is not enabled; please check in at the attendance desk")]
    NotCheckedIn,
    #[error("The selected option is not part of the current question")]
    InvalidOption,
}

impl Rejection {
    /// Stable machine-readable name of this rejection.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionInactive => "SessionInactive",
            Self::AlreadyVoted => "AlreadyVoted",
            Self::VoterNotRegistered => "VoterNotRegistered",
            Self::ApartmentMismatch => "ApartmentMismatch",
            Self::NotCheckedIn => "NotCheckedIn",
            Self::InvalidOption => "InvalidOption",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::InvalidOption => Status::BadRequest,
            _ => Status::Forbidden,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("Voting is already active; stop it before starting another question")]
    AlreadyActive,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate entry: {0}")]
    Conflict(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Convenience constructor for a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Stable machine-readable name of this error, used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.kind(),
            Self::AlreadyActive => "AlreadyActive",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::Unavailable(_) => "Unavailable",
            Self::BadRequest(_) => "BadRequest",
            Self::Unauthorized(_) | Self::Jwt(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::Status(..) => "Error",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Rejected(rejection) => rejection.status(),
            Self::AlreadyActive => Status::Conflict,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::Unavailable(_) => Status::ServiceUnavailable,
            Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Status(status, _) => *status,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
            StoreError::Duplicate(what) => Self::Conflict(what),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        status::Custom(status, Json(body)).respond_to(req)
    }
}
