use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::ai::AiError;

mod permission;

pub use permission::{ErrorEmitter, Operation, PermissionError, RECENT_ERRORS_CAPACITY};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("Permission denied: {0}")]
    Permission(PermissionError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// A 404 for the described resource.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    /// A 400 with the given explanation.
    pub fn bad_request(why: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, why.into())
    }

    /// A 500 for a failure on our side. The explanation is only logged.
    pub fn internal(why: impl Into<String>) -> Self {
        Self::Status(Status::InternalServerError, why.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Ai(_) => Status::BadGateway,
            Self::Permission(_) => Status::Forbidden,
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to API clients. Internal failures get a generic message,
    /// the details only go to the log.
    fn public_message(&self) -> String {
        match self {
            Self::Db(_) | Self::Argon2(_) => "An internal error occurred.".to_string(),
            Self::Ai(_) => "Could not reach the AI service.".to_string(),
            Self::Permission(err) => err.public_message(),
            Self::Status(status, _) if status.code >= 500 => {
                "An internal error occurred.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        if let Self::Permission(ref err) = self {
            if let Some(emitter) = req.rocket().state::<ErrorEmitter>() {
                emitter.emit(err.clone());
            }
        }
        let body = ErrorBody {
            status: status.code,
            message: self.public_message(),
        };
        Custom(status, Json(body)).respond_to(req)
    }
}
