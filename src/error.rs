use std::fmt::Display;

use rocket::{
    http::{Status, StatusClass},
    response::Responder,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
///
/// The first four variants are infrastructure failures; the rest are expected
/// outcomes that are reported to the caller verbatim and never retried
/// internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
    #[error("Failed to deliver security code: {0}")]
    Delivery(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("This voter has already cast their vote")]
    AlreadyVoted,
    #[error("The election is not open for voting")]
    ElectionClosed,
    #[error("Results are locked until the end of the election period")]
    ResultsLocked,
}

impl Error {
    pub fn not_found(what: impl Display) -> Self {
        Self::NotFound(format!("{what}"))
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) | Self::Delivery(_) => {
                Status::InternalServerError
            }
            Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::NotFound(_) => Status::NotFound,
            Self::AlreadyVoted => Status::Conflict,
            Self::ElectionClosed | Self::ResultsLocked => Status::Forbidden,
        };
        match status.class() {
            StatusClass::ServerError => error!("{self}"),
            _ => debug!("{self}"),
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_client_errors() {
        let cases = [
            (Error::AlreadyVoted, Status::Conflict),
            (Error::ElectionClosed, Status::Forbidden),
            (Error::ResultsLocked, Status::Forbidden),
            (
                Error::Unauthorized("Invalid or expired code".to_string()),
                Status::Unauthorized,
            ),
            (Error::NotFound("Candidate".to_string()), Status::NotFound),
        ];

        let client = rocket::local::blocking::Client::untracked(rocket::build()).unwrap();
        for (error, expected) in cases {
            let request = client.get("/");
            let status = error.respond_to(request.inner()).unwrap_err();
            assert_eq!(status, expected);
        }
    }
}
