use actix_web::http::StatusCode;
use actix_web::ResponseError;

use thiserror::Error;

pub type RestResult<T> = Result<T, RestError>;

/// Errors a controller can surface as an HTTP response.
///
/// Signed-link verification failures are deliberately NOT here: the link
/// endpoints soft-fail with a 200 payload so the UX stays uniform and the
/// response leaks nothing about why a link was rejected.
#[derive(Debug, Error)]
pub enum RestError {
    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Unauthorized")]
    FailedToAuthenticate(#[source] anyhow::Error),

    #[error("Internal Server Error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal Server Error")]
    Other(#[from] anyhow::Error),
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::FailedToAuthenticate(_) => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
