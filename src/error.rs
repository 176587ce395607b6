use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures a mutation can surface to its sender. Broadcast-stage failures
/// are not represented here: they are logged and never abort a mutation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("game not found")]
    GameNotFound,

    #[error("scoreboard row not found")]
    ScoreboardNotFound,

    #[error("confirmation code does not match")]
    InvalidCode,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::GameNotFound | Error::ScoreboardNotFound => StatusCode::NOT_FOUND,
            Error::InvalidCode => StatusCode::BAD_REQUEST,
            Error::Database(e) => {
                tracing::error!("database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
