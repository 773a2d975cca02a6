use std::convert::Infallible;

use serde_json::json;
use thiserror::Error;
use warp::http::StatusCode;

/// Errors raised by the model, storage, cache, and replication layers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record is missing")]
    RecordMissing,
    #[error("record already exists")]
    RecordExists,
    #[error("server is missing")]
    ServerMissing,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("peer request failed: {0}")]
    Peer(#[from] Box<ureq::Error>),
}

impl From<ureq::Error> for Error {
    fn from(value: ureq::Error) -> Self {
        Error::Peer(Box::new(value))
    }
}

impl warp::reject::Reject for Error {}

/// Converts a crate [`Error`] into the HTTP status code it maps to per the
/// `/text/{uid}` status table: missing -> 404, exists/no-change -> 400,
/// anything else -> 500.
#[must_use]
pub fn status_code(error: &Error) -> StatusCode {
    match error {
        Error::RecordMissing => StatusCode::NOT_FOUND,
        Error::RecordExists => StatusCode::BAD_REQUEST,
        Error::ServerMissing | Error::Io(_) | Error::Json(_) | Error::Peer(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Top-level warp rejection handler, turning both our own [`Error`]
/// rejections and warp's built-ins into a JSON error body.
pub async fn recover(
    rejection: warp::Rejection,
) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(error) = rejection.find::<Error>() {
        (status_code(error), error.to_string())
    } else if rejection
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, "invalid body".to_string())
    } else if rejection
        .find::<warp::reject::MissingHeader>()
        .is_some()
        || rejection
            .find::<warp::reject::InvalidQuery>()
            .is_some()
    {
        (StatusCode::BAD_REQUEST, "invalid request".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        code,
    ))
}
