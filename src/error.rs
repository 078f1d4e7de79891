use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("missing paste content")]
    MissingContent,
    /// The paste never existed or has expired. Callers can't tell which.
    #[error("paste not found")]
    NotFound,
    #[error("storage error")]
    Storage {
        #[from]
        source: StorageError,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            AppError::MissingContent => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Storage { source } => {
                error!("storage failure: {source:?}");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
            }
        };

        (status_code, format!("{self}")).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::MissingContent.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn storage_errors_are_opaque() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let response = AppError::from(StorageError::from(io)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"internal server error");
        assert!(!String::from_utf8_lossy(&body).contains("disk on fire"));
    }
}
