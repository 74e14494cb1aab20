use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{export::ExportError, spotify::AuthError, warning};

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            WebError::Auth(e) => {
                warning!("Authorization setup failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebError::Export(_) => StatusCode::BAD_GATEWAY,
            WebError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
