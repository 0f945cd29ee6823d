use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Every failure an HTTP handler can answer with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("incorrect password")]
    WrongPassword,
    #[error("no token, authorization denied")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("account no longer exists")]
    NotAuthenticated,
    /// `expose` echoes the underlying error text back to the client.
    #[error("server error: {cause}")]
    Server { cause: anyhow::Error, expose: bool },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiError {
    pub fn server(source: impl Into<anyhow::Error>) -> Self {
        Self::Server {
            cause: source.into(),
            expose: false,
        }
    }

    pub fn server_verbose(source: impl Into<anyhow::Error>) -> Self {
        Self::Server {
            cause: source.into(),
            expose: true,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UserExists | Self::UserNotFound | Self::WrongPassword => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingToken | Self::InvalidToken | Self::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Self::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Server { cause, expose } => {
                tracing::error!(error = %cause, "request failed");
                ErrorBody {
                    msg: "server error".into(),
                    error: expose.then(|| format!("{cause:#}")),
                }
            }
            other => ErrorBody {
                msg: other.to_string(),
                error: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
