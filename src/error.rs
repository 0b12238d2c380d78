use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

pub type HubResult<T> = Result<T, HubError>;

/// Longest slice of a portal error page kept for the logs
pub const UPSTREAM_EXCERPT: usize = 512;

/// Everything that can go wrong between a client request and the portals behind it
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A portal rejected the student's id/pin
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("You're not logged in!")]
    NotLoggedIn,

    #[error("invalid term code: {0:?}")]
    InvalidTerm(String),

    /// The portal could not be reached at all (connect failure or timeout)
    #[error("portal unreachable: {0}")]
    Unreachable(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// `excerpt` is the start of the portal's page, logged but never sent to clients
    #[error("portal returned status {status}")]
    Upstream { status: u16, excerpt: String },

    #[error("invalid portal url: {0}")]
    InvalidUrl(String),

    #[error("malformed report document: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("report record is missing field {field}")]
    MissingField { field: &'static str },

    #[error("document is not valid utf-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed portal json: {0}")]
    Json(#[from] serde_json::Error),
}

impl HubError {
    /// Maps a reqwest failure, separating "portal is down" from every other transport error
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            HubError::Unreachable(err.to_string())
        } else {
            HubError::Transport(err)
        }
    }

    pub fn upstream(status: u16, body: &str) -> Self {
        let excerpt = match body.char_indices().nth(UPSTREAM_EXCERPT) {
            Some((end, _)) => format!("{}...", &body[..end]),
            None => body.to_string(),
        };
        HubError::Upstream { status, excerpt }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HubError::InvalidCredentials(_) | HubError::InvalidTerm(_) => StatusCode::BAD_REQUEST,
            HubError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            HubError::InvalidCredentials(message) => (status, Json(json!(message))).into_response(),
            HubError::InvalidTerm(_) | HubError::NotLoggedIn => {
                (status, Json(json!({ "detail": self.to_string() }))).into_response()
            }
            other => {
                error!("Request failed: {}", other);
                if let HubError::Upstream { excerpt, .. } = &other {
                    debug!("Portal page: {}", excerpt);
                }
                (status, Json(json!({ "detail": other.to_string() }))).into_response()
            }
        }
    }
}
