use serde::{Deserialize, Serialize};
use std::fmt;

/// Failures a relay can hit between receiving a request and producing a reply.
///
/// Every variant is recovered locally: the relay wrappers turn it into a
/// `{success: false, error}` payload rather than letting it reach the client
/// as a fault.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    #[error("invalid model selection: {index} (expected 0..{available})")]
    InvalidModelSelection { index: i64, available: usize },

    #[error("HUGGINGFACE_API_KEY is not set")]
    MissingApiKey,

    #[error("{}", cold_loading_message(.estimated_secs))]
    ColdLoading { estimated_secs: Option<f64> },

    #[error("model endpoint not found: {model_id}")]
    ModelNotFound { model_id: String },

    #[error("{service} API error: {status}{}", detail_suffix(.detail))]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        detail: Option<String>,
    },

    #[error("request to {service} timed out, please retry")]
    Timeout { service: &'static str },

    #[error("cannot connect to {service}, make sure the service is running")]
    Unreachable { service: &'static str },

    #[error("unexpected response from {service}: {reason}")]
    InvalidResponse { service: &'static str, reason: String },

    #[error("failed to decode generated image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("failed to save generated image: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(String),
}

fn cold_loading_message(estimated_secs: &Option<f64>) -> String {
    match estimated_secs {
        Some(secs) => format!("model is loading, please retry in about {secs:.0} seconds"),
        None => "model is loading, please retry shortly".to_string(),
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(" - {d}")).unwrap_or_default()
}

impl RelayError {
    /// Classifies a transport-level reqwest failure for the named upstream.
    pub fn from_transport(
        service: &'static str,
        err: &reqwest::Error,
    ) -> Self {
        if err.is_timeout() {
            RelayError::Timeout { service }
        } else if err.is_connect() {
            RelayError::Unreachable { service }
        } else {
            RelayError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable(String),
}

impl fmt::Display for ApiError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl ApiError {
    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (400, "BAD_REQUEST", msg.clone()),
            ApiError::ServiceUnavailable(msg) => (503, "SERVICE_UNAVAILABLE", msg.clone()),
        }
    }

    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        let (status_code, error_type, message) = self.parts();
        ErrorResponse {
            error: error_type.to_string(),
            message,
            status_code,
        }
    }
}

#[cfg(feature = "server")]
impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.parts().0)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(self.to_error_response())
    }
}

// Helper functions for creating specific error types
impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(msg.into())
    }
}
