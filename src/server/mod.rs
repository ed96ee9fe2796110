//! actix-web surface for the relays.
//!
//! Each binary mounts one route module plus the shared JSON extractor config.

pub mod chat_routes;
pub mod image_routes;

use crate::error::ApiError;
use actix_web::web;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// JSON extractor config that renders body errors as an [`crate::ErrorResponse`].
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        tracing::warn!("Rejected body for {} {}: {err}", req.method(), req.path());
        ApiError::bad_request(format!("Invalid JSON: {err}")).into()
    })
}
