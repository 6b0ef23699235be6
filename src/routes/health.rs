//! Health and version endpoints
//!
//! - /health - liveness probe, `{"ok": true}` while the process serves HTTP
//! - /version - build information for deployment verification

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Handle liveness probe (/health)
pub fn health_check() -> Response<Full<Bytes>> {
    let body = serde_json::to_string(&HealthResponse { ok: true })
        .unwrap_or_else(|_| r#"{"ok":true}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "countersign",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
