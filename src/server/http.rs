//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Args;
use crate::routes;
use crate::signing::SigningController;
use crate::types::CountersignError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Signing workflow over the configured store
    pub controller: Arc<SigningController>,
}

impl AppState {
    pub fn new(args: Args, controller: SigningController) -> Self {
        Self {
            args,
            controller: Arc::new(controller),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), CountersignError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Countersign listening on {}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    debug!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(to_boxed(route(state, req).await))
}

/// Route a request to its handler
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if let Some(token) = sign_token(&path) {
        return match method {
            Method::GET => routes::handle_sign_form(token, state).await,
            Method::POST => routes::handle_sign_submit(req, token, state).await,
            _ => method_not_allowed_response(),
        };
    }

    match (method, path.as_str()) {
        (Method::GET, "/health") => routes::health_check(),
        (Method::GET, "/version") => routes::version_info(),
        _ => not_found_response(&path),
    }
}

/// Token segment of `/sign/{token}`
fn sign_token(path: &str) -> Option<&str> {
    path.strip_prefix("/sign/")
        .map(|t| t.trim_end_matches('/'))
        .filter(|t| !t.is_empty() && !t.contains('/'))
}

/// Convert Full<Bytes> response to BoxBody response
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn method_not_allowed_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::ALLOW, "GET, POST")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_token_extraction() {
        assert_eq!(sign_token("/sign/tok-b"), Some("tok-b"));
        assert_eq!(sign_token("/sign/tok-b/"), Some("tok-b"));
        assert_eq!(sign_token("/sign/"), None);
        assert_eq!(sign_token("/sign/a/b"), None);
        assert_eq!(sign_token("/signature"), None);
    }

    #[tokio::test]
    async fn test_not_found_is_json() {
        let response = not_found_response("/nope");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["path"], "/nope");
    }
}
