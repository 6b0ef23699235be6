//! Signing endpoints
//!
//! - GET  /sign/{token} - HTML form for the token's quote and role
//! - POST /sign/{token} - multipart upload of field `signature`, answers with
//!   the signed PDF as an attachment

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{header, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::server::AppState;
use crate::signing::SigningSession;
use crate::types::CountersignError;

/// Multipart field carrying the signature image
pub const SIGNATURE_FIELD: &str = "signature";

/// Handle GET /sign/{token}
pub async fn handle_sign_form(token: &str, state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.controller.session(token).await {
        Ok(session) => html_response(StatusCode::OK, render_form(&session)),
        Err(e) => error_response(&e),
    }
}

/// Handle POST /sign/{token}
pub async fn handle_sign_submit<B>(
    req: Request<B>,
    token: &str,
    state: Arc<AppState>,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    // Unknown tokens are rejected before the body is read
    if let Err(e) = state.controller.session(token).await {
        return error_response(&e);
    }

    let image = match read_signature(req, state.args.max_upload_bytes).await {
        Ok(Some(image)) => image,
        Ok(None) => {
            return error_response(&CountersignError::BadRequest("signature required".into()))
        }
        Err(e) => return error_response(&e),
    };

    match state.controller.sign(token, image).await {
        Ok(artifact) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/pdf")
            .header(header::CONTENT_DISPOSITION, attachment(&artifact.filename()))
            .body(Full::new(artifact.bytes))
            .unwrap(),
        Err(e) => error_response(&e),
    }
}

/// Pull the `signature` field out of a multipart body capped at `limit` bytes.
///
/// `Ok(None)` when the request has no (or an empty) signature field.
async fn read_signature<B>(req: Request<B>, limit: usize) -> Result<Option<Bytes>, CountersignError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(too_large(limit));
    }

    let boundary = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| CountersignError::BadRequest("expected multipart/form-data".into()))?;

    let body = Limited::new(req.into_body(), limit).into_data_stream();
    let mut multipart = multer::Multipart::new(body, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(SIGNATURE_FIELD) {
            continue;
        }
        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        debug!(size = data.len(), "Received signature upload");
        return Ok((!data.is_empty()).then_some(data));
    }
    Ok(None)
}

/// `Content-Disposition` value; characters unsafe in a quoted header
/// parameter become `_`
fn attachment(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

fn too_large(limit: usize) -> CountersignError {
    CountersignError::PayloadTooLarge(format!("request body exceeds {} bytes", limit))
}

fn multipart_error(err: multer::Error, limit: usize) -> CountersignError {
    if let multer::Error::StreamReadFailed(ref source) = err {
        if source.downcast_ref::<LengthLimitError>().is_some() {
            return too_large(limit);
        }
    }
    CountersignError::BadRequest(format!("malformed multipart body: {}", err))
}

/// Map a crate error onto a plain-text response
pub fn error_response(err: &CountersignError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    let message = match err {
        CountersignError::Unauthorized => "Not found".to_string(),
        CountersignError::Config(_) | CountersignError::Internal(_) => {
            error!(error = %err, "Signing request failed");
            "Internal server error".to_string()
        }
        CountersignError::Persistence(_) => {
            warn!(error = %err, "Signing request hit a storage failure");
            "Storage temporarily unavailable".to_string()
        }
        other => other.to_string(),
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(message)))
        .unwrap()
}

fn html_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn render_form(session: &SigningSession) -> String {
    let quote_id = escape_html(&session.quote_id);
    let notice = if session.signed {
        r#"<p style="color:green">Already signed.</p>"#
    } else {
        ""
    };
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sign Quote {quote_id} ({role})</title></head>
<body style="font-family:Arial;max-width:620px;margin:auto">
  <h3>Sign Quote {quote_id} ({role})</h3>
  {notice}
  <form method="post" enctype="multipart/form-data">
    <label>Signature (PNG/JPG)</label><br/>
    <input name="{field}" type="file" accept="image/png,image/jpeg" required/><br/><br/>
    <button type="submit">Sign</button>
  </form>
</body>
</html>
"#,
        quote_id = quote_id,
        role = session.role,
        notice = notice,
        field = SIGNATURE_FIELD,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
