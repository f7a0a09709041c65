//! Twilio WhatsApp webhook: form-encoded inbound messages, TwiML replies.

use axum::extract::{Form, OriginalUri, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use base64::Engine;
use hmac::{Hmac, Mac};
use log::{error, warn};
use sha1::Sha1;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::intake::{InboundMessage, IntakeError};

pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::WHATSAPP_WEBHOOK, post(handle_whatsapp_webhook))
        .route(ApiUrls::LEGACY_WEBHOOK, post(handle_whatsapp_webhook))
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn twiml(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n  <Message>{}</Message>\n</Response>",
        escape_xml(message)
    )
}

pub fn twiml_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        twiml(message),
    )
        .into_response()
}

/// The URL followed by every parameter name and value, sorted by name.
fn signing_payload(url: &str, params: &HashMap<String, String>) -> String {
    let mut sorted_params: Vec<(&String, &String)> = params.iter().collect();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));

    let mut data = url.to_string();
    for (key, value) in sorted_params {
        data.push_str(key);
        data.push_str(value);
    }
    data
}

pub fn compute_signature(
    auth_token: &str,
    url: &str,
    params: &HashMap<String, String>,
) -> Option<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(signing_payload(url, params).as_bytes());
    Some(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn validate_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &HashMap<String, String>,
) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };
    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(signing_payload(url, params).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Renders a pipeline error; store details are included only when `expose_store_errors`.
pub fn error_reply(err: &IntakeError, expose_store_errors: bool) -> Response {
    match err.sender_message(expose_store_errors) {
        Some(message) => twiml_response(err.status_code(), &message),
        None => (err.status_code(), err.to_string()).into_response(),
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        error_reply(&self, false)
    }
}

fn required_field(params: &HashMap<String, String>, name: &'static str) -> Result<String, IntakeError> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(IntakeError::MissingField(name))
}

/// Scheme and host of the configured public URL joined with the path that was
/// actually requested, since the provider signs the URL it posted to.
pub fn signed_url(public_url: &str, path_and_query: &str) -> String {
    let host_start = public_url.find("://").map_or(0, |i| i + 3);
    let origin_end = public_url[host_start..]
        .find('/')
        .map_or(public_url.len(), |i| host_start + i);
    format!("{}{}", &public_url[..origin_end], path_and_query)
}

fn check_signature(
    state: &AppState,
    headers: &HeaderMap,
    path_and_query: &str,
    params: &HashMap<String, String>,
) -> Result<(), IntakeError> {
    let twilio = &state.config.twilio;
    if !twilio.validate_signature {
        return Ok(());
    }
    let (Some(token), Some(url)) = (twilio.auth_token.as_deref(), twilio.webhook_url.as_deref())
    else {
        return Err(IntakeError::InvalidSignature);
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(IntakeError::InvalidSignature)?;
    if validate_signature(token, signature, &signed_url(url, path_and_query), params) {
        Ok(())
    } else {
        Err(IntakeError::InvalidSignature)
    }
}

pub async fn handle_whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let path_and_query = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    if let Err(e) = check_signature(&state, &headers, path_and_query, &params) {
        warn!("Rejected webhook call: {}", e);
        return e.into_response();
    }

    let message = match (required_field(&params, "From"), required_field(&params, "Body")) {
        (Ok(from), Ok(body)) => InboundMessage { from, body },
        (Err(e), _) | (_, Err(e)) => {
            warn!("Rejected webhook call: {}", e);
            return e.into_response();
        }
    };

    match state.pipeline.process(message).await {
        Ok(outcome) => twiml_response(StatusCode::OK, &outcome.reply),
        Err(e) => {
            error!("Intake failed: {}", e);
            error_reply(&e, state.pipeline.config().expose_store_errors)
        }
    }
}
