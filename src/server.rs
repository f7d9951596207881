use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use http::{HeaderValue, StatusCode, header};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::AppConfig, path_guard::RedirectPolicy};

// Sanitized targets are already decoded; re-encode what a header can't carry.
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|');

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub policy: Arc<RedirectPolicy>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let policy = Arc::new(config.policy());
        Self {
            config,
            policy,
            started_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
struct RedirectParams {
    redirect: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    started_at: DateTime<Utc>,
    uptime_seconds: i64,
}

#[derive(Serialize)]
struct MetaResponse {
    default_redirect_path: String,
    disallow: Vec<String>,
    schemes: Vec<String>,
    decode_passes: usize,
    max_redirect_length: Option<usize>,
    now: DateTime<Utc>,
}

#[derive(Serialize)]
struct ResolveResponse {
    target: String,
    fallback: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/meta", get(meta))
        .route("/redirect", get(redirect))
        .route("/redirect/resolve", get(resolve))
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "redirect-guard",
        "endpoints": ["/health", "/meta", "/redirect", "/redirect/resolve"]
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        started_at: state.started_at,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

async fn meta(State(state): State<AppState>) -> impl IntoResponse {
    Json(MetaResponse {
        default_redirect_path: state.config.default_redirect_path.clone(),
        disallow: state
            .policy
            .disallowed_paths()
            .into_iter()
            .map(str::to_string)
            .collect(),
        schemes: state.policy.schemes().to_vec(),
        decode_passes: state.policy.decode_passes(),
        max_redirect_length: state.policy.max_length(),
        now: Utc::now(),
    })
}

// An unparseable query string falls back like a missing parameter.
async fn redirect(
    State(state): State<AppState>,
    query: Option<Query<RedirectParams>>,
) -> Response {
    let (target, _) = resolve_target(&state, redirect_param(&query));

    let mut response = StatusCode::SEE_OTHER.into_response();
    response.headers_mut().insert(
        header::LOCATION,
        location_header(&target, &state.config.default_redirect_path),
    );
    response
}

fn location_header(target: &str, fallback: &str) -> HeaderValue {
    HeaderValue::from_str(&encode_location(target))
        .or_else(|_| HeaderValue::from_str(&encode_location(fallback)))
        .unwrap_or_else(|_| HeaderValue::from_static("/"))
}

// A `%` that does not start a valid triplet is sent as `%25`.
fn encode_location(target: &str) -> String {
    let encoded = utf8_percent_encode(target, LOCATION).to_string();
    let bytes = encoded.as_bytes();

    let mut out = String::with_capacity(encoded.len());
    for (i, ch) in encoded.char_indices() {
        let starts_escape = matches!(
            (bytes.get(i + 1), bytes.get(i + 2)),
            (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
        );
        if ch == '%' && !starts_escape {
            out.push_str("%25");
        } else {
            out.push(ch);
        }
    }
    out
}

async fn resolve(
    State(state): State<AppState>,
    query: Option<Query<RedirectParams>>,
) -> impl IntoResponse {
    let (target, fallback) = resolve_target(&state, redirect_param(&query));
    Json(ResolveResponse { target, fallback })
}

fn redirect_param(query: &Option<Query<RedirectParams>>) -> Option<&str> {
    query
        .as_ref()
        .and_then(|Query(params)| params.redirect.as_deref())
}

fn resolve_target(state: &AppState, raw: Option<&str>) -> (String, bool) {
    match state.policy.evaluate(raw) {
        Ok(target) => (target, false),
        Err(rejection) => {
            debug!(
                reason = rejection.code(),
                fallback = %state.config.default_redirect_path,
                "redirect target rejected: {rejection}"
            );
            (state.config.default_redirect_path.clone(), true)
        }
    }
}
