//! Route handlers

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Form, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use super::sinks::{HtmlChunkSink, SseSink};
use super::AppState;
use crate::parser::parse_batch;

/// Buffered chunks between the batch task and the response body
const BODY_BUFFER: usize = 16;

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub token: String,
}

/// Raw batch text, one record per line in each field
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub keys: String,
    #[serde(default)]
    pub names: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

fn internal_error(message: impl Into<String>) -> Response {
    let message = message.into();
    error!(error = %message, "Request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Html(message)).into_response()
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn token_page(state: &AppState) -> Response {
    match state.renderer.token_form() {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

/// GET / - token form until a credential exists, then the batch form
pub async fn index(State(state): State<AppState>) -> Response {
    if state.tokens.load().await.is_none() {
        return token_page(&state);
    }
    match state.renderer.batch_form() {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

/// POST /token - store a non-blank token, always back to /
pub async fn save_token(State(state): State<AppState>, Form(form): Form<TokenForm>) -> Redirect {
    if let Err(e) = state.tokens.save(&form.token).await {
        warn!(error = %e, "Token not saved");
    }
    Redirect::to("/")
}

/// POST /verify - chunked HTML page updated in completion order
pub async fn verify_html(
    State(state): State<AppState>,
    Form(form): Form<BatchRequest>,
) -> Response {
    let Some(credential) = state.tokens.load().await else {
        return token_page(&state);
    };

    let records = parse_batch(&form.keys, &form.names);
    let head = match state.renderer.results_head(&records) {
        Ok(head) => head,
        Err(e) => return internal_error(e.to_string()),
    };
    let dispatcher = match state.dispatcher() {
        Ok(dispatcher) => dispatcher,
        Err(e) => return internal_error(e.to_string()),
    };

    let results = dispatcher.dispatch(records, state.client(credential));
    info!(batch_id = %results.batch_id(), total = results.total(), "HTML batch started");

    let (tx, rx) = mpsc::channel(BODY_BUFFER);
    let mut sink = HtmlChunkSink::new(state.renderer.clone(), head, tx);
    tokio::spawn(async move {
        if let Err(e) = results.drain_into(&mut sink).await {
            debug!(error = %e, "HTML stream ended early");
        }
    });

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

/// POST /api/verify - SSE stream of results
pub async fn verify_sse(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Response> {
    let credential = state
        .tokens
        .load()
        .await
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "No registry token stored"))?;

    let dispatcher = state
        .dispatcher()
        .map_err(|e| json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let records = parse_batch(&request.keys, &request.names);
    let results = dispatcher.dispatch(records, state.client(credential));
    info!(batch_id = %results.batch_id(), total = results.total(), "SSE batch started");

    let (tx, rx) = mpsc::channel(BODY_BUFFER);
    let mut sink = SseSink::new(tx);
    tokio::spawn(async move {
        if let Err(e) = results.drain_into(&mut sink).await {
            debug!(error = %e, "SSE stream ended early");
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
