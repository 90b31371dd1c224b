use axum::{
    extract::{ DefaultBodyLimit, FromRequest, Multipart, Request, State },
    http::{ header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, StatusCode },
    response::{ IntoResponse, Response },
    routing::post,
    Json,
    Router,
};
use log::{ error, info };
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::ServeDir;
use uuid::Uuid;

use super::throttle::Throttle;
use super::upload::{ parse_solve_form, SolveForm, UploadError };
use crate::broker::Broker;
use crate::error::BrokerError;
use crate::history::{ ConversationStore, SessionScope, SHARED_SESSION_KEY };
use crate::models::solve::SolveResponse;

pub const SESSION_HEADER: &str = "x-session-id";
/// Rate-limit key shared by every session-scope request that arrives without
/// a session id, so dropping the header never bypasses the throttle.
pub const ANONYMOUS_SESSION_KEY: &str = "anonymous";

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub conversations: Arc<ConversationStore>,
    pub throttle: Arc<Throttle>,
    pub upload_dir: PathBuf,
}

pub fn build_router(state: AppState, static_dir: Option<PathBuf>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    let mut app = Router::new()
        .route("/solve", post(solve_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    if let Some(dir) = static_dir {
        info!("Serving static client from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).with_state(state)
}

/// The session id the client sent, if state is keyed per session. Shared
/// scope always resolves to the shared key.
fn provided_session(scope: SessionScope, headers: &HeaderMap) -> Option<String> {
    if scope == SessionScope::Shared {
        return Some(SHARED_SESSION_KEY.to_string());
    }
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn respond(status: StatusCode, body: SolveResponse, issued_session: Option<String>) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(value) = issued_session.and_then(|id| HeaderValue::from_str(&id).ok()) {
        response.headers_mut().insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}

#[derive(Debug, Deserialize)]
struct JsonSolveRequest {
    #[serde(default)]
    prompt: Option<String>,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().starts_with("application/json"))
        .unwrap_or(false)
}

/// Accepts either a multipart form (`prompt`, `image`) or a JSON `{"prompt"}` body.
async fn read_form(state: &AppState, request: Request) -> Result<SolveForm, UploadError> {
    if is_json(request.headers()) {
        let Json(body) = Json::<JsonSolveRequest>::from_request(request, state).await.map_err(|e| {
            UploadError::Rejected(e.body_text())
        })?;
        return Ok(SolveForm { prompt: body.prompt, image: None });
    }

    let multipart = Multipart::from_request(request, state).await.map_err(|e|
        UploadError::Rejected(e.body_text())
    )?;
    parse_solve_form(multipart, &state.upload_dir).await
}

async fn solve_handler(State(state): State<AppState>, request: Request) -> Response {
    let scope = state.conversations.scope();
    let provided = provided_session(scope, request.headers());

    let form = match read_form(&state, request).await {
        Ok(form) => form,
        Err(e) => {
            error!("Rejecting malformed /solve request: {}", e);
            let err = BrokerError::from(e);
            return respond(StatusCode::BAD_REQUEST, SolveResponse::message(err.user_message()), None);
        }
    };

    let throttle_key = match &provided {
        Some(id) => scope.key(id),
        None => ANONYMOUS_SESSION_KEY.to_string(),
    };
    if !state.throttle.admit(&throttle_key) {
        info!("Request for '{}' throttled", throttle_key);
        let err = BrokerError::RateLimited;
        return respond(StatusCode::OK, SolveResponse::message(err.user_message()), None);
    }

    // ids are only minted for admitted requests
    let (session_id, issued) = match provided {
        Some(id) => (id, None),
        None => {
            let id = Uuid::new_v4().to_string();
            (id.clone(), Some(id))
        }
    };

    let answer = match answer_form(&state, &session_id, &form).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("/solve failed: {}", e);
            Some(e.user_message().to_string())
        }
    };

    respond(StatusCode::OK, SolveResponse { answer }, issued)
}

async fn answer_form(
    state: &AppState,
    session_id: &str,
    form: &SolveForm
) -> Result<Option<String>, BrokerError> {
    let question = form.question();
    let image = match &form.image {
        Some(asset) => Some(asset.read().await?),
        None => None,
    };
    let conversation = state.conversations.session(session_id).await;
    let broker = Arc::clone(&state.broker);

    tokio::spawn(async move {
        broker.solve(&conversation, &question, image.as_ref()).await
    }).await.map_err(|e| BrokerError::Unknown(e.to_string()))?
}
