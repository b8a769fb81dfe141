//! Request handlers for the survey web surface.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;

use super::cookies::{session_cookie, session_from_headers};
use super::pages::{home_page, result_page, survey_page};
use super::AppState;
use crate::domain::{PredictionResult, SessionId};
use crate::ports::{SessionError, SessionStore};

pub async fn home() -> Html<String> {
    Html(home_page())
}

pub async fn survey_form(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(survey_page(
        state.service.artifacts().encoder(),
        None,
        None,
    ))
}

/// `POST /predict`: run the pipeline and remember the result for this caller.
///
/// On failure the form is re-rendered with the error and the session is left
/// untouched.
pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let result = match state.service.predict_form(&form) {
        Ok(result) => result,
        Err(e) => {
            // The message can quote submitted text, so only the stage is logged.
            let status = if e.is_input_error() {
                tracing::warn!("Submission rejected at {} stage", e.stage());
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                tracing::error!("Pipeline failed at {} stage", e.stage());
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let page = survey_page(
                state.service.artifacts().encoder(),
                Some(&e.to_string()),
                Some(&form),
            );
            return (status, Html(page)).into_response();
        }
    };

    let sessions = Arc::clone(&state.sessions);
    let presented = session_from_headers(&headers);
    let stored = tokio::task::spawn_blocking(move || {
        store_result(sessions.as_ref(), presented, &result)
    })
    .await
    .map_err(|e| SessionError::Backend(format!("session task failed: {e}")))
    .and_then(|r| r);

    let session = match stored {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to store prediction: {}", e);
            let page = survey_page(
                state.service.artifacts().encoder(),
                Some("the result could not be saved, please try again"),
                Some(&form),
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response();
        }
    };

    (
        [(header::SET_COOKIE, session_cookie(&session, state.cookie_secure))],
        Redirect::to("/result"),
    )
        .into_response()
}

/// Save `result` and return the session it is filed under.
///
/// A presented id is kept only while it still holds a live result; any other
/// id is replaced so a client cannot choose its own session.
fn store_result(
    sessions: &dyn SessionStore,
    presented: Option<SessionId>,
    result: &PredictionResult,
) -> Result<SessionId, SessionError> {
    let session = match presented {
        Some(id) if sessions.load_prediction(&id)?.is_some() => id,
        _ => SessionId::generate(),
    };
    sessions.save_prediction(&session, result)?;

    match sessions.purge_expired() {
        Ok(0) => {}
        Ok(n) => tracing::debug!("Purged {} expired session(s)", n),
        Err(e) => tracing::warn!("Session purge failed: {}", e),
    }
    Ok(session)
}

/// `GET /result`: the caller's latest prediction, or back to the form.
pub async fn show_result(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(session) = session_from_headers(&headers) else {
        return Redirect::to("/predict").into_response();
    };

    let sessions = Arc::clone(&state.sessions);
    let loaded = tokio::task::spawn_blocking(move || sessions.load_prediction(&session))
        .await
        .map_err(|e| SessionError::Backend(format!("session task failed: {e}")))
        .and_then(|r| r);

    match loaded {
        Ok(Some(result)) => Html(result_page(&result)).into_response(),
        Ok(None) => Redirect::to("/predict").into_response(),
        Err(e) => {
            tracing::error!("Failed to load prediction: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session storage unavailable",
            )
                .into_response()
        }
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let sessions = Arc::clone(&state.sessions);
    let stored = match tokio::task::spawn_blocking(move || sessions.count()).await {
        Ok(Ok(n)) => Some(n),
        Ok(Err(e)) => {
            tracing::warn!("Session count failed: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!("Session count task failed: {}", e);
            None
        }
    };

    let artifacts = state.service.artifacts();
    Json(serde_json::json!({
        "status": "ok",
        "features": artifacts.schema().len(),
        "classifier": artifacts.classifier().name(),
        "session_backend": state.sessions.backend(),
        "sessions_stored": stored,
    }))
}
