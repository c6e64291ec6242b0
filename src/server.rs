//! Thin HTTP surface over the turn adapter.
//!
//! This is the request/response boundary the orchestration layer calls:
//! one POST per user utterance, state round-tripped through the client.
//! No session storage lives here.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::crisis::CrisisScreen;
use crate::turn::{self, TurnRequest, TurnResponse};

/// Shared read-only state for the turn routes.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub crisis: Arc<CrisisScreen>,
}

/// POST /api/turn
///
/// Process one user turn. The crisis screen runs first; a match
/// short-circuits the engine and returns emergency resources with the
/// prior state untouched.
async fn post_turn(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Json<TurnResponse> {
    let turn_id = Uuid::new_v4();

    if let Some(crisis) = state.crisis.screen(&request.utterance) {
        info!(%turn_id, reason = %crisis.reason, "Crisis screen matched, short-circuiting turn");
        return Json(TurnResponse {
            state: request.prior_state.unwrap_or(serde_json::Value::Null),
            message: crisis.helplines.to_string(),
            status: "crisis".into(),
            done: false,
            assessment_name: None,
            total_score: None,
            interpretation: None,
        });
    }

    let response = turn::process_turn(&state.catalog, &request);
    info!(%turn_id, flow = %request.flow, status = %response.status, done = response.done, "Turn processed");
    Json(response)
}

/// GET /api/catalog
///
/// List the available questionnaires.
async fn get_catalog(State(state): State<AppState>) -> Json<serde_json::Value> {
    let entries: Vec<_> = state
        .catalog
        .iter()
        .map(|definition| {
            serde_json::json!({
                "id": definition.id,
                "display_name": definition.display_name,
                "questions": definition.questions.len(),
            })
        })
        .collect();
    Json(serde_json::json!({ "questionnaires": entries }))
}

/// GET /api/health
async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the engine routes.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/turn", post(post_turn))
        .route("/api/catalog", get(get_catalog))
        .route("/api/health", get(get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
