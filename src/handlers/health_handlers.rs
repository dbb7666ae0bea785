use crate::AppState;
use axum::{extract::State, response::Json};
use serde_json::{json, Value};

/// GET /v1/health
pub async fn health_check_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "env": state.settings.environment,
        "version": crate::VERSION,
    }))
}
