//! Dataset catalog endpoint.

use axum::{extract::State, routing::get, Json, Router};

use crate::state::AppState;

/// GET /api/datasets - configured keys in registry order
pub async fn list_datasets(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .service
            .datasets()
            .map(|spec| spec.key.as_str().to_string())
            .collect(),
    )
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(list_datasets))
}
