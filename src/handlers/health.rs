use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::HealthResponse,
};

/// health_check
///
/// [Public Route] Probes Postgres (`SELECT NOW()`) and Redis (`SET`/`GET health`).
/// Either failure answers 500 with the usual `{ "error": ... }` body.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Both stores reachable", body = HealthResponse),
        (status = 500, description = "A store is unreachable")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let postgres = state.repo.ping().await?;
    let redis = state
        .cache
        .probe()
        .await
        .map_err(|e| AppError::Internal(format!("redis probe failed: {}", e)))?;

    Ok(Json(HealthResponse { postgres, redis }))
}
