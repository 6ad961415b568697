use super::{ApiError, AppState};
use crate::model::{EntityId, Resource};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::debug;

/// POST /{Collection} - Create one entity
pub(super) async fn create_resource<T: Resource>(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<T>), ApiError> {
    // Decode from raw bytes so malformed bodies get the same error shape as domain errors
    let record: T = serde_json::from_slice(&body).map_err(|e| {
        debug!(entity = %T::KIND, error = %e, "Rejected request body");
        ApiError::InvalidBody(e.to_string())
    })?;

    let stored = state.service.create(record)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /{Collection} - List all entities of one type
pub(super) async fn list_resources<T: Resource>(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<T>>, ApiError> {
    Ok(Json(state.service.list::<T>()?))
}

/// GET /{Collection}/:id - Get one entity
pub(super) async fn get_resource<T: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<T>, ApiError> {
    let id: EntityId = id
        .parse()
        .map_err(|_| ApiError::InvalidId(id.clone()))?;
    Ok(Json(state.service.get::<T>(id)?))
}
