// HTTP transport for the entity service

mod error;
mod resources;

pub use error::ApiError;

use crate::config::ServerConfig;
use crate::model::{
    Actuator, Datastream, FeatureOfInterest, Location, Observation, ObservedProperty, Resource,
    Sensor, Task, TaskingCapability, Thing,
};
use crate::service::ResourceService;
use axum::{extract::DefaultBodyLimit, extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: ResourceService,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

/// Create API router with create/list/get endpoints for every entity type
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let prefix = normalize_prefix(&config.path_prefix);
    let prefix = prefix.as_str();

    let router = Router::new().route("/health", get(health));
    let router = resource_routes::<Thing>(router, prefix);
    let router = resource_routes::<Location>(router, prefix);
    let router = resource_routes::<Sensor>(router, prefix);
    let router = resource_routes::<ObservedProperty>(router, prefix);
    let router = resource_routes::<Datastream>(router, prefix);
    let router = resource_routes::<Observation>(router, prefix);
    let router = resource_routes::<FeatureOfInterest>(router, prefix);
    let router = resource_routes::<Actuator>(router, prefix);
    let router = resource_routes::<TaskingCapability>(router, prefix);
    let router = resource_routes::<Task>(router, prefix);

    let mut router = router
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http());
    if config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    router.with_state(Arc::new(state))
}

/// `POST`/`GET {prefix}/{Collection}` and `GET {prefix}/{Collection}/:id`
fn resource_routes<T: Resource>(
    router: Router<Arc<AppState>>,
    prefix: &str,
) -> Router<Arc<AppState>> {
    let collection = format!("{}/{}", prefix, T::KIND.collection());
    let item = format!("{}/:id", collection);
    router
        .route(
            &collection,
            get(resources::list_resources::<T>).post(resources::create_resource::<T>),
        )
        .route(&item, get(resources::get_resource::<T>))
}

/// "v1", "/v1/" and "/v1" all mount at "/v1"; "" and "/" mount at the root
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.service.backend(),
    })
}
