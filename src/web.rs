//! Read-only HTTP view of the price sensors
//!
//! Other systems read the displayed data contract from here: one JSON
//! snapshot per sensor with its state, unit and `today`/`tomorrow` attributes.

use crate::error::{PriceError, Result};
use crate::integration::EntityRegistry;
use crate::sensor::SensorSnapshot;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EntityRegistry>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn list_sensors(State(state): State<AppState>) -> Json<Vec<SensorSnapshot>> {
    Json(state.registry.snapshots())
}

pub async fn get_sensor(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> std::result::Result<Json<SensorSnapshot>, StatusCode> {
    state
        .registry
        .get(&unique_id)
        .map(|sensor| Json(sensor.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub fn router(registry: Arc<EntityRegistry>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sensors", get(list_sensors))
        .route("/api/sensors/{unique_id}", get(get_sensor))
        .with_state(AppState { registry })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the task is aborted
pub async fn serve(registry: Arc<EntityRegistry>, host: &str, port: u16) -> Result<()> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| PriceError::validation("web.host", format!("invalid address {host}")))?;
    let addr = SocketAddr::new(ip, port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Sensor view listening on http://{addr}");
    axum::serve(listener, router(registry)).await?;
    Ok(())
}
