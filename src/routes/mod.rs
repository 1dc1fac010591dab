//! Rutas HTTP
//!
//! Capa de transporte: traduce JSON a las operaciones del gestor de viajes
//! y sus resultados (o errores) de vuelta a JSON.

pub mod ride_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::cors_middleware;
use crate::state::AppState;

/// Construir el router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    let cors = cors_middleware(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/api", ride_routes::legacy_api_route())
        .nest("/api/rides", ride_routes::create_ride_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Endpoint de salud simple
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "success",
        "service": "ride-sharing",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
