//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. El gestor de viajes se construye sobre el
//! repositorio elegido en el arranque y se inyecta aquí.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::{DatabaseConfig, EnvironmentConfig, StoreBackend};
use crate::database;
use crate::repositories::{InMemoryRideRepository, PgRideRepository, RideRepository};
use crate::services::ride_lifecycle::RideLifecycleManager;

#[derive(Clone)]
pub struct AppState {
    pub rides: RideLifecycleManager,
    pub config: Arc<EnvironmentConfig>,
}

impl AppState {
    pub fn new(repository: Arc<dyn RideRepository>, config: EnvironmentConfig) -> Self {
        Self {
            rides: RideLifecycleManager::new(repository),
            config: Arc::new(config),
        }
    }
}

/// Construir el repositorio indicado por `STORE_BACKEND`
pub async fn build_repository(config: &EnvironmentConfig) -> Result<Arc<dyn RideRepository>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = database::create_pool(&DatabaseConfig::from_env()?).await?;
            if config.run_migrations {
                database::run_migrations(&pool).await?;
            }
            info!("✅ Store PostgreSQL listo");
            Ok(Arc::new(PgRideRepository::new(pool, config.ride_lock_timeout)))
        }
        StoreBackend::Memory => {
            warn!("⚠️ Usando store en memoria: los datos se pierden al reiniciar");
            Ok(Arc::new(InMemoryRideRepository::new(config.ride_lock_timeout)))
        }
    }
}
