use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use ride_sharing::config::EnvironmentConfig;
use ride_sharing::routes::create_app;
use ride_sharing::state::{build_repository, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("🚕 Ride Sharing - Ride Lifecycle API");
    info!("====================================");
    info!("⚙️ Entorno: {}, store: {:?}", config.environment, config.store_backend);

    let repository = match build_repository(&config).await {
        Ok(repository) => repository,
        Err(e) => {
            error!("❌ Error inicializando el store: {:#}", e);
            return Err(e);
        }
    };

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid HOST/PORT '{}'", config.server_url()))?;

    let app = create_app(AppState::new(repository, config));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   POST /api/rides/request - Solicitar viaje");
    info!("   POST /api/rides/accept - Aceptar viaje");
    info!("   POST /api/rides/complete - Completar viaje");
    info!("   POST /api/rides/feedback - Registrar feedback");
    info!("   GET  /api/rides/:ride_id - Obtener viaje");
    info!("   GET  /api/rides/:ride_id/feedback - Feedback del viaje");
    info!("   POST /api?endpoint=<operación> - Dispatcher legacy");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            e
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
