use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use tokio::signal;
use tracing::{error, info, warn};

use multidrop_dispatch::config::environment::EnvironmentConfig;
use multidrop_dispatch::database::DatabaseConnection;
use multidrop_dispatch::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use multidrop_dispatch::routes::dispatch_routes::create_dispatch_router;
use multidrop_dispatch::services::notification_service::{NoopNotifier, Notifier, RedisNotifier};
use multidrop_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚚 Multi-drop Dispatch Engine");
    info!("=============================");

    let config = EnvironmentConfig::default();

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let pool = db_connection.pool().clone();

    // Inicializar el publicador de eventos; sin Redis los eventos se
    // degradan a no-op y el despacho sigue funcionando
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

    let notifier: Arc<dyn Notifier> =
        match RedisNotifier::new(&redis_url, &config.event_channel_prefix).await {
            Ok(notifier) => {
                info!("✅ Redis conectado exitosamente");
                Arc::new(notifier)
            }
            Err(e) => {
                warn!("⚠️ Redis no disponible ({}), eventos en modo no-op", e);
                Arc::new(NoopNotifier)
            }
        };

    let app_state = AppState::new(pool, config.clone(), notifier);

    let cors = if config.is_production() {
        cors_middleware_with_origins(config.cors_origins.clone())
    } else {
        cors_middleware()
    };

    // Crear router de la API
    let app = Router::new()
        .route("/health", get(health_endpoint))
        .nest("/api/dispatch", create_dispatch_router())
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("📦 Endpoints de despacho:");
    info!("   GET  /api/dispatch/pending-jobs - Pool pendiente con estadísticas");
    info!("   GET  /api/dispatch/route-suggestions - Clusters sugeridos");
    info!("   POST /api/dispatch/routes - Crear y asignar ruta");
    info!("   GET  /api/dispatch/routes/active - Panel de rutas activas");
    info!("   GET  /api/dispatch/routes/:id - Detalle de ruta");
    info!("   POST /api/dispatch/routes/:id/start - Iniciar ruta");
    info!("   POST /api/dispatch/routes/:id/complete - Completar y liquidar ruta");
    info!("   POST /api/dispatch/routes/:id/cancel - Cancelar ruta");
    info!("   GET  /api/dispatch/routes/:id/earnings - Ganancias de la ruta");
    info!("   POST /api/dispatch/routes/:id/drops - Añadir drop");
    info!("   DELETE /api/dispatch/routes/:id/drops/:drop_id - Retirar drop");
    info!("   POST /api/dispatch/routes/:id/drops/:drop_id/deliver - Entregar drop");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check del servicio
async fn health_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "service": "multidrop-dispatch",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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
