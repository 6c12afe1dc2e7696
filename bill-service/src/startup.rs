//! Application startup and lifecycle management.

use crate::config::{BillConfig, StorageBackend};
use crate::handlers::{auth, bills, health};
use crate::services::{
    BillDb, BillService, BillStore, JwtService, SequenceAllocator, Stores, UserStore,
};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state for the API routes.
#[derive(Clone)]
pub struct AppState {
    pub config: BillConfig,
    pub bills: BillService,
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtService,
}

/// State for health check endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub bills: Arc<dyn BillStore>,
    pub backend: &'static str,
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application, opening the storage backend named in `config`.
    pub async fn build(config: BillConfig) -> Result<Self, AppError> {
        let stores = match config.storage {
            StorageBackend::Mongodb => {
                let db = BillDb::connect(
                    config.mongodb.uri.expose_secret(),
                    &config.mongodb.database,
                )
                .await?;
                db.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;
                Stores::mongo(db)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Stores::memory()
            }
        };

        Self::build_with_stores(config, stores).await
    }

    /// Build the application on top of already opened stores.
    pub async fn build_with_stores(config: BillConfig, stores: Stores) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let allocator = Arc::new(SequenceAllocator::new(stores.counters.clone()));

        let health_state = HealthState {
            bills: stores.bills.clone(),
            backend: match config.storage {
                StorageBackend::Mongodb => "mongodb",
                StorageBackend::Memory => "memory",
            },
        };

        let state = AppState {
            bills: BillService::new(stores.bills, allocator),
            users: stores.users,
            jwt,
            config: config.clone(),
        };

        let router = build_router(state, health_state);

        // Port 0 picks a random free port (tests).
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(port = http_port, storage = ?config.storage, "Bill service listening");

        Ok(Self {
            http_port,
            listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

fn build_router(state: AppState, health_state: HealthState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/bills", post(bills::create_bill).get(bills::list_bills))
        .route("/bills/next-number", get(bills::next_number))
        .route("/bills/counter/reset", post(bills::reset_counter))
        .route(
            "/bills/:id",
            get(bills::get_bill)
                .put(bills::update_bill)
                .delete(bills::delete_bill),
        )
        .with_state(state);

    let probes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_endpoint))
        .with_state(health_state);

    api.merge(probes)
        .route_layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
