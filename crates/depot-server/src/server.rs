//! Server assembly and startup.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use depot_acl::{AclEngine, AclStore, MemoryStore};
use depot_auth::{AuthConfig, AuthError, AuthLayer, AuthenticatedUser, JwtValidator, TokenValidator};
use depot_core::PermissionCatalog;
use depot_mysql::MySqlAclStore;

use crate::config::ServerConfig;
use crate::routes::{self, AppState};
use crate::{Error, Result};

/// Validator installed when authentication is disabled. Never called, since
/// the auth layer passes requests through without looking at tokens.
struct DisabledValidator;

impl TokenValidator for DisabledValidator {
    fn validate(
        &self,
        _token: &str,
        _config: &AuthConfig,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<AuthenticatedUser, AuthError>> + Send + '_>>
    {
        Box::pin(async { Err(AuthError::Misconfigured("authentication is disabled".to_string())) })
    }
}

/// Opens the configured store, falling back to an in-memory store seeded
/// with the built-in catalog.
pub fn build_store(config: &ServerConfig) -> Result<Arc<dyn AclStore>> {
    if config.database.is_configured() {
        Ok(Arc::new(MySqlAclStore::connect_lazy(&config.database)?))
    } else {
        log::warn!("No database configured; using an empty in-memory authority store");
        Ok(Arc::new(MemoryStore::with_builtin_catalog()))
    }
}

/// The catalog stored in the database, or the built-in one when the store
/// has none or cannot be read.
pub async fn load_catalog(store: &dyn AclStore) -> PermissionCatalog {
    match store.permissions().await {
        Ok(rows) if !rows.is_empty() => {
            log::info!("Loaded {} permissions from the store", rows.len());
            PermissionCatalog::from_permissions(rows)
        }
        Ok(_) => PermissionCatalog::builtin(),
        Err(e) => {
            log::warn!("Permission catalog unavailable, using built-in catalog: {e}");
            PermissionCatalog::builtin()
        }
    }
}

/// Builds the engine and router for `config`.
pub async fn build_app(config: &ServerConfig, store: Arc<dyn AclStore>) -> Result<axum::Router> {
    let catalog = load_catalog(store.as_ref()).await;
    let engine = AclEngine::with_catalog(store, config.acl.clone(), catalog);
    let state = AppState { engine };
    let auth_config = config.auth.auth_config();

    let router = if config.auth.enabled {
        let validator = JwtValidator::new(&config.auth.jwt_secret, config.auth.issuer.as_deref())?;
        routes::router(
            state,
            AuthLayer::new(Arc::new(validator), auth_config),
            config.warehouse.clone(),
        )
    } else {
        log::warn!("Authentication disabled; gated routes will answer 401");
        routes::router(
            state,
            AuthLayer::new(Arc::new(DisabledValidator), auth_config),
            config.warehouse.clone(),
        )
    };
    Ok(router)
}

/// Runs the server until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let store = build_store(&config)?;
    let app = build_app(&config, store).await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::io_with_path(e, addr.to_string()))?;
    tracing::info!(%addr, "Depot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::io_with_path(e, addr.to_string()))?;

    tracing::info!("Depot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
