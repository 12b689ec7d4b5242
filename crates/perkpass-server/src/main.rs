//! PerkPass Server — Application entry point.

mod config;
mod http;

use std::sync::Arc;

use perkpass_access::{AccessConfig, AccessService};
use perkpass_db::repository::{
    SurrealAgreementRepository, SurrealLedgerRepository, SurrealMemberRepository,
};
use perkpass_db::DbManager;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::http::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("perkpass=info".parse()?),
        )
        .json()
        .init();

    tracing::info!("Starting PerkPass server...");

    let server_config = ServerConfig::from_env()?;

    let access_config = AccessConfig::new(server_config.credential_secret.clone())?
        .with_credential_ttl_hours(server_config.credential_ttl_hours);

    let db = DbManager::connect(&server_config.db).await?;
    db.migrate().await?;

    let access = AccessService::new(
        SurrealMemberRepository::new(db.client().clone()),
        SurrealAgreementRepository::new(db.client().clone()),
        SurrealLedgerRepository::new(db.client().clone()),
        access_config,
    );

    let router = http::build_router(Arc::new(AppState { access }));

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    tracing::info!(addr = %server_config.bind_addr, "Listening");

    axum::serve(listener, router).await?;

    tracing::info!("PerkPass server stopped.");
    Ok(())
}
