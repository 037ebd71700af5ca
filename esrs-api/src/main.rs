//! esrs-api - ESRS emissions and disclosure service entry point

use anyhow::{Context, Result};
use clap::Parser;
use esrs_api::cli::{Args, Command, TenantCommand};
use esrs_api::{build_router, AppState};
use esrs_common::config::ServiceConfig;
use esrs_common::db::{create_tenant, init_database};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esrs_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting esrs-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = ServiceConfig::resolve(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    match args.command() {
        Command::Serve => serve(pool, config).await,
        Command::Tenant {
            action: TenantCommand::Create { name },
        } => {
            let (tenant, api_key) = create_tenant(&pool, &name)
                .await
                .context("Failed to create tenant")?;
            info!(tenant = %tenant.guid, "Tenant created");
            println!("Tenant:  {} ({})", tenant.name, tenant.guid);
            println!("API key: {}", api_key);
            println!("Store this key now; it cannot be shown again.");
            Ok(())
        }
    }
}

async fn serve(pool: SqlitePool, config: ServiceConfig) -> Result<()> {
    let bind_addr = config.bind_addr.clone();
    info!(
        "Default GWP: {}, voucher validity: {} days",
        config.default_gwp_version, config.voucher_validity_days
    );

    let app = build_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("esrs-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
