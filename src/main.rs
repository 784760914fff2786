// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sunquote::config::AppConfig;
use sunquote::database;
use sunquote::notify::{CrmChannel, EmailChannel, LeadChannel, Outbox};
use sunquote::state::AppState;
use sunquote::store::PgStore;
use sunquote::submission::{PhotoStore, SubmissionPipeline};
use sunquote::wizard::WizardSessions;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return;
        }
    };

    // Create database pool
    let db_pool = match database::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create database pool");
            return;
        }
    };
    if let Err(e) = database::run_migrations(&db_pool).await {
        tracing::error!(error = %e, "Failed to run migrations");
        return;
    }
    let store = Arc::new(PgStore::new(db_pool));

    // Lead delivery channels; each one is optional
    let mut channels: Vec<Arc<dyn LeadChannel>> = Vec::new();
    match &config.smtp {
        Some(smtp) => match EmailChannel::pair(smtp) {
            Ok((customer, team)) => {
                channels.push(Arc::new(customer));
                channels.push(Arc::new(team));
            }
            Err(e) => tracing::warn!(error = %e, "Email disabled"),
        },
        None => tracing::debug!("SMTP not configured, quote emails disabled"),
    }
    match &config.crm {
        Some(crm) => channels.push(Arc::new(CrmChannel::new(reqwest::Client::new(), crm.clone()))),
        None => tracing::debug!("CRM not configured, leads will not be forwarded"),
    }
    let (outbox, outbox_worker) = Outbox::start(config.outbox_capacity, channels, config.retry);

    // Create application state
    let photos = PhotoStore::new(&config.upload_dir, config.max_photo_bytes);
    let pipeline = SubmissionPipeline::new(store.clone(), photos, outbox);
    let app_state = AppState::new(store.clone(), store, pipeline, WizardSessions::new(config.session_ttl));
    let app = sunquote::app(app_state);

    // Try base_port..base_port+20 to avoid crash when address is in use
    let host = config.host;
    let base_port = config.port;
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => { bound = Some((l, addr)); break; }
                Err(e) => {
                    if offset == 0 { tracing::warn!(%addr, error=%e, "Port in use, trying next"); }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                tracing::error!("Failed to bind to any port starting at {} on {}", base_port, host);
                return;
            }
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for shutdown signal");
        }
    };
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!(error=%e, "Server error");
    }

    // The router held the last outbox sender; let queued leads go out
    match tokio::time::timeout(Duration::from_secs(30), outbox_worker).await {
        Ok(Ok(())) => tracing::info!("Notification queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Notification worker stopped unexpectedly"),
        Err(_) => tracing::warn!("Gave up waiting for queued notifications"),
    }
}
