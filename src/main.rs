mod blog;
mod config;
mod contact;
mod content_loader;
mod error;
mod hot_reload;
mod markdown;
mod models;
mod pagination;
mod render;
mod routes;
mod search;
mod slug;
mod state;

use std::{net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SiteConfig;
use crate::content_loader::load_content;
use crate::error::{Result, SiteError};
use crate::hot_reload::start_content_watcher;
use crate::routes::build_router;
use crate::state::{AppState, RouterState};

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SiteConfig::from_env()?;
    info!(
        development = config.is_development,
        content_dir = %config.content_dir.display(),
        "starting {}", config.site_name
    );

    let content = load_content(&config).await.inspect_err(|e| {
        error!("Failed to load initial content: {}", e);
    })?;

    let port = config.port;
    let is_development = config.is_development;
    let state = Arc::new(AppState::new(config, content));

    // Hot-reload setup
    let (tx, _rx) = broadcast::channel(1);
    if is_development {
        info!("Hot reload enabled. Check logs for file change events.");
        if let Err(e) = start_content_watcher(tx.clone(), state.clone()) {
            error!("Hot reload unavailable: {}", e);
        }
    }

    let app = build_router(RouterState {
        app_state: state,
        broadcaster: tx,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SiteError::io(addr.to_string(), e))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| SiteError::io(addr.to_string(), e))?;
    Ok(())
}
