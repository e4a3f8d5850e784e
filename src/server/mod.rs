//! HTTP surface.
//!
//! | Path | Method | |
//! |---|---|---|
//! | `/` | GET | all modules |
//! | `/latest` | GET | most recent module |
//! | `/tags` | GET | distinct tags |
//! | `/tag/{tag}` | GET | modules with a tag, 404 if none |
//! | `/images/*` | GET | 302 to the source site |
//! | `/slack` | GET, POST | install page, slash command |
//! | `/slack/oauth` | GET, POST | install confirmation |

mod handlers;
mod pages;

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::RefreshScheduler;
use crate::services::CommandBridge;

pub use handlers::{Format, render};

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<RefreshScheduler>,
    pub bridge: CommandBridge,
    pub source_base: String,
    pub slack_client_id: String,
}

impl AppState {
    pub fn new(config: &Config, scheduler: Arc<RefreshScheduler>, bridge: CommandBridge) -> Self {
        Self {
            scheduler,
            bridge,
            source_base: config.source.base_url.clone(),
            slack_client_id: config.slack.client_id.clone(),
        }
    }
}

/// Creates the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::all))
        .route("/latest", get(handlers::latest))
        .route("/tags", get(handlers::tags))
        .route("/tag/:tag", get(handlers::by_tag))
        .route("/images/*path", get(handlers::image_redirect))
        .route(
            "/slack",
            get(handlers::slack_landing).post(handlers::slack_command),
        )
        .route(
            "/slack/oauth",
            get(handlers::slack_oauth).post(handlers::slack_oauth),
        )
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
