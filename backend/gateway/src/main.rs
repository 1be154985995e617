//! Storefront gateway entry point.
//!
//! Hosts the campaign checkout for browser sessions: staged drafts live in
//! SQLite so they survive reloads, and committed drafts become campaigns on
//! the remote campaign API. A background task sweeps abandoned sessions.

mod api;
mod client;
mod config;
mod db;
mod errors;
mod sweeper;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use campaign_flow::SimulatedPayment;
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ApiState;
use client::HttpCampaignApi;
use config::Config;
use sweeper::SweeperState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url).await?;

    let client = Client::builder().timeout(config.http_timeout()).build()?;

    let api_state = Arc::new(ApiState::new(
        pool.clone(),
        Arc::new(HttpCampaignApi::new(client, config.api_base_url.clone())),
        Arc::new(SimulatedPayment::new(config.payment_delay())),
        config.payment_timeout(),
    ));

    // ─── Background sweeper ───────────────────────────────
    let sweeper_state = Arc::new(SweeperState {
        pool,
        config: config.clone(),
        api: api_state.clone(),
    });
    tokio::spawn(sweeper::run(sweeper_state));

    // ─── REST API ─────────────────────────────────────────
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/donor/payments", get(api::donor_payments))
        .route("/auth/reset-password", post(api::reset_password))
        .route("/sessions/:id/draft", put(api::stage_draft))
        .route("/sessions/:id/checkout", get(api::get_checkout))
        .route("/sessions/:id/checkout/method", post(api::select_method))
        .route("/sessions/:id/checkout/commit", post(api::commit_checkout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("Gateway listening on http://{addr} (campaign API: {})", config.api_base_url);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
