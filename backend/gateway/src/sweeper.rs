//! Long-running background task that removes staged session data nobody
//! has touched for longer than the configured TTL, together with the
//! in-memory checkouts of those sessions.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{error, info};

use crate::api::ApiState;
use crate::config::Config;
use crate::db;

pub struct SweeperState {
    pub pool: SqlitePool,
    pub config: Config,
    pub api: Arc<ApiState>,
}

/// Spawn the sweeper loop as a background [`tokio`] task.
pub async fn run(state: Arc<SweeperState>) {
    info!(
        "Session sweeper starting: ttl {}s, every {}s",
        state.config.session_ttl_secs, state.config.sweep_interval_secs
    );

    loop {
        tokio::time::sleep(Duration::from_secs(state.config.sweep_interval_secs)).await;

        match sweep_once(&state.pool, state.config.session_ttl_secs).await {
            Ok(0) => {}
            Ok(removed) => info!("Swept {removed} stale session rows"),
            Err(e) => error!("Session sweep error: {e}"),
        }

        let evicted = state
            .api
            .evict_idle(Duration::from_secs(state.config.session_ttl_secs));
        if evicted > 0 {
            info!(
                "Evicted {evicted} idle checkouts, {} still open",
                state.api.open_checkouts()
            );
        }
    }
}

/// Perform a single sweep relative to the current time.
async fn sweep_once(pool: &SqlitePool, ttl_secs: u64) -> crate::errors::Result<u64> {
    let cutoff = chrono::Utc::now().timestamp() - ttl_secs as i64;
    db::sweep_stale_sessions(pool, cutoff).await
}
