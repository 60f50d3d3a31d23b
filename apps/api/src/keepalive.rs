//! Periodic write traffic that keeps the hosted database from being paused
//! for inactivity. Each cycle alternately inserts and deletes one sentinel row.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::db::StoreError;

pub const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(4 * 24 * 60 * 60);
pub const SENTINEL_ID: &str = "keep-alive-sentinel";

#[async_trait]
pub trait KeepAliveStore: Send + Sync {
    async fn insert_sentinel(&self) -> Result<(), StoreError>;

    async fn delete_sentinel(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgKeepAliveStore {
    pool: PgPool,
}

impl PgKeepAliveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeepAliveStore for PgKeepAliveStore {
    async fn insert_sentinel(&self) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO keep_alive (id, touched_at) VALUES ($1, now()) \
             ON CONFLICT (id) DO UPDATE SET touched_at = now()",
        )
        .bind(SENTINEL_ID)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_sentinel(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM keep_alive WHERE id = $1")
            .bind(SENTINEL_ID)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Handle to the running keep-alive task.
pub struct KeepAlive {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Spawns the task. The first cycle runs one full `period` after start.
    pub fn start(store: Arc<dyn KeepAliveStore>, period: Duration) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            let mut inserted = false;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let result = if inserted {
                            store.delete_sentinel().await
                        } else {
                            store.insert_sentinel().await
                        };
                        match result {
                            Ok(()) => debug!(inserted = !inserted, "Keep-alive cycle complete"),
                            Err(e) => warn!("Keep-alive cycle failed: {e}"),
                        }
                        inserted = !inserted;
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Keep-alive task stopped");
        });

        info!("Keep-alive task started (period: {}s)", period.as_secs());
        Self { shutdown, handle }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!("Keep-alive task ended abnormally: {e}");
        }
    }
}
