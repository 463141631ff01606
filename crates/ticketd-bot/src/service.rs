//! Service lifecycle: background tasks and the start/stop/status surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::alerts;
use crate::error::TicketError;
use crate::lifecycle::TicketManager;
use crate::panels;

#[derive(Debug, Clone, Copy)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime: Duration,
    pub open_tickets: i64,
    /// Mean of all submitted ratings, `None` until the first one lands.
    pub average_rating: Option<f64>,
    pub rated_tickets: i64,
}

/// Owns the sweeper and refresher tasks.
pub struct BotService {
    manager: TicketManager,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    started_at: Instant,
}

impl BotService {
    /// Spawn the background tasks and return the running service.
    pub fn start(manager: TicketManager) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            alerts::spawn_alert_sweeper(
                manager.clone(),
                alerts::DEFAULT_SWEEP_INTERVAL,
                shutdown_rx.clone(),
            ),
            panels::spawn_panel_refresher(
                manager.config_handle(),
                Arc::clone(manager.platform()),
                panels::DEFAULT_REFRESH_INTERVAL,
                shutdown_rx,
            ),
        ];

        info!("Ticket service started");
        Self {
            manager,
            shutdown_tx,
            tasks: Mutex::new(tasks),
            running: AtomicBool::new(true),
            started_at: Instant::now(),
        }
    }

    pub const fn manager(&self) -> &TicketManager {
        &self.manager
    }

    /// Stop the background tasks. Calling twice is a no-op.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.lock().await.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task did not stop cleanly");
            }
        }
        info!("Ticket service stopped");
    }

    pub async fn status(&self) -> Result<ServiceStatus, TicketError> {
        let open_tickets = self.manager.db().count_open_tickets().await?;
        let ratings = self.manager.db().average_rating().await?;
        Ok(ServiceStatus {
            running: self.running.load(Ordering::SeqCst),
            uptime: self.started_at.elapsed(),
            open_tickets,
            average_rating: ratings.average,
            rated_tickets: ratings.total,
        })
    }
}
