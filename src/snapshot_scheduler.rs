// src/snapshot_scheduler.rs - Snapshot scheduler module
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::{ArticleStore, Config, LensError, Result};

#[derive(Debug, Clone)]
pub struct SnapshotSchedulerStatus {
    /// Whether the scheduler is running
    pub is_running: bool,
    /// The time the last snapshot was created
    pub last_snapshot_time: Option<chrono::DateTime<Utc>>,
    /// The path to the last snapshot file
    pub last_snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum SnapshotCommand {
    /// Create a snapshot immediately
    SnapshotNow,
    /// Stop the snapshot scheduler
    Stop,
}

pub struct SnapshotScheduler {
    /// Configuration for the scheduler
    config: Config,

    /// Channel to send commands to the scheduler task
    command_tx: mpsc::Sender<SnapshotCommand>,

    /// Handle to the scheduler task
    scheduler_task: Option<JoinHandle<()>>,

    /// Current status, shared with the scheduler task
    status: Arc<Mutex<SnapshotSchedulerStatus>>,

    /// The store to snapshot
    store: Arc<ArticleStore>,
}

impl SnapshotScheduler {
    /// Create a new snapshot scheduler for the given store
    pub fn new(config: Config, store: Arc<ArticleStore>) -> Self {
        let (command_tx, _) = mpsc::channel(10);

        Self {
            config,
            command_tx,
            scheduler_task: None,
            status: Arc::new(Mutex::new(SnapshotSchedulerStatus {
                is_running: false,
                last_snapshot_time: None,
                last_snapshot_path: None,
            })),
            store,
        }
    }

    /// Start the snapshot scheduler
    pub fn start(&mut self) -> Result<()> {
        info!("Starting snapshot scheduler...");
        if !self.config.auto_snapshot {
            return Ok(()); // No need to start if auto snapshots are disabled
        }

        let (command_tx, mut command_rx) = mpsc::channel(10);
        self.command_tx = command_tx;

        let frequency_secs = self.config.snapshot_frequency as u64 * 3600;
        let store = Arc::clone(&self.store);
        let status = Arc::clone(&self.status);

        let task = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(frequency_secs));
            interval.tick().await; // Initial tick

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        run_snapshot(&store, &status, "Scheduled");
                    }
                    Some(cmd) = command_rx.recv() => match cmd {
                        SnapshotCommand::SnapshotNow => {
                            run_snapshot(&store, &status, "Manual");
                        },
                        SnapshotCommand::Stop => {
                            info!("Snapshot scheduler stopping...");
                            break;
                        }
                    }
                }
            }
        });

        self.scheduler_task = Some(task);
        if let Ok(mut status) = self.status.lock() {
            status.is_running = true;
        }

        Ok(())
    }

    /// Stop the snapshot scheduler if it's running
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.scheduler_task.take() {
            // Send stop command to the scheduler task
            if let Err(e) = self.command_tx.send(SnapshotCommand::Stop).await {
                error!("Failed to send stop command to snapshot scheduler: {}", e);
            }

            // Wait for the task to complete
            if let Err(e) = task.await {
                let error_mgs = format!("Failed to stop snapshot scheduler: {}", e);
                error!("{}", error_mgs);
                return Err(LensError::SnapshotFailed { message: error_mgs });
            }

            if let Ok(mut status) = self.status.lock() {
                status.is_running = false;
            }
            info!("Snapshot scheduler stopped");
        } else {
            debug!("Snapshot scheduler is not running");
        }

        Ok(())
    }

    /// Create a snapshot immediately, regardless of the schedule
    pub async fn snapshot_now(&self) -> Result<()> {
        if !self.get_status().is_running {
            return Err(LensError::SnapshotFailed {
                message: "Snapshot scheduler is not running".to_string(),
            });
        }

        self.command_tx
            .send(SnapshotCommand::SnapshotNow)
            .await
            .map_err(|e| LensError::SnapshotFailed {
                message: format!("Failed to send snapshot command: {}", e),
            })?;

        Ok(())
    }

    /// Get the current status of the snapshot scheduler
    pub fn get_status(&self) -> SnapshotSchedulerStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_else(|_| SnapshotSchedulerStatus {
                is_running: false,
                last_snapshot_time: None,
                last_snapshot_path: None,
            })
    }
}

fn run_snapshot(
    store: &Arc<ArticleStore>,
    status: &Arc<Mutex<SnapshotSchedulerStatus>>,
    kind: &str,
) {
    match store.create_snapshot() {
        Ok(path) => {
            info!("{} snapshot completed at {}", kind, path.display());
            if let Ok(mut status) = status.lock() {
                status.last_snapshot_time = Some(Utc::now());
                status.last_snapshot_path = Some(path);
            }
        }
        Err(e) => error!("{} snapshot failed: {}", kind, e),
    }
}
