//! Worker lifecycle: install, activate, and page control messages.
//!
//! The lifecycle owns the router's version state. Until activation the
//! router does not control pages and requests are forwarded untouched;
//! activation removes partitions of older versions and claims every open
//! page at once.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::clients::ClientRegistry;
use super::messages::ControlMessage;
use crate::config::CacheConfig;
use crate::error::{EdgeError, Result};
use crate::metrics;
use crate::router::CacheRouter;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        }
    }
}

/// Result of seeding the static partition during install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallOutcome {
    Seeded { entries: usize },
    /// Nothing was written; existing partitions are served as they are
    SeedFailed { reason: String },
}

#[derive(Clone)]
pub struct Lifecycle {
    router: CacheRouter,
    clients: ClientRegistry,
    manifest: Arc<Vec<String>>,
    version: String,
    skip_waiting_on_install: bool,
    state: Arc<RwLock<WorkerState>>,
}

impl Lifecycle {
    pub fn new(router: CacheRouter, clients: ClientRegistry, config: &CacheConfig) -> Self {
        Self {
            router,
            clients,
            manifest: Arc::new(config.precache.clone()),
            version: config.version.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
            state: Arc::new(RwLock::new(WorkerState::Parsed)),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// True once activated: only then are requests routed through the caches.
    pub fn is_controlling(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    fn set_state(&self, state: WorkerState) {
        info!("Worker {} -> {}", self.version, state.as_str());
        *self.state.write() = state;
    }

    /// Seed the static partition, then activate straight away unless
    /// configured to wait for `SKIP_WAITING`.
    ///
    /// A failed seed is logged and reported in the outcome but is not fatal:
    /// the worker installs anyway and serves from whatever the partitions
    /// already hold (a previous session's entries, or nothing).
    pub async fn install(&self) -> Result<InstallOutcome> {
        {
            let mut state = self.state.write();
            if *state != WorkerState::Parsed {
                return Err(EdgeError::InvalidRequest(format!(
                    "Cannot install a worker that is {}",
                    state.as_str()
                )));
            }
            *state = WorkerState::Installing;
        }
        info!("Installing worker {}", self.version);

        let outcome = match self.router.install(&self.manifest).await {
            Ok(entries) => {
                metrics::record_install(true);
                info!("Precached {} assets", entries);
                InstallOutcome::Seeded { entries }
            }
            Err(e) => {
                metrics::record_install(false);
                error!("Precache failed, continuing with existing partitions: {}", e);
                InstallOutcome::SeedFailed {
                    reason: e.to_string(),
                }
            }
        };

        self.set_state(WorkerState::Installed);
        if self.skip_waiting_on_install {
            self.activate()?;
        }
        Ok(outcome)
    }

    /// Remove partitions of other versions and take control of open pages.
    /// Returns the partitions deleted. Activating twice is a no-op.
    pub fn activate(&self) -> Result<Vec<String>> {
        {
            let mut state = self.state.write();
            match *state {
                WorkerState::Activated | WorkerState::Activating => return Ok(Vec::new()),
                WorkerState::Installing => {
                    return Err(EdgeError::InvalidRequest(format!(
                        "Cannot activate a worker that is {}",
                        state.as_str()
                    )));
                }
                WorkerState::Parsed | WorkerState::Installed => *state = WorkerState::Activating,
            }
        }
        info!("Activating worker {}", self.version);

        let removed = match self.router.purge_stale_partitions() {
            Ok(removed) => removed,
            Err(e) => {
                // Stay installed so a later SKIP_WAITING can try again
                self.set_state(WorkerState::Installed);
                return Err(e);
            }
        };

        self.set_state(WorkerState::Activated);
        let claimed = self.clients.claim(&self.version);
        info!(
            "Worker {} active: removed {} old partitions, claimed {} pages",
            self.version,
            removed.len(),
            claimed
        );
        Ok(removed)
    }

    /// Activate a waiting worker now. Returns false if there was nothing waiting.
    pub fn skip_waiting(&self) -> Result<bool> {
        if self.state() != WorkerState::Installed {
            return Ok(false);
        }
        self.activate()?;
        Ok(true)
    }

    /// Handle a control message from a page.
    pub fn handle_message(&self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::SkipWaiting => {
                if !self.skip_waiting()? {
                    info!("SKIP_WAITING ignored: worker is {}", self.state().as_str());
                }
            }
            ControlMessage::ClearCache => {
                self.router.clear_all()?;
            }
            ControlMessage::Unknown => warn!("Ignoring unknown control message"),
        }
        Ok(())
    }
}
