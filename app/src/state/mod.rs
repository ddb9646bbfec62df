pub mod config;
mod board;

pub use board::{BoardState, BoardWriter};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::actors::Actor;
use config::SystemConfig;

/// Everything the scoreboard process shares between threads: the config
/// cache, the published board, the connected host clients and the running
/// actors.
pub struct SystemState {
    pub system: SystemConfig,
    pub board: BoardState,
    pub hosts: Arc<HostClients>,
    actors: RwLock<HashMap<String, RunningActor>>,
}

struct RunningActor {
    actor: Box<dyn Actor>,
    shutdown: Arc<AtomicBool>,
    bind: Option<SocketAddr>,
}

impl SystemState {
    pub fn new(config_path: PathBuf) -> (Self, BoardWriter) {
        Self::with_config(SystemConfig::new(config_path))
    }

    pub fn with_config(system: SystemConfig) -> (Self, BoardWriter) {
        let (board, writer) = BoardState::new();
        let state = Self {
            system,
            board,
            hosts: Arc::new(HostClients::default()),
            actors: RwLock::new(HashMap::new()),
        };
        (state, writer)
    }

    pub fn register_actor(
        &self,
        id: String,
        actor: Box<dyn Actor>,
        shutdown: Arc<AtomicBool>,
        bind: Option<SocketAddr>,
    ) {
        let running = RunningActor {
            actor,
            shutdown,
            bind,
        };
        self.actors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, running);
    }

    pub fn actor_ids(&self) -> Vec<String> {
        let actors = self.actors.read().unwrap_or_else(|e| e.into_inner());
        actors.keys().cloned().collect()
    }

    /// Address a running webserver was started on.
    pub fn actor_bind(&self, id: &str) -> Option<SocketAddr> {
        let actors = self.actors.read().unwrap_or_else(|e| e.into_inner());
        actors.get(id).and_then(|running| running.bind)
    }

    /// Flag the actor for shutdown, ask it to stop and drop it from the
    /// registry.
    pub fn retire_actor(&self, id: &str) {
        let removed = self
            .actors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        if let Some(running) = removed {
            running.shutdown.store(true, Ordering::Relaxed);
            running.actor.stop();
        }
    }
}

/// WebSocket clients that announced themselves as the host application in
/// their `start` handshake. Result delivery needs at least one.
#[derive(Debug, Default)]
pub struct HostClients {
    connected: AtomicUsize,
}

impl HostClients {
    pub fn attach(&self) {
        self.connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detach(&self) {
        let _ = self
            .connected
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn count(&self) -> usize {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.count() > 0
    }
}
