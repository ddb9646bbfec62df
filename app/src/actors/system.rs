//! System actor — applies settings replacements.
//!
//! Handles `ConfigCommand` events from the REST API: caches and persists
//! the new config, pushes the cue flag to the scoreboard, and brings the
//! running web servers in line with the `[webserver.N]` sections. Runs on
//! its own thread so settings keep working while a web server rebinds.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::actors::{Actor, plan_webservers};
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::SystemState;
use hoopclock::{ConfigCommand, ConfigOutcome, GameAction, HoopEvent, HoopMessage};

const WEBSERVER_PREFIX: &str = "webserver.";

/// Web servers touched by a reload.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct WebserverChanges {
    pub restarted: Vec<String>,
    pub stopped: Vec<String>,
    pub started: Vec<String>,
}

/// Match the running web servers to the cached config: stop the ones whose
/// section is gone, rebind the ones whose address changed, start new ones.
pub(crate) fn reload_webservers(
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<HoopMessage>,
) -> WebserverChanges {
    let mut wanted = plan_webservers(&state.system.snapshot());
    let mut changes = WebserverChanges::default();

    let running = state
        .actor_ids()
        .into_iter()
        .filter(|id| id.starts_with(WEBSERVER_PREFIX));
    for id in running {
        let Some(pos) = wanted.iter().position(|plan| plan.id == id) else {
            tracing::info!("settings: stopping '{id}', its section was removed");
            state.retire_actor(&id);
            changes.stopped.push(id);
            continue;
        };
        let plan = wanted.swap_remove(pos);
        if state.actor_bind(&id) == Some(plan.addr) {
            continue;
        }
        tracing::info!("settings: rebinding '{id}' to {}", plan.addr);
        state.retire_actor(&id);
        // Let the old listener release its socket.
        std::thread::sleep(Duration::from_millis(100));
        plan.start(state, bus_tx);
        changes.restarted.push(id);
    }

    for plan in wanted {
        changes.started.push(plan.id.clone());
        plan.start(state, bus_tx);
    }
    changes
}

/// Always-on actor that owns config writes.
pub struct SystemActor {
    bus_tx: broadcast::Sender<HoopMessage>,
    ready_tx: Mutex<Option<std_mpsc::SyncSender<()>>>,
}

impl SystemActor {
    /// Returns the actor and a receiver that fires once its loop is polling.
    pub fn new(bus_tx: broadcast::Sender<HoopMessage>) -> (Self, std_mpsc::Receiver<()>) {
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
        let actor = Self {
            bus_tx,
            ready_tx: Mutex::new(Some(ready_tx)),
        };
        (actor, ready_rx)
    }
}

impl Actor for SystemActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        let ready = self.ready_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(ready_tx) = ready else {
            tracing::error!("system: already started");
            return;
        };
        let bus_tx = self.bus_tx.clone();
        std::thread::Builder::new()
            .name("system".into())
            .spawn(move || {
                let _ = ready_tx.send(());
                run(&state, &bus_tx, &sender, receiver);
            })
            .expect("failed to spawn system thread");
    }
}

fn run(
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<HoopMessage>,
    sender: &BusSender,
    mut receiver: BusReceiver,
) {
    loop {
        match receiver.poll() {
            Ok(Some(msg)) => {
                if let HoopEvent::ConfigCommand(cmd) = msg.event {
                    handle_config_command(cmd, state, bus_tx, sender);
                }
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(PollError::Shutdown) => return,
        }
    }
}

pub(crate) fn handle_config_command(
    cmd: ConfigCommand,
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<HoopMessage>,
    sender: &BusSender,
) {
    let cues = cmd.config.game.cues;
    state.system.replace(cmd.config);
    // Rules and clocks wait for the next new game; cues apply at once.
    sender.send(HoopMessage::new(GameAction::SetCues { enabled: cues }));
    let changes = reload_webservers(state, bus_tx);

    if let Some(request_id) = cmd.request_id {
        sender.send(HoopMessage::new(ConfigOutcome {
            request_id,
            restarted: changes.restarted,
            stopped: changes.stopped,
            started: changes.started,
        }));
    }
}
