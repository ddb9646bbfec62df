//! Actors on the shared bus: the always-on system and scoreboard actors, and
//! one web server per `[webserver.N]` section.

pub mod host;
pub mod scoreboard;
pub mod system;
pub mod web;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::broadcast;

use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use crate::state::config::{HoopConfig, global_id};
use hoopclock::HoopMessage;

pub const SYSTEM_ID: &str = "system";
pub const SCOREBOARD_ID: &str = "scoreboard";

/// A long-running component with its own thread.
pub trait Actor: Send + Sync {
    /// Spawn the run loop.
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver);

    /// Ask the run loop to exit. Actors without a shutdown channel rely on
    /// `BusReceiver::is_shutdown()` instead.
    fn stop(&self) {}
}

/// A web server the config asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebserverPlan {
    pub id: String,
    pub name: String,
    pub addr: SocketAddr,
}

impl WebserverPlan {
    pub fn start(self, state: &Arc<SystemState>, bus_tx: &broadcast::Sender<HoopMessage>) {
        tracing::info!("starting web server '{}' ({}) on {}", self.id, self.name, self.addr);
        let actor = Box::new(web::WebActor::new(self.addr));
        start_actor(self.id, actor, Some(self.addr), state, bus_tx);
    }
}

/// Web servers wanted by `config`. Sections with an unparsable bind address
/// are logged and left out.
pub fn plan_webservers(config: &HoopConfig) -> Vec<WebserverPlan> {
    config
        .webserver
        .iter()
        .filter_map(|(index, section)| {
            let id = global_id("webserver", index);
            match section.bind.parse::<SocketAddr>() {
                Ok(addr) => Some(WebserverPlan {
                    id,
                    name: section.name.clone(),
                    addr,
                }),
                Err(e) => {
                    tracing::warn!("{id}: invalid bind address '{}': {e}", section.bind);
                    None
                }
            }
        })
        .collect()
}

/// Wire an actor to the bus, start it and register it.
pub fn start_actor(
    id: String,
    actor: Box<dyn Actor>,
    bind: Option<SocketAddr>,
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<HoopMessage>,
) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let sender = BusSender::new(id.clone(), bus_tx.clone(), Arc::clone(&shutdown));
    let receiver = sender.subscribe();
    actor.start(Arc::clone(state), sender, receiver);
    state.register_actor(id, actor, shutdown, bind);
}

/// Display name per actor id, for `/api/status`.
pub fn actor_names(config: &HoopConfig) -> HashMap<String, String> {
    let builtins = [(SYSTEM_ID, "System"), (SCOREBOARD_ID, "Scoreboard")];
    let mut names: HashMap<String, String> = builtins
        .into_iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect();
    for (index, section) in &config.webserver {
        names.insert(global_id("webserver", index), section.name.clone());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoopclock::WebserverSection;

    #[test]
    fn invalid_binds_are_skipped() {
        let mut config = HoopConfig::default();
        config.webserver.insert(
            "1".into(),
            WebserverSection {
                name: "Broken".into(),
                bind: "not-an-address".into(),
            },
        );
        let plans = plan_webservers(&config);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, "webserver.0");
        assert_eq!(plans[0].addr, "127.0.0.1:3030".parse().unwrap());
    }

    #[test]
    fn names_include_builtins() {
        let names = actor_names(&HoopConfig::default());
        assert_eq!(names[SCOREBOARD_ID], "Scoreboard");
        assert_eq!(names[SYSTEM_ID], "System");
        assert_eq!(names["webserver.0"], "Web Server");
    }
}
