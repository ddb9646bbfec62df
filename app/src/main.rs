use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod actors;
mod bus;
mod state;

use actors::{Actor, SCOREBOARD_ID, SYSTEM_ID};
use bus::BusSender;
use hoopclock::{HoopConfig, HoopMessage, TimeExpiryPolicy, WebserverSection};
use state::SystemState;

#[derive(Parser, Debug, Clone)]
#[command(name = "hoopclock", about = "3x3 basketball scoreboard and shot clock")]
struct Config {
    /// Config file path (default: ~/.config/hoopclock/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address for the first web server, for this run only
    #[arg(long)]
    bind: Option<String>,

    /// What happens when the game clock runs out, for this run only
    #[arg(long, value_enum)]
    time_expiry: Option<TimeExpiryPolicy>,
}

impl Config {
    /// Apply CLI overrides to the loaded config.
    fn apply(&self, config: &mut HoopConfig) {
        if let Some(bind) = &self.bind {
            let index = config
                .webserver
                .keys()
                .min()
                .cloned()
                .unwrap_or_else(|| "0".into());
            let section = config
                .webserver
                .entry(index)
                .or_insert_with(|| WebserverSection {
                    name: "Web Server".into(),
                    bind: String::new(),
                });
            section.bind = bind.clone();
        }
        if let Some(policy) = self.time_expiry {
            config.game.time_expiry = policy;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("hoopclock=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("debug logging enabled");

    let cli = Config::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(state::config::default_config_path);

    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    // Single unified bus
    let (bus_tx, _) = broadcast::channel::<HoopMessage>(1024);

    // Build shared state root (loads or creates the config file)
    let (system_state, board_writer) = SystemState::new(config_path);
    system_state.system.override_in_memory(|c| cli.apply(c));
    let state = Arc::new(system_state);

    // System actor — must be polling before anything can emit config commands.
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let sender = BusSender::new(SYSTEM_ID.into(), bus_tx.clone(), Arc::clone(&shutdown));
        let receiver = sender.subscribe();
        let (actor, ready_rx) = actors::system::SystemActor::new(bus_tx.clone());
        actor.start(Arc::clone(&state), sender, receiver);
        ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("system actor failed to start"))?;
        state.register_actor(SYSTEM_ID.into(), Box::new(actor), shutdown, None);
    }

    // Scoreboard actor — sole owner of the game controller.
    actors::start_actor(
        SCOREBOARD_ID.into(),
        Box::new(actors::scoreboard::ScoreboardActor::new(board_writer)),
        None,
        &state,
        &bus_tx,
    );

    for plan in actors::plan_webservers(&state.system.snapshot()) {
        plan.start(&state, &bus_tx);
    }

    // Drain bus (keeps broadcast channel healthy when no other subscriber)
    let mut drain_rx = bus_tx.subscribe();
    let drain_handle = tokio::spawn(async move {
        loop {
            match drain_rx.recv().await {
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("drain subscriber lagged, dropped {n} events");
                }
            }
        }
    });

    rt.block_on(async { tokio::signal::ctrl_c().await })?;

    // Shutdown — stop all actors via registry
    tracing::info!("shutting down...");
    for id in state.actor_ids() {
        state.retire_actor(&id);
    }
    // Drop bus_tx closes the broadcast channel as secondary signal
    drop(bus_tx);
    drain_handle.abort();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_override_targets_first_webserver() {
        let cli = Config::parse_from(["hoopclock", "--bind", "0.0.0.0:8080"]);
        let mut config = HoopConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.webserver["0"].bind, "0.0.0.0:8080");
        assert_eq!(config.webserver.len(), 1);
    }

    #[test]
    fn time_expiry_override() {
        let cli = Config::parse_from(["hoopclock", "--time-expiry", "finish-on-lead"]);
        let mut config = HoopConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.game.time_expiry, TimeExpiryPolicy::FinishOnLead);
    }
}
