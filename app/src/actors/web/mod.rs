//! Web server actor — the scoreboard's REST API and WebSocket feed.
//!
//! Reads come straight from the published board; game actions and settings
//! replacements go over the bus to the actor that owns them, and the
//! handler waits for the matching reply.

pub mod routes;
pub mod types;
pub mod ws;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::{RwLock, broadcast, oneshot};
use tower_http::cors::CorsLayer;

use crate::actors::{Actor, actor_names};
use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use hoopclock::{ActorState, ActorStatus, ActorStatusResponse, HoopEvent, HoopMessage};

/// How long a handler waits for the scoreboard or system actor to answer.
pub(crate) const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

const TELEMETRY_PERIOD: Duration = Duration::from_secs(5);
const BIND_RETRY: Duration = Duration::from_secs(3);

fn offline(name: String) -> ActorStatusResponse {
    ActorStatusResponse {
        name,
        status: ActorStatus::Disconnected,
        telemetry: HashMap::new(),
    }
}

/// Per-server state shared by every handler.
pub struct WebState {
    pub root: Arc<SystemState>,
    pub bus_tx: broadcast::Sender<HoopMessage>,
    /// Last status each actor reported, for `/api/status`.
    pub actors: RwLock<HashMap<String, ActorStatusResponse>>,
    pub addr: SocketAddr,
    pub actor_id: String,
    pub ws_count: AtomicU64,
    pub request_count: AtomicU64,
}

impl WebState {
    fn new(
        root: Arc<SystemState>,
        bus_tx: broadcast::Sender<HoopMessage>,
        addr: SocketAddr,
        actor_id: String,
    ) -> Self {
        let actors = actor_names(&root.system.snapshot())
            .into_iter()
            .map(|(id, name)| (id, offline(name)))
            .collect();
        Self {
            root,
            bus_tx,
            actors: RwLock::new(actors),
            addr,
            actor_id,
            ws_count: AtomicU64::new(0),
            request_count: AtomicU64::new(0),
        }
    }

    fn telemetry(&self) -> HashMap<String, String> {
        let game = self.root.board.snapshot();
        HashMap::from([
            ("bind".into(), self.addr.to_string()),
            (
                "websockets".into(),
                self.ws_count.load(Ordering::Relaxed).to_string(),
            ),
            ("host_clients".into(), self.root.hosts.count().to_string()),
            (
                "requests".into(),
                self.request_count.load(Ordering::Relaxed).to_string(),
            ),
            ("phase".into(), game.phase.to_string()),
        ])
    }

    fn report(&self, status: ActorStatus, error: Option<&str>) {
        let mut telemetry = self.telemetry();
        if let Some(error) = error {
            telemetry.insert("error".into(), error.into());
        }
        let msg = HoopMessage::new(ActorState::new(status, telemetry)).source(&self.actor_id);
        let _ = self.bus_tx.send(msg);
    }

    /// Announce the current counters (clients joining or leaving, periodic).
    pub(crate) fn publish_telemetry(&self) {
        self.report(ActorStatus::Connected, None);
    }

    async fn track(&self, msg: &HoopMessage) {
        match &msg.event {
            HoopEvent::ActorStatus(update) => {
                let mut actors = self.actors.write().await;
                let entry = actors
                    .entry(msg.source.clone())
                    .or_insert_with(|| offline(String::new()));
                entry.status = update.status;
                entry.telemetry = update.telemetry.clone();
            }
            HoopEvent::ConfigOutcome(outcome) => {
                let names = actor_names(&self.root.system.snapshot());
                let mut actors = self.actors.write().await;
                for id in &outcome.stopped {
                    actors.remove(id);
                }
                for (id, name) in names {
                    actors.entry(id).or_insert_with(|| offline(String::new())).name = name;
                }
            }
            _ => {}
        }
    }
}

/// One axum server on one bind address, on its own thread and runtime.
pub struct WebActor {
    addr: SocketAddr,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl WebActor {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            shutdown_tx: Mutex::new(None),
        }
    }
}

impl Actor for WebActor {
    fn start(&self, root: Arc<SystemState>, sender: BusSender, _receiver: BusReceiver) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(shutdown_tx);
        let state = WebState::new(
            root,
            sender.raw_sender().clone(),
            self.addr,
            sender.actor_id().to_string(),
        );

        std::thread::Builder::new()
            .name(state.actor_id.clone())
            .spawn(move || {
                let rt = tokio::runtime::Runtime::new()
                    .expect("failed to create webserver tokio runtime");
                rt.block_on(serve(Arc::new(state), shutdown_rx));
            })
            .expect("failed to spawn webserver thread");
    }

    fn stop(&self) {
        let tx = self.shutdown_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }
}

pub(crate) fn router(state: Arc<WebState>) -> Router {
    let counted = Arc::clone(&state);
    let count_requests = axum::middleware::from_fn(move |req, next: axum::middleware::Next| {
        counted.request_count.fetch_add(1, Ordering::Relaxed);
        next.run(req)
    });

    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/game", get(routes::get_game))
        .route("/api/game/action", post(routes::post_action))
        .route("/api/game/result", get(routes::get_result))
        .route("/api/game/summary", get(routes::get_summary))
        .route(
            "/api/settings",
            get(routes::get_settings).post(routes::post_settings),
        )
        .route("/api/ws", get(ws::ws_upgrade))
        .layer(count_requests)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until shutdown. A busy port is retried every few seconds.
async fn serve(state: Arc<WebState>, mut shutdown_rx: oneshot::Receiver<()>) {
    tokio::spawn(follow_bus(Arc::clone(&state), state.bus_tx.subscribe()));

    let ticker = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TELEMETRY_PERIOD);
        loop {
            interval.tick().await;
            ticker.publish_telemetry();
        }
    });

    let addr = state.addr;
    let listener = loop {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => break listener,
            Err(e) => {
                tracing::warn!("web server: cannot bind {addr}: {e}, retrying");
                state.report(ActorStatus::Disconnected, Some("bind failed"));
                tokio::select! {
                    _ = tokio::time::sleep(BIND_RETRY) => {}
                    _ = &mut shutdown_rx => return,
                }
            }
        }
    };

    tracing::info!("web server listening on {addr}");
    state.publish_telemetry();

    let app = router(Arc::clone(&state));
    let shutdown = async move {
        let _ = shutdown_rx.await;
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::warn!("web server on {addr} stopped: {e}");
    }
}

/// Keep the actor status table current from bus traffic.
async fn follow_bus(state: Arc<WebState>, mut bus_rx: broadcast::Receiver<HoopMessage>) {
    loop {
        match bus_rx.recv().await {
            Ok(msg) => state.track(&msg).await,
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("web server: status feed lagged, dropped {n} events");
            }
        }
    }
}
