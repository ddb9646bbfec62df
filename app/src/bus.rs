//! The scoreboard bus: one `tokio::sync::broadcast` channel of
//! `HoopMessage`s shared by every actor, the web layer and connected
//! WebSocket clients.
//!
//! Actors get a `BusSender` that stamps their id on everything they emit,
//! and a `BusReceiver` that also stops when their shutdown flag is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use hoopclock::HoopMessage;

/// The bus closed or the owning actor was asked to stop.
#[derive(Debug)]
pub enum PollError {
    Shutdown,
}

#[derive(Clone)]
pub struct BusSender {
    actor_id: String,
    inner: broadcast::Sender<HoopMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusSender {
    pub fn new(
        actor_id: String,
        inner: broadcast::Sender<HoopMessage>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            actor_id,
            inner,
            shutdown,
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// The bare channel, for the web layer's per-request subscriptions.
    pub fn raw_sender(&self) -> &broadcast::Sender<HoopMessage> {
        &self.inner
    }

    /// Emit `msg` as this actor. `false` only when nothing at all is
    /// subscribed, which says nothing about whether a particular consumer
    /// (such as the host) saw it.
    pub fn send(&self, msg: HoopMessage) -> bool {
        self.inner.send(msg.source(&self.actor_id)).is_ok()
    }

    /// A receiver tied to this actor's shutdown flag.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            inner: self.inner.subscribe(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

pub struct BusReceiver {
    inner: broadcast::Receiver<HoopMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusReceiver {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Next queued message without waiting; `Ok(None)` when caught up. Used
    /// by the polling system actor.
    pub fn poll(&mut self) -> Result<Option<HoopMessage>, PollError> {
        if self.is_shutdown() {
            return Err(PollError::Shutdown);
        }
        loop {
            match self.inner.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(PollError::Shutdown),
                Err(TryRecvError::Lagged(n)) => lagged(n),
            }
        }
    }

    /// Wait for the next message. Used inside the scoreboard's `select!`.
    pub async fn recv(&mut self) -> Result<HoopMessage, PollError> {
        while !self.is_shutdown() {
            match self.inner.recv().await {
                Ok(msg) => return Ok(msg),
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(n)) => lagged(n),
            }
        }
        Err(PollError::Shutdown)
    }
}

fn lagged(n: u64) {
    tracing::warn!("bus: receiver fell behind, skipped {n} messages");
}

impl From<broadcast::Receiver<HoopMessage>> for BusReceiver {
    /// A receiver with no shutdown flag of its own.
    fn from(inner: broadcast::Receiver<HoopMessage>) -> Self {
        Self {
            inner,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoopclock::{Cue, GameAction, HoopEvent};

    fn bus(actor_id: &str) -> (BusSender, Arc<AtomicBool>) {
        let (tx, _) = broadcast::channel(16);
        let flag = Arc::new(AtomicBool::new(false));
        (BusSender::new(actor_id.into(), tx, Arc::clone(&flag)), flag)
    }

    #[test]
    fn send_stamps_source() {
        let (sender, _) = bus("scoreboard");
        let mut rx = sender.subscribe();
        assert!(sender.send(HoopMessage::new(GameAction::Reset).source("ws.1")));
        let msg = rx.poll().unwrap().expect("message");
        assert_eq!(msg.source, "scoreboard");
        assert!(matches!(msg.event, HoopEvent::GameCommand(_)));
        assert!(rx.poll().unwrap().is_none());
    }

    #[test]
    fn shutdown_flag_stops_polling() {
        let (sender, flag) = bus("system");
        let mut rx = sender.subscribe();
        sender.send(HoopMessage::new(Cue::Buzzer));
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(rx.poll(), Err(PollError::Shutdown)));
    }

    #[tokio::test]
    async fn recv_skips_lagged_gap() {
        let (tx, _) = broadcast::channel(2);
        let sender = BusSender::new("scoreboard".into(), tx, Arc::new(AtomicBool::new(false)));
        let mut rx = sender.subscribe();
        for seconds in [4, 3, 2] {
            sender.send(HoopMessage::new(Cue::LowTime { seconds }));
        }
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg.event, HoopEvent::Cue(Cue::LowTime { seconds: 3 })));
    }
}
