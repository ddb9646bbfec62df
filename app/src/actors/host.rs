//! Host bridge over the bus.
//!
//! The host application is a WebSocket client that sent `"host": true` in
//! its `start` handshake. Requests for it travel as `host_request` events;
//! a result only counts as delivered while such a client is attached.

use std::sync::Arc;

use hoopclock::{
    DeliveryError, Haptic, HoopMessage, HostBridge, HostRequest, HostSection, NullHost,
};

use crate::bus::BusSender;
use crate::state::HostClients;

pub struct BusHost {
    sender: BusSender,
    clients: Arc<HostClients>,
}

impl BusHost {
    pub fn new(sender: BusSender, clients: Arc<HostClients>) -> Self {
        Self { sender, clients }
    }

    fn emit(&self, request: HostRequest) -> bool {
        self.sender.send(HoopMessage::new(request))
    }
}

impl HostBridge for BusHost {
    fn send_data(&self, data: &str) -> Result<(), DeliveryError> {
        // Other actors are always subscribed to the bus; only a host client
        // can take the payload.
        if !self.clients.is_connected() {
            return Err(DeliveryError::NotDelivered(
                "no host client connected".into(),
            ));
        }
        if self.emit(HostRequest::SendData { data: data.into() }) {
            Ok(())
        } else {
            Err(DeliveryError::NotDelivered("bus closed".into()))
        }
    }

    fn haptic(&self, kind: Haptic) {
        self.emit(HostRequest::Haptic { kind });
    }

    fn show_alert(&self, message: &str) {
        self.emit(HostRequest::ShowAlert {
            message: message.into(),
        });
    }
}

/// Pick the host bridge once, at startup.
pub fn select_host(
    section: &HostSection,
    sender: BusSender,
    clients: Arc<HostClients>,
) -> Arc<dyn HostBridge> {
    if section.enabled {
        Arc::new(BusHost::new(sender, clients))
    } else {
        tracing::warn!("host bridge disabled, results will not be delivered");
        Arc::new(NullHost)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use tokio::sync::broadcast;

    use super::*;
    use hoopclock::HoopEvent;

    fn sender() -> BusSender {
        let (tx, _) = broadcast::channel(16);
        BusSender::new("scoreboard".into(), tx, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn send_data_reaches_attached_host() {
        let tx = sender();
        let mut rx = tx.subscribe();
        let clients = Arc::new(HostClients::default());
        clients.attach();
        let host = BusHost::new(tx, clients);
        assert!(host.send_data("{}").is_ok());
        let msg = rx.poll().unwrap().expect("host request");
        match msg.event {
            HoopEvent::HostRequest(HostRequest::SendData { data }) => assert_eq!(data, "{}"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn bus_subscribers_alone_are_not_a_host() {
        let tx = sender();
        let mut rx = tx.subscribe();
        let host = BusHost::new(tx, Arc::new(HostClients::default()));
        assert!(matches!(
            host.send_data("{}"),
            Err(DeliveryError::NotDelivered(_))
        ));
        assert!(rx.poll().unwrap().is_none());
    }

    #[test]
    fn detached_host_stops_delivery() {
        let tx = sender();
        let _rx = tx.subscribe();
        let clients = Arc::new(HostClients::default());
        let host = BusHost::new(tx, Arc::clone(&clients));
        clients.attach();
        assert!(host.send_data("{}").is_ok());
        clients.detach();
        assert!(host.send_data("{}").is_err());
    }

    #[test]
    fn disabled_host_is_null() {
        let section = HostSection {
            enabled: false,
            ..HostSection::default()
        };
        let clients = Arc::new(HostClients::default());
        clients.attach();
        let host = select_host(&section, sender(), clients);
        assert!(matches!(
            host.send_data("{}"),
            Err(DeliveryError::HostUnavailable)
        ));
    }
}
