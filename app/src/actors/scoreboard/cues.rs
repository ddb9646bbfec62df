//! Notification sink that turns controller cues into bus events and host
//! haptics.

use std::sync::Arc;

use hoopclock::{Cue, Haptic, HoopMessage, HostBridge, NotificationSink};

use crate::bus::BusSender;

pub struct BusCueSink {
    sender: BusSender,
    host: Arc<dyn HostBridge>,
}

impl BusCueSink {
    pub fn new(sender: BusSender, host: Arc<dyn HostBridge>) -> Self {
        Self { sender, host }
    }
}

impl NotificationSink for BusCueSink {
    fn notify_low_time(&self, seconds: u8) {
        self.sender.send(HoopMessage::new(Cue::LowTime { seconds }));
        self.host.haptic(Haptic::Light);
    }

    fn notify_buzzer(&self) {
        self.sender.send(HoopMessage::new(Cue::Buzzer));
        self.host.haptic(Haptic::Heavy);
    }
}
