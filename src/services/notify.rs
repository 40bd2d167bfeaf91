use std::sync::{Arc, Mutex};

use tracing::info;

/// State-change signals emitted by the lifecycle engine. Delivery is
/// best-effort; the engine never fails or blocks on a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideEvent {
    PassengerJoined {
        ride_id: String,
        user_id: String,
    },
    PassengerLeft {
        ride_id: String,
        user_id: String,
    },
    RideCancelled {
        ride_id: String,
        passengers: Vec<String>,
    },
}

pub trait NotificationHook: Send + Sync {
    fn emit(&self, event: RideEvent);
}

/// Default hook: logs the event and moves on. A real transport would hang
/// off this trait without the engine noticing.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl NotificationHook for LogNotifier {
    fn emit(&self, event: RideEvent) {
        match event {
            RideEvent::PassengerJoined { ride_id, user_id } => {
                info!(%ride_id, %user_id, "passenger joined ride");
            }
            RideEvent::PassengerLeft { ride_id, user_id } => {
                info!(%ride_id, %user_id, "passenger left ride");
            }
            RideEvent::RideCancelled {
                ride_id,
                passengers,
            } => {
                info!(%ride_id, count = passengers.len(), "ride cancelled, informing passengers");
            }
        }
    }
}

/// Captures events for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<RideEvent>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<RideEvent> {
        self.events.lock().expect("notifier lock poisoned").clone()
    }
}

impl NotificationHook for RecordingNotifier {
    fn emit(&self, event: RideEvent) {
        self.events
            .lock()
            .expect("notifier lock poisoned")
            .push(event);
    }
}
