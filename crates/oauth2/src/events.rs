//! Fire-and-forget observability events
//!
//! The core emits events at lifecycle points; applications register handlers
//! to feed their own telemetry. Delivery is synchronous and infallible from
//! the caller's perspective: a handler can never fail the operation that
//! emitted the event.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::storage::StorageError;
use crate::token::Token;

/// Events emitted by the SDK core
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A credential was created in the data source
    CredentialCreated {
        /// The credential's storage identifier
        identifier: String,
    },

    /// A token-endpoint response passed validation
    TokenCreated(Token),

    /// A credential was removed from storage and its data source
    CredentialRemoved {
        /// The credential's storage identifier
        identifier: String,
    },

    /// A credential could not produce a valid access token
    NoAccessTokenAvailable {
        /// The credential's storage identifier
        identifier: String,
    },

    /// A token-storage operation failed
    StorageAccessError(StorageError),
}

/// Observer of [`AuthEvent`]s
pub trait EventHandler: Send + Sync {
    /// Handle one event; must not block for long
    fn on_event(&self, event: &AuthEvent);
}

/// Fans events out to registered handlers
#[derive(Default)]
pub struct EventCoordinator {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventCoordinator {
    /// Create a coordinator with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for all future events
    pub fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    /// Deliver an event to every registered handler
    pub fn send(&self, event: &AuthEvent) {
        debug!(?event, "emitting event");
        for handler in self.handlers.read().iter() {
            handler.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for events.
    use super::*;
    use crate::testing::RecordingEventHandler;

    /// Validates `EventCoordinator` behavior for the fan-out scenario.
    ///
    /// Assertions:
    /// - Confirms registered handlers observe events in order.
    /// - Confirms sending with no handlers is a no-op.
    #[test]
    fn test_events_fan_out_to_handlers() {
        let coordinator = EventCoordinator::new();
        coordinator.send(&AuthEvent::CredentialCreated { identifier: "unobserved".to_string() });

        let recorder = Arc::new(RecordingEventHandler::new());
        coordinator.register(Arc::clone(&recorder) as Arc<dyn EventHandler>);

        coordinator.send(&AuthEvent::CredentialCreated { identifier: "a".to_string() });
        coordinator.send(&AuthEvent::CredentialRemoved { identifier: "a".to_string() });

        let names = recorder.event_names();
        assert_eq!(names, vec!["CredentialCreated", "CredentialRemoved"]);
    }
}
