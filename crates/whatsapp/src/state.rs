use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::types::ConnectionState;

/// Connection state shared between a transport's background work and the
/// controller's health reporting.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<RwLock<ConnectionState>>);

impl SharedState {
    pub fn get(&self) -> ConnectionState {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, next: ConnectionState) {
        self.update(next, false);
    }

    /// Like [`Self::set`], but a logged-out session stays logged out.
    pub fn set_unless_logged_out(&self, next: ConnectionState) {
        self.update(next, true);
    }

    fn update(&self, next: ConnectionState, keep_logged_out: bool) {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        if *state == next || (keep_logged_out && *state == ConnectionState::LoggedOut) {
            return;
        }
        let previous = *state;
        debug!(from = %previous, to = %next, "whatsapp connection state changed");
        *state = next;
    }
}
