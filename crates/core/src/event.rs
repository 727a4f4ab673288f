//! Store actions: how the chat core talks to the application store.
//!
//! The reactive store lives outside this workspace. The core only emits
//! [`StoreAction`]s through a [`StoreDispatch`] implementation.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::contact::Contact;
use crate::message::ChatMessage;
use crate::state::AppState;

/// Every state change the chat core can request.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    AddMessage(ChatMessage),
    SetStatus(String),
    SetWaitingAnswer(bool),
    /// Insert or replace a contact by id.
    AddContact(Contact),
    RemoveContact(String),
    ReloadState(Box<AppState>),
}

/// Receiver side of store actions.
pub trait StoreDispatch: Send + Sync {
    fn dispatch(&self, action: StoreAction);

    /// Apply several actions as one update.
    fn batch(&self, actions: Vec<StoreAction>) {
        for action in actions {
            self.dispatch(action);
        }
    }
}

/// A broadcast-based dispatcher.
///
/// Uses `tokio::sync::broadcast` so several front ends can observe the
/// same action stream.
pub struct ActionBus {
    sender: broadcast::Sender<Arc<StoreAction>>,
}

impl ActionBus {
    /// Create a new bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StoreAction>> {
        self.sender.subscribe()
    }
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl StoreDispatch for ActionBus {
    fn dispatch(&self, action: StoreAction) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(action));
    }
}
