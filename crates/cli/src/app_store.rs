//! The CLI's application store: applies store actions to the loaded state.

use std::sync::{Mutex, MutexGuard};

use charchat_core::event::{StoreAction, StoreDispatch};
use charchat_core::state::AppState;
use tracing::{debug, warn};

/// Holds the state of one CLI invocation.
///
/// Messages and statuses are applied to the contact selected with
/// [`AppStore::open_chat`], the way the front end applies them to the
/// chat on screen.
pub struct AppStore {
    state: Mutex<AppState>,
}

impl AppStore {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Route subsequent messages and statuses to `contact_id`.
    pub fn open_chat(&self, contact_id: &str) {
        self.lock().volatile_state.chat_id = contact_id.to_string();
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }
}

impl StoreDispatch for AppStore {
    fn dispatch(&self, action: StoreAction) {
        let mut state = self.lock();
        let chat_id = state.volatile_state.chat_id.clone();

        match action {
            StoreAction::AddMessage(message) => match state.contacts.get_mut(&chat_id) {
                Some(contact) => contact.chats_mut().push(message),
                None => warn!(chat = %chat_id, "No open chat for message"),
            },
            StoreAction::SetStatus(status) => {
                if let Some(contact) = state.contacts.get_mut(&chat_id) {
                    contact.set_status(status);
                }
            }
            StoreAction::SetWaitingAnswer(waiting) => {
                state.volatile_state.waiting_answer = waiting;
            }
            StoreAction::AddContact(contact) => {
                debug!(contact = contact.id(), "Contact added");
                state.contacts.insert(contact.id().to_string(), contact);
            }
            StoreAction::RemoveContact(id) => {
                debug!(contact = %id, "Contact removed");
                state.contacts.remove(&id);
            }
            StoreAction::ReloadState(new_state) => {
                *state = *new_state;
            }
        }
    }
}
