//! Process-wide callback registry and the dispatch bridge.
//!
//! Backends invoke [`dispatch`] from their notification threads with the token
//! the handle registered under. The registry maps that token back to the handle
//! and its receiver. Entries hold the handle weakly; the handle removes its own
//! entry when it closes.
//!
//! Lock order is registry, then handle. Dispatch clones what it needs under the
//! read lock and releases it before invoking the receiver, so a receiver may
//! re-register, cancel, or close its own handle.

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::input::{InputShared, MidiIn};
use midiconn_backend::{CallbackToken, InputApi};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, trace};

/// Application function invoked for each incoming message:
/// `(handle, message, delta_seconds)`.
pub type Receiver = dyn Fn(&MidiIn, &[u8], f64) + Send + Sync + 'static;

struct Entry {
    handle: Weak<InputShared>,
    receiver: Arc<Receiver>,
}

/// Token-keyed table of live callback registrations.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: RwLock<HashMap<CallbackToken, Entry>>,
}

static GLOBAL_REGISTRY: OnceLock<CallbackRegistry> = OnceLock::new();

impl CallbackRegistry {
    /// The registry every handle in the process registers with.
    pub fn global() -> &'static CallbackRegistry {
        GLOBAL_REGISTRY.get_or_init(CallbackRegistry::default)
    }

    /// Installs `receiver` for `input`, replacing any earlier registration.
    pub(crate) fn register(&self, input: &Arc<InputShared>, receiver: Arc<Receiver>) -> Result<()> {
        let entry = Entry {
            handle: Arc::downgrade(input),
            receiver,
        };
        self.replace(&input.conn, Some(entry))
    }

    /// Cancels the backend callback and removes the entry. No-op when none is
    /// registered.
    pub(crate) fn unregister(&self, conn: &Connection<dyn InputApi>) -> Result<()> {
        self.replace(conn, None)
    }

    /// Replace-or-clear. The previous registration is cancelled at the backend
    /// before the new one is installed, and an entry only exists while the
    /// backend holds the matching callback. Closed handles are rejected even
    /// when there is nothing to clear.
    fn replace(&self, conn: &Connection<dyn InputApi>, entry: Option<Entry>) -> Result<()> {
        if conn.is_closed() {
            return Err(Error::Closed);
        }
        let token = conn.token();
        let mut entries = self.entries.write();

        if entries.contains_key(&token) {
            conn.with_backend(|backend| backend.cancel_callback())?;
            entries.remove(&token);
            debug!("Cancelled MIDI input callback for handle {}", token);
        }

        if let Some(entry) = entry {
            conn.with_backend(|backend| backend.set_callback(dispatch, token))?;
            entries.insert(token, entry);
            debug!("Registered MIDI input callback for handle {}", token);
        }
        Ok(())
    }

    /// Drops the entry without touching the backend. Used once the backend is gone.
    pub(crate) fn purge(&self, token: CallbackToken) {
        self.entries.write().remove(&token);
    }

    pub fn is_registered(&self, token: CallbackToken) -> bool {
        self.entries.read().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Routes one event to its receiver. Events for unknown tokens, or for
    /// handles that are closing, are dropped.
    pub fn dispatch_event(&self, delta: f64, message: &[u8], token: CallbackToken) {
        let target = {
            let entries = self.entries.read();
            entries
                .get(&token)
                .map(|entry| (entry.handle.clone(), entry.receiver.clone()))
        };

        let Some((handle, receiver)) = target else {
            trace!("Dropping MIDI event for unregistered handle {}", token);
            return;
        };
        let Some(shared) = handle.upgrade() else {
            trace!("Dropping MIDI event for released handle {}", token);
            return;
        };

        let midi = MidiIn::from_shared(shared);
        receiver(&midi, message, delta);
    }
}

/// The bridge every backend is given with a callback registration.
pub fn dispatch(delta: f64, message: &[u8], token: CallbackToken) {
    CallbackRegistry::global().dispatch_event(delta, message, token);
}
