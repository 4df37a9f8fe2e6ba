//! MIDI input handle.
//!
//! Incoming messages are either queued by the backend and drained with
//! [`MidiIn::message`], or, once a receiver is set, pushed to the receiver on the
//! backend's notification thread.

use crate::builder::MidiInBuilder;
use crate::config::MidiInConfig;
use crate::connection::{Connection, Direction, MidiPort};
use crate::error::{Error, Result};
use crate::registry::CallbackRegistry;
use midiconn_backend::{Api, CallbackToken, IgnoreFlags, InputApi};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Size of the buffer a single polled message is copied into.
pub const MESSAGE_SCRATCH_SIZE: usize = 64 * 1024;

pub(crate) struct InputShared {
    pub(crate) conn: Connection<dyn InputApi>,
}

impl InputShared {
    /// Unregisters, then tears down the backend. Registration errors are logged
    /// and never mask the close outcome.
    fn close(&self) -> Result<()> {
        let registry = CallbackRegistry::global();
        match registry.unregister(&self.conn) {
            // A concurrent close got there first.
            Ok(()) | Err(Error::Closed) => {}
            Err(e) => warn!(
                "Failed to cancel MIDI input callback for handle {}: {}",
                self.conn.token(),
                e
            ),
        }
        let outcome = self.conn.close();
        registry.purge(self.conn.token());
        outcome
    }
}

impl Drop for InputShared {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Input handle. Clones share one connection; the last clone dropped closes it.
#[derive(Clone)]
pub struct MidiIn {
    pub(crate) shared: Arc<InputShared>,
}

impl MidiIn {
    /// Default API search, default client name, default queue size.
    pub fn new_default() -> Result<Self> {
        Self::builder().build()
    }

    pub fn new(api: Api, client_name: &str, queue_size: usize) -> Result<Self> {
        Self::builder()
            .api(api)
            .client_name(client_name)
            .queue_size(queue_size)
            .build()
    }

    pub fn builder() -> MidiInBuilder {
        MidiInBuilder::default()
    }

    pub fn from_config(config: &MidiInConfig) -> Result<Self> {
        MidiInBuilder::from_config(config.clone()).build()
    }

    /// Wraps an already constructed backend, such as a [`LoopbackInput`].
    ///
    /// [`LoopbackInput`]: midiconn_backend::LoopbackInput
    pub fn with_backend(backend: Box<dyn InputApi>) -> Self {
        Self {
            shared: Arc::new(InputShared {
                conn: Connection::new(Direction::Input, backend),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<InputShared>) -> Self {
        Self { shared }
    }

    /// Identity under which this handle's callbacks are dispatched.
    pub fn token(&self) -> CallbackToken {
        self.shared.conn.token()
    }

    /// Filters message classes at the backend: SysEx (`0xF0`), timing (MTC
    /// quarter frame `0xF1` and clock `0xF8`), and active sensing (`0xFE`).
    /// New handles ignore all three.
    pub fn ignore_types(&self, sysex: bool, timing: bool, active_sensing: bool) -> Result<()> {
        self.set_ignore(IgnoreFlags::new(sysex, timing, active_sensing))
    }

    pub fn set_ignore(&self, flags: IgnoreFlags) -> Result<()> {
        self.shared
            .conn
            .with_backend(|backend| backend.ignore_types(flags))
    }

    /// Next queued message and its delta time in seconds. Returns an empty
    /// message when nothing is pending, and always while a receiver is set.
    pub fn message(&self) -> Result<(Vec<u8>, f64)> {
        let mut buf = vec![0u8; MESSAGE_SCRATCH_SIZE];
        let (len, delta) = self
            .shared
            .conn
            .with_backend(|backend| backend.get_message(&mut buf))?;
        buf.truncate(len);
        Ok((buf, delta))
    }

    /// Routes every incoming message to `receiver` on the backend's notification
    /// thread, replacing any previous receiver. The receiver may call back into
    /// this handle, including `close`.
    pub fn set_callback<F>(&self, receiver: F) -> Result<()>
    where
        F: Fn(&MidiIn, &[u8], f64) + Send + Sync + 'static,
    {
        CallbackRegistry::global().register(&self.shared, Arc::new(receiver))
    }

    /// Returns to queued polling. No-op when no receiver is set.
    pub fn cancel_callback(&self) -> Result<()> {
        CallbackRegistry::global().unregister(&self.shared.conn)
    }

    pub fn ptr_eq(&self, other: &MidiIn) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl MidiPort for MidiIn {
    fn open_port(&self, index: usize, name: &str) -> Result<()> {
        self.shared.conn.open_port(index, name)
    }

    fn open_virtual_port(&self, name: &str) -> Result<()> {
        self.shared.conn.open_virtual_port(name)
    }

    fn port_count(&self) -> Result<usize> {
        self.shared.conn.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        self.shared.conn.port_name(index)
    }

    fn api(&self) -> Result<Api> {
        self.shared.conn.api()
    }

    fn close(&self) -> Result<()> {
        self.shared.close()
    }

    fn is_closed(&self) -> bool {
        self.shared.conn.is_closed()
    }
}

impl fmt::Debug for MidiIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiIn")
            .field("token", &self.token())
            .field("closed", &self.is_closed())
            .finish()
    }
}
