//! MIDI output handle.

use crate::builder::MidiOutBuilder;
use crate::config::MidiOutConfig;
use crate::connection::{Connection, Direction, MidiPort};
use crate::error::Result;
use midiconn_backend::{Api, OutputApi};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Output handle. Clones share one connection; the last clone dropped closes it.
#[derive(Clone)]
pub struct MidiOut {
    conn: Arc<Connection<dyn OutputApi>>,
}

impl MidiOut {
    pub fn new_default() -> Result<Self> {
        Self::builder().build()
    }

    pub fn new(api: Api, client_name: &str) -> Result<Self> {
        Self::builder().api(api).client_name(client_name).build()
    }

    pub fn builder() -> MidiOutBuilder {
        MidiOutBuilder::default()
    }

    pub fn from_config(config: &MidiOutConfig) -> Result<Self> {
        MidiOutBuilder::from_config(config.clone()).build()
    }

    pub fn with_backend(backend: Box<dyn OutputApi>) -> Self {
        Self {
            conn: Arc::new(Connection::new(Direction::Output, backend)),
        }
    }

    /// Sends one message verbatim. The bytes are not inspected.
    pub fn send_message(&self, message: &[u8]) -> Result<()> {
        self.conn
            .with_backend(|backend| backend.send_message(message))?;
        trace!("Sent {} byte MIDI message", message.len());
        Ok(())
    }

    pub fn ptr_eq(&self, other: &MidiOut) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

impl MidiPort for MidiOut {
    fn open_port(&self, index: usize, name: &str) -> Result<()> {
        self.conn.open_port(index, name)
    }

    fn open_virtual_port(&self, name: &str) -> Result<()> {
        self.conn.open_virtual_port(name)
    }

    fn port_count(&self) -> Result<usize> {
        self.conn.port_count()
    }

    fn port_name(&self, index: usize) -> Result<String> {
        self.conn.port_name(index)
    }

    fn api(&self) -> Result<Api> {
        self.conn.api()
    }

    fn close(&self) -> Result<()> {
        self.conn.close()
    }

    fn is_closed(&self) -> bool {
        self.conn.is_closed()
    }
}

impl fmt::Debug for MidiOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiOut")
            .field("token", &self.conn.token())
            .field("closed", &self.is_closed())
            .finish()
    }
}
