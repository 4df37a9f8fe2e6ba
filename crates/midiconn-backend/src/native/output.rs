//! MIDI output over midir.

use super::{already_open, invalid_port};
use crate::api::{Api, NATIVE_API};
use crate::capability::{MidiApi, OutputApi};
use crate::error::{BackendFailure, BackendResult};
use midir::{MidiOutput, MidiOutputConnection};
use tracing::debug;

const PREFIX: &str = "MidiOutNative";

pub struct NativeOutput {
    client_name: String,
    enumerator: MidiOutput,
    connection: Option<MidiOutputConnection>,
}

impl NativeOutput {
    pub fn new(client_name: &str) -> BackendResult<Self> {
        let enumerator = MidiOutput::new(client_name)?;
        Ok(Self {
            client_name: client_name.to_string(),
            enumerator,
            connection: None,
        })
    }
}

impl MidiApi for NativeOutput {
    fn api(&self) -> Api {
        NATIVE_API
    }

    fn open_port(&mut self, index: usize, name: &str) -> BackendResult<()> {
        if self.connection.is_some() {
            return Err(already_open(PREFIX));
        }
        let output = MidiOutput::new(&self.client_name)?;
        let ports = output.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| invalid_port(PREFIX, index, ports.len()))?;

        self.connection = Some(output.connect(port, name)?);
        debug!("Opened native MIDI output port {} as '{}'", index, name);
        Ok(())
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, name: &str) -> BackendResult<()> {
        use midir::os::unix::VirtualOutput;

        if self.connection.is_some() {
            return Err(already_open(PREFIX));
        }
        let output = MidiOutput::new(&self.client_name)?;
        self.connection = Some(output.create_virtual(name)?);
        debug!("Opened native virtual MIDI output '{}'", name);
        Ok(())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, _name: &str) -> BackendResult<()> {
        Err(super::no_virtual_ports(PREFIX))
    }

    fn close_port(&mut self) -> BackendResult<()> {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
        Ok(())
    }

    fn port_count(&self) -> BackendResult<usize> {
        Ok(self.enumerator.port_count())
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        let ports = self.enumerator.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| invalid_port(PREFIX, index, ports.len()))?;
        Ok(self.enumerator.port_name(port)?)
    }
}

impl OutputApi for NativeOutput {
    fn send_message(&mut self, message: &[u8]) -> BackendResult<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| BackendFailure::new(format!("{}: no open port to send to", PREFIX)))?;
        connection.send(message)?;
        Ok(())
    }
}
