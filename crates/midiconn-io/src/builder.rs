//! Builders for input and output handles.

use crate::config::{MidiInConfig, MidiOutConfig};
use crate::error::Result;
use crate::input::MidiIn;
use crate::output::MidiOut;
use midiconn_backend::{open_input, open_output, Api, IgnoreFlags};

#[derive(Debug, Clone, Default)]
pub struct MidiInBuilder {
    config: MidiInConfig,
}

impl MidiInBuilder {
    pub fn from_config(config: MidiInConfig) -> Self {
        Self { config }
    }

    pub fn api(mut self, api: Api) -> Self {
        self.config.api = api;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn queue_size(mut self, size: usize) -> Self {
        self.config.queue_size = size;
        self
    }

    /// Filters applied before the handle is returned. Defaults to ignoring
    /// SysEx, timing, and active sensing.
    pub fn ignore(mut self, flags: IgnoreFlags) -> Self {
        self.config.ignore = flags;
        self
    }

    pub fn config(&self) -> &MidiInConfig {
        &self.config
    }

    pub fn build(self) -> Result<MidiIn> {
        self.config.validate()?;
        let backend = open_input(
            self.config.api,
            &self.config.client_name,
            self.config.queue_size,
        )?;
        let midi = MidiIn::with_backend(backend);
        midi.set_ignore(self.config.ignore)?;
        Ok(midi)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MidiOutBuilder {
    config: MidiOutConfig,
}

impl MidiOutBuilder {
    pub fn from_config(config: MidiOutConfig) -> Self {
        Self { config }
    }

    pub fn api(mut self, api: Api) -> Self {
        self.config.api = api;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn config(&self) -> &MidiOutConfig {
        &self.config
    }

    pub fn build(self) -> Result<MidiOut> {
        let backend = open_output(self.config.api, &self.config.client_name)?;
        Ok(MidiOut::with_backend(backend))
    }
}
