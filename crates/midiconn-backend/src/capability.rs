//! Backend capability traits.
//!
//! A backend is one native MIDI client bound to one direction. Every call reports
//! its status through the returned `BackendResult`; callers check it immediately.
//! Backends are not assumed reentrant: the connection layer serializes all calls on
//! one backend instance.

use crate::api::Api;
use crate::error::BackendResult;
use serde::{Deserialize, Serialize};

/// Opaque value handed to the backend with a callback registration and passed
/// back on every dispatch, identifying which handle the event belongs to.
pub type CallbackToken = u64;

/// Entry point a backend invokes from its notification thread:
/// `(delta_seconds, message, token)`.
pub type DispatchFn = fn(f64, &[u8], CallbackToken);

/// Direction-agnostic operations.
pub trait MidiApi: Send {
    fn api(&self) -> Api;

    fn open_port(&mut self, index: usize, name: &str) -> BackendResult<()>;

    fn open_virtual_port(&mut self, name: &str) -> BackendResult<()>;

    /// Closes the open port, if any. Native client resources are released when
    /// the backend is dropped.
    fn close_port(&mut self) -> BackendResult<()>;

    /// Live enumeration; implementations must not cache.
    fn port_count(&self) -> BackendResult<usize>;

    /// Returns an empty string for a valid port with an empty name.
    fn port_name(&self, index: usize) -> BackendResult<String>;
}

pub trait InputApi: MidiApi {
    fn ignore_types(&mut self, flags: IgnoreFlags) -> BackendResult<()>;

    /// Copies the next queued message into `buf`, returning `(len, delta_seconds)`.
    /// Returns `(0, 0.0)` immediately when nothing is pending.
    fn get_message(&mut self, buf: &mut [u8]) -> BackendResult<(usize, f64)>;

    /// While a callback is set, incoming messages go to `dispatch` instead of the
    /// queue.
    fn set_callback(&mut self, dispatch: DispatchFn, token: CallbackToken) -> BackendResult<()>;

    fn cancel_callback(&mut self) -> BackendResult<()>;
}

pub trait OutputApi: MidiApi {
    fn send_message(&mut self, message: &[u8]) -> BackendResult<()>;
}

/// Message classes filtered at the backend instead of being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreFlags {
    pub sysex: bool,
    pub timing: bool,
    pub active_sensing: bool,
}

impl IgnoreFlags {
    pub const ALL: IgnoreFlags = IgnoreFlags {
        sysex: true,
        timing: true,
        active_sensing: true,
    };

    pub const NONE: IgnoreFlags = IgnoreFlags {
        sysex: false,
        timing: false,
        active_sensing: false,
    };

    pub fn new(sysex: bool, timing: bool, active_sensing: bool) -> Self {
        Self {
            sysex,
            timing,
            active_sensing,
        }
    }

    /// True when `message` belongs to an ignored class. Only the status byte is
    /// inspected.
    pub fn filters(&self, message: &[u8]) -> bool {
        match message.first() {
            Some(0xF0) => self.sysex,
            // MTC quarter frame and timing clock
            Some(0xF1) | Some(0xF8) => self.timing,
            Some(0xFE) => self.active_sensing,
            _ => false,
        }
    }

    pub fn to_bits(self) -> u8 {
        (self.sysex as u8) | ((self.timing as u8) << 1) | ((self.active_sensing as u8) << 2)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            sysex: bits & 0b001 != 0,
            timing: bits & 0b010 != 0,
            active_sensing: bits & 0b100 != 0,
        }
    }
}

impl Default for IgnoreFlags {
    fn default() -> Self {
        Self::ALL
    }
}
