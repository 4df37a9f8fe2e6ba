//! Native backend built on midir.
//!
//! midir binds one platform API at compile time (ALSA, CoreMIDI, WinMM, or JACK
//! with the `jack` feature). Enumeration goes through a long-lived client so
//! counts and names are always live; each connection gets its own client
//! because midir consumes the client when connecting.

mod input;
mod output;

pub use input::NativeInput;
pub use output::NativeOutput;

use crate::error::BackendFailure;

pub(crate) fn invalid_port(prefix: &str, index: usize, count: usize) -> BackendFailure {
    BackendFailure::new(format!(
        "{}: invalid port number {} ({} ports available)",
        prefix, index, count
    ))
}

pub(crate) fn already_open(prefix: &str) -> BackendFailure {
    BackendFailure::new(format!(
        "{}: a valid connection already exists",
        prefix
    ))
}

#[cfg(not(unix))]
pub(crate) fn no_virtual_ports(prefix: &str) -> BackendFailure {
    BackendFailure::new(format!(
        "{}: virtual ports are not supported by this API",
        prefix
    ))
}
