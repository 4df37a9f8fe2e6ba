//! No-op backend, compiled on every target.
//!
//! Has no ports and never produces input. Opening a port fails because there is
//! nothing to open; everything else succeeds without effect.

use crate::api::Api;
use crate::capability::{CallbackToken, DispatchFn, IgnoreFlags, InputApi, MidiApi, OutputApi};
use crate::error::{BackendFailure, BackendResult};

#[derive(Debug, Default)]
pub struct DummyInput;

#[derive(Debug, Default)]
pub struct DummyOutput;

impl DummyInput {
    pub fn new() -> Self {
        Self
    }
}

impl DummyOutput {
    pub fn new() -> Self {
        Self
    }
}

fn invalid_port(index: usize) -> BackendFailure {
    BackendFailure::new(format!(
        "MidiDummy: invalid port number {} (no ports are available)",
        index
    ))
}

fn no_virtual_ports() -> BackendFailure {
    BackendFailure::new("MidiDummy: virtual ports are not supported by this API")
}

macro_rules! dummy_common {
    () => {
        fn api(&self) -> Api {
            Api::Dummy
        }

        fn open_port(&mut self, index: usize, _name: &str) -> BackendResult<()> {
            Err(invalid_port(index))
        }

        fn open_virtual_port(&mut self, _name: &str) -> BackendResult<()> {
            Err(no_virtual_ports())
        }

        fn close_port(&mut self) -> BackendResult<()> {
            Ok(())
        }

        fn port_count(&self) -> BackendResult<usize> {
            Ok(0)
        }

        fn port_name(&self, index: usize) -> BackendResult<String> {
            Err(invalid_port(index))
        }
    };
}

impl MidiApi for DummyInput {
    dummy_common!();
}

impl MidiApi for DummyOutput {
    dummy_common!();
}

impl InputApi for DummyInput {
    fn ignore_types(&mut self, _flags: IgnoreFlags) -> BackendResult<()> {
        Ok(())
    }

    fn get_message(&mut self, _buf: &mut [u8]) -> BackendResult<(usize, f64)> {
        Ok((0, 0.0))
    }

    fn set_callback(&mut self, _dispatch: DispatchFn, _token: CallbackToken) -> BackendResult<()> {
        Ok(())
    }

    fn cancel_callback(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

impl OutputApi for DummyOutput {
    fn send_message(&mut self, _message: &[u8]) -> BackendResult<()> {
        Ok(())
    }
}
