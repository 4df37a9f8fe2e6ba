//! Backend construction by API specifier.

use crate::api::{compiled_apis, Api};
use crate::capability::{InputApi, MidiApi, OutputApi};
use crate::dummy::{DummyInput, DummyOutput};
use crate::error::{BackendFailure, BackendResult};
use tracing::debug;

#[cfg(feature = "midi-io")]
use crate::api::NATIVE_API;
#[cfg(feature = "midi-io")]
use crate::native::{NativeInput, NativeOutput};

fn no_compiled_support(api: Api) -> BackendFailure {
    BackendFailure::new(format!(
        "no compiled support for specified API argument ({})",
        api.display_name()
    ))
}

/// Creates an input backend. `Api::Unspecified` searches the compiled APIs for
/// one with at least one port and falls back to the first compiled API.
pub fn open_input(
    api: Api,
    client_name: &str,
    queue_size: usize,
) -> BackendResult<Box<dyn InputApi>> {
    if api == Api::Unspecified {
        return open_first_with_ports(|api| create_input(api, client_name, queue_size));
    }
    create_input(api, client_name, queue_size)
}

/// Creates an output backend. `Api::Unspecified` behaves as for [`open_input`].
pub fn open_output(api: Api, client_name: &str) -> BackendResult<Box<dyn OutputApi>> {
    if api == Api::Unspecified {
        return open_first_with_ports(|api| create_output(api, client_name));
    }
    create_output(api, client_name)
}

fn create_input(
    api: Api,
    client_name: &str,
    queue_size: usize,
) -> BackendResult<Box<dyn InputApi>> {
    #[cfg(not(feature = "midi-io"))]
    let _ = (client_name, queue_size);
    match api {
        Api::Dummy => Ok(Box::new(DummyInput::new())),
        #[cfg(feature = "midi-io")]
        api if api == NATIVE_API => Ok(Box::new(NativeInput::new(client_name, queue_size)?)),
        api => Err(no_compiled_support(api)),
    }
}

fn create_output(api: Api, client_name: &str) -> BackendResult<Box<dyn OutputApi>> {
    #[cfg(not(feature = "midi-io"))]
    let _ = client_name;
    match api {
        Api::Dummy => Ok(Box::new(DummyOutput::new())),
        #[cfg(feature = "midi-io")]
        api if api == NATIVE_API => Ok(Box::new(NativeOutput::new(client_name)?)),
        api => Err(no_compiled_support(api)),
    }
}

fn open_first_with_ports<B: MidiApi + ?Sized>(
    create: impl Fn(Api) -> BackendResult<Box<B>>,
) -> BackendResult<Box<B>> {
    let mut fallback = None;
    let mut last_error = None;

    for &api in compiled_apis() {
        match create(api) {
            Ok(backend) => {
                if backend.port_count().unwrap_or(0) > 0 {
                    debug!("Selected MIDI API {} (ports available)", api);
                    return Ok(backend);
                }
                if fallback.is_none() {
                    fallback = Some((api, backend));
                }
            }
            Err(e) => {
                debug!("MIDI API {} unavailable: {}", api, e);
                last_error = Some(e);
            }
        }
    }

    match fallback {
        Some((api, backend)) => {
            debug!("Selected MIDI API {} (no ports available anywhere)", api);
            Ok(backend)
        }
        None => Err(last_error.unwrap_or_else(|| BackendFailure::new("no compiled API support found"))),
    }
}
