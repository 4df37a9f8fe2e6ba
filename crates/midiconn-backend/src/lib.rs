//! MIDI backend capabilities for midiconn.
//!
//! A backend is a native MIDI client for one direction: it enumerates ports,
//! connects, sends, queues or dispatches input, and reports every failure with
//! the backend's own message.
//!
//! # Backends
//!
//! - **Native** (feature: `midi-io`): the platform API via midir
//! - **Dummy**: compilable no-op, always present
//! - **Loopback**: in-process software bus with virtual ports, for tests and
//!   inter-component routing
//!
//! # Example
//!
//! ```ignore
//! use midiconn_backend::{open_output, Api};
//!
//! let mut out = open_output(Api::Unspecified, "My Client")?;
//! out.open_port(0, "Synth")?;
//! out.send_message(&[0x90, 60, 100])?;
//! ```

pub mod error;
pub use error::{BackendFailure, BackendResult};

mod api;
pub use api::{compiled_apis, Api};

mod capability;
pub use capability::{CallbackToken, DispatchFn, IgnoreFlags, InputApi, MidiApi, OutputApi};

mod factory;
pub use factory::{open_input, open_output};

pub(crate) mod delivery;

mod notify;
pub use notify::is_notification_thread;

pub mod dummy;
pub use dummy::{DummyInput, DummyOutput};

pub mod loopback;
pub use loopback::{LoopbackBus, LoopbackInput, LoopbackOutput};

#[cfg(feature = "midi-io")]
pub mod native;

#[cfg(feature = "midi-io")]
pub use native::{NativeInput, NativeOutput};
