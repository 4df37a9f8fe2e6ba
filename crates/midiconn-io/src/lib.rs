//! Realtime MIDI connection handles.
//!
//! [`MidiIn`] and [`MidiOut`] wrap one backend each and own its lifecycle:
//! close is idempotent and safe from any thread, and a closed handle rejects
//! every operation with [`Error::Closed`] without reaching the backend.
//! Input is either polled with [`MidiIn::message`] or delivered to a receiver on
//! the backend's notification thread via the process-wide [`CallbackRegistry`].
//!
//! Feature gates: `midi-io` (native backend via midir), `jack` (JACK backend).
//!
//! # Example
//!
//! ```ignore
//! use midiconn_io::{MidiIn, MidiOut, MidiPort};
//!
//! let out = MidiOut::new_default()?;
//! out.open_port(0, "Synth")?;
//! out.send_message(&[0x90, 60, 100])?;
//!
//! let input = MidiIn::new_default()?;
//! input.open_port(0, "Keys")?;
//! input.set_callback(|_, message, delta| println!("{delta:.3}s {message:02X?}"))?;
//! ```

pub mod error;
pub use error::{Error, Result};

mod connection;
pub use connection::{Direction, MidiPort};

mod registry;
pub use registry::{dispatch, CallbackRegistry, Receiver};

mod input;
pub use input::{MidiIn, MESSAGE_SCRATCH_SIZE};

mod output;
pub use output::MidiOut;

pub mod config;
pub use config::{MidiInConfig, MidiOutConfig};

mod builder;
pub use builder::{MidiInBuilder, MidiOutBuilder};

pub use midiconn_backend::{
    compiled_apis, is_notification_thread, Api, BackendFailure, BackendResult, CallbackToken,
    DispatchFn, IgnoreFlags, InputApi, LoopbackBus, MidiApi, OutputApi,
};
