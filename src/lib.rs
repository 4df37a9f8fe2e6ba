//! # midiconn - Realtime MIDI I/O
//!
//! Platform-independent MIDI input and output over native backends.
//!
//! ## Architecture
//!
//! midiconn is an umbrella crate over:
//! - **midiconn-io** - Connection handles (lifecycle, polling, callback dispatch)
//! - **midiconn-backend** - Backend capabilities (native via midir, dummy, loopback)
//!
//! ## Quick Start
//!
//! ```ignore
//! use midiconn::prelude::*;
//!
//! let out = MidiOut::new_default()?;
//! if out.port_count()? > 0 {
//!     out.open_port(0, "Synth")?;
//!     out.send_message(&[0x90, 60, 100])?;
//! }
//! out.close()?;
//!
//! let input = MidiIn::builder().queue_size(256).build()?;
//! input.open_virtual_port("midiconn in")?;
//! input.set_callback(|_, message, delta| println!("{delta:.3}s {message:02X?}"))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Dummy and loopback backends
//! - `midi-io` - Native platform backend (ALSA, CoreMIDI, WinMM)
//! - `jack` - JACK backend

/// Re-export of midiconn-backend for custom backends
pub use midiconn_backend as backend;

// Handles
pub use midiconn_io::{
    Direction, MidiIn, MidiInBuilder, MidiOut, MidiOutBuilder, MidiPort, MESSAGE_SCRATCH_SIZE,
};

// Configuration
pub use midiconn_io::config;
pub use midiconn_io::{MidiInConfig, MidiOutConfig};

// Callback dispatch
pub use midiconn_io::{dispatch, CallbackRegistry, Receiver};

// Backend selection
pub use midiconn_io::{compiled_apis, is_notification_thread, Api, IgnoreFlags};

// Error
pub use midiconn_io::{Error, Result};

/// Prelude
pub mod prelude {
    pub use crate::{
        compiled_apis, Api, Error, IgnoreFlags, MidiIn, MidiInConfig, MidiOut, MidiOutConfig,
        MidiPort, Result,
    };
}
