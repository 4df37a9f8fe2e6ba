//! Lifecycle core shared by input and output handles.
//!
//! A `Connection` owns exactly one backend. Every backend call goes through the
//! connection's mutex, so backends never see concurrent calls, and close replaces
//! the backend with the frozen close outcome. Once that happens nothing can reach
//! the backend again: it has been dropped.

use crate::error::{Error, Result};
use midiconn_backend::{Api, BackendResult, CallbackToken, MidiApi};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Identity tokens are never reused, so a token can't alias a later handle.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

enum State<B: ?Sized> {
    Live(Box<B>),
    Closed(Result<()>),
}

pub(crate) struct Connection<B: MidiApi + ?Sized> {
    direction: Direction,
    token: CallbackToken,
    /// Mirrors `State::Closed` for lock-free queries; the state itself is
    /// authoritative.
    closed: AtomicBool,
    state: Mutex<State<B>>,
}

impl<B: MidiApi + ?Sized> Connection<B> {
    pub(crate) fn new(direction: Direction, backend: Box<B>) -> Self {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Created MIDI {} handle {} ({})",
            direction,
            token,
            backend.api()
        );
        Self {
            direction,
            token,
            closed: AtomicBool::new(false),
            state: Mutex::new(State::Live(backend)),
        }
    }

    pub(crate) fn token(&self) -> CallbackToken {
        self.token
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `op` against the live backend while holding the handle lock.
    /// Fails with `Error::Closed`, without calling `op`, once the handle is closed.
    pub(crate) fn with_backend<T>(&self, op: impl FnOnce(&mut B) -> BackendResult<T>) -> Result<T> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let mut state = self.state.lock();
        match &mut *state {
            State::Live(backend) => Ok(op(backend.as_mut())?),
            State::Closed(_) => Err(Error::Closed),
        }
    }

    /// First call closes the port and releases the backend; every call returns
    /// that first outcome.
    pub(crate) fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let outcome = match &mut *state {
            State::Closed(outcome) => return outcome.clone(),
            State::Live(backend) => backend.close_port().map_err(Error::from),
        };

        *state = State::Closed(outcome.clone());
        self.closed.store(true, Ordering::Release);

        match &outcome {
            Ok(()) => debug!("Closed MIDI {} handle {}", self.direction, self.token),
            Err(e) => warn!(
                "MIDI {} handle {} closed with error: {}",
                self.direction, self.token, e
            ),
        }
        outcome
    }

    pub(crate) fn open_port(&self, index: usize, name: &str) -> Result<()> {
        self.with_backend(|backend| backend.open_port(index, name))?;
        debug!(
            "MIDI {} handle {} opened port {} as '{}'",
            self.direction, self.token, index, name
        );
        Ok(())
    }

    pub(crate) fn open_virtual_port(&self, name: &str) -> Result<()> {
        self.with_backend(|backend| backend.open_virtual_port(name))?;
        debug!(
            "MIDI {} handle {} opened virtual port '{}'",
            self.direction, self.token, name
        );
        Ok(())
    }

    pub(crate) fn port_count(&self) -> Result<usize> {
        self.with_backend(|backend| backend.port_count())
    }

    pub(crate) fn port_name(&self, index: usize) -> Result<String> {
        self.with_backend(|backend| backend.port_name(index))
    }

    pub(crate) fn api(&self) -> Result<Api> {
        self.with_backend(|backend| Ok(backend.api()))
    }
}

impl<B: MidiApi + ?Sized> Drop for Connection<B> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Operations common to input and output handles.
pub trait MidiPort {
    /// Binds the handle to an enumerated port.
    fn open_port(&self, index: usize, name: &str) -> Result<()>;

    /// Creates a port other software can connect to (ALSA, CoreMIDI, JACK,
    /// loopback). Other backends report failure.
    fn open_virtual_port(&self, name: &str) -> Result<()>;

    /// Live count of ports available to this handle's backend.
    fn port_count(&self) -> Result<usize>;

    /// An empty name is returned as `""`, not an error.
    fn port_name(&self, index: usize) -> Result<String>;

    fn api(&self) -> Result<Api>;

    /// Idempotent. The first call tears down the backend; every call, including
    /// concurrent ones, returns that first outcome.
    fn close(&self) -> Result<()>;

    /// `close` for contexts that cannot act on the error.
    fn destroy(&self) {
        let _ = self.close();
    }

    fn is_closed(&self) -> bool;
}
