//! MIDI input over midir.

use super::{already_open, invalid_port};
use crate::api::{Api, NATIVE_API};
use crate::capability::{CallbackToken, DispatchFn, IgnoreFlags, InputApi, MidiApi};
use crate::delivery::Delivery;
use crate::error::{BackendFailure, BackendResult};
use crate::notify::NotificationScope;
use midir::{Ignore, MidiInput, MidiInputConnection};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapRb,
};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

const PREFIX: &str = "MidiInNative";

type Queued = (Vec<u8>, f64);

struct Connected {
    connection: MidiInputConnection<()>,
    queue: HeapCons<Queued>,
    /// A message that did not fit the last caller's buffer.
    held: Option<Queued>,
}

pub struct NativeInput {
    client_name: String,
    enumerator: MidiInput,
    queue_size: usize,
    delivery: Arc<Delivery>,
    connected: Option<Connected>,
}

impl NativeInput {
    pub fn new(client_name: &str, queue_size: usize) -> BackendResult<Self> {
        let enumerator = MidiInput::new(client_name)?;
        Ok(Self {
            client_name: client_name.to_string(),
            enumerator,
            queue_size: queue_size.max(1),
            delivery: Delivery::new(),
            connected: None,
        })
    }

    /// Filtering happens in our handler so ignore flags can change while connected.
    fn client(&self) -> BackendResult<MidiInput> {
        let mut input = MidiInput::new(&self.client_name)?;
        input.ignore(Ignore::None);
        Ok(input)
    }

    /// Builds the midir handler and the consumer side of its queue. The handler
    /// runs on midir's thread: SPSC producer there, consumer under the handle lock.
    fn handler(&self) -> (impl FnMut(u64, &[u8], &mut ()) + Send + 'static, HeapCons<Queued>) {
        let (mut producer, consumer) = HeapRb::<Queued>::new(self.queue_size).split();
        let delivery = self.delivery.clone();
        let mut last: Option<u64> = None;

        let handler = move |stamp: u64, message: &[u8], _: &mut ()| {
            let _scope = NotificationScope::enter();
            if delivery.ignores(message) {
                return;
            }

            // midir stamps are microseconds
            let delta = last
                .map(|prev| stamp.saturating_sub(prev) as f64 / 1_000_000.0)
                .unwrap_or(0.0);
            last = Some(stamp);

            if delivery.dispatch(delta, message) {
                return;
            }
            if producer.try_push((message.to_vec(), delta)).is_err() {
                warn!("MIDI input queue full, dropping message");
            }
        };
        (handler, consumer)
    }
}

impl MidiApi for NativeInput {
    fn api(&self) -> Api {
        NATIVE_API
    }

    fn open_port(&mut self, index: usize, name: &str) -> BackendResult<()> {
        if self.connected.is_some() {
            return Err(already_open(PREFIX));
        }
        let input = self.client()?;
        let ports = input.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| invalid_port(PREFIX, index, ports.len()))?;

        let (handler, queue) = self.handler();
        let connection = input.connect(port, name, handler, ())?;
        self.connected = Some(Connected {
            connection,
            queue,
            held: None,
        });
        debug!("Opened native MIDI input port {} as '{}'", index, name);
        Ok(())
    }

    #[cfg(unix)]
    fn open_virtual_port(&mut self, name: &str) -> BackendResult<()> {
        use midir::os::unix::VirtualInput;

        if self.connected.is_some() {
            return Err(already_open(PREFIX));
        }
        let (handler, queue) = self.handler();
        let connection = self.client()?.create_virtual(name, handler, ())?;
        self.connected = Some(Connected {
            connection,
            queue,
            held: None,
        });
        debug!("Opened native virtual MIDI input '{}'", name);
        Ok(())
    }

    #[cfg(not(unix))]
    fn open_virtual_port(&mut self, _name: &str) -> BackendResult<()> {
        Err(super::no_virtual_ports(PREFIX))
    }

    fn close_port(&mut self) -> BackendResult<()> {
        let Some(Connected { connection, .. }) = self.connected.take() else {
            return Ok(());
        };
        // No dispatch after close, even while midir is still winding down.
        self.delivery.detach_sink();

        // midir joins its input thread on close. The caller holds the handle
        // lock here, and a receiver running on that thread may be waiting for
        // the same lock, so the join always happens on a reaper thread.
        let reaper = thread::Builder::new()
            .name("midi-input-close".to_string())
            .spawn(move || drop(connection.close()));
        if let Err(e) = reaper {
            return Err(BackendFailure::new(format!("{}: {}", PREFIX, e)));
        }
        debug!("Native MIDI input connection handed to reaper thread");
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

impl InputApi for NativeInput {
    fn ignore_types(&mut self, flags: IgnoreFlags) -> BackendResult<()> {
        self.delivery.set_ignore(flags);
        Ok(())
    }

    fn get_message(&mut self, buf: &mut [u8]) -> BackendResult<(usize, f64)> {
        if self.delivery.has_sink() {
            return Ok((0, 0.0));
        }
        let Some(connected) = self.connected.as_mut() else {
            return Ok((0, 0.0));
        };
        let Some((bytes, delta)) = connected
            .held
            .take()
            .or_else(|| connected.queue.try_pop())
        else {
            return Ok((0, 0.0));
        };
        if bytes.len() > buf.len() {
            let err = BackendFailure::new(format!(
                "{}: message of {} bytes exceeds buffer of {} bytes",
                PREFIX,
                bytes.len(),
                buf.len()
            ));
            connected.held = Some((bytes, delta));
            return Err(err);
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok((bytes.len(), delta))
    }

    fn set_callback(&mut self, dispatch: DispatchFn, token: CallbackToken) -> BackendResult<()> {
        self.delivery.set_sink(PREFIX, dispatch, token)
    }

    fn cancel_callback(&mut self) -> BackendResult<()> {
        self.delivery.clear_sink(PREFIX)
    }
}
