//! In-process software MIDI bus.
//!
//! Virtual ports opened by outputs are enumerated by inputs on the same bus, and
//! virtual ports opened by inputs are enumerated by outputs, the same way ALSA
//! sequencer clients see each other. Each connected input owns a delivery thread
//! that either queues messages for polling or invokes the registered dispatch
//! function, so callbacks arrive on a foreign thread exactly as with a native
//! backend.
//!
//! No system MIDI service is involved; loopback backends report [`Api::Dummy`].

use crate::api::Api;
use crate::capability::{CallbackToken, DispatchFn, IgnoreFlags, InputApi, MidiApi, OutputApi};
use crate::delivery::Delivery;
use crate::error::{BackendFailure, BackendResult};
use crate::notify::NotificationScope;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use dashmap::DashMap;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

type Packet = (SmallVec<[u8; 8]>, Instant);

struct Source {
    name: String,
    subscribers: Vec<(u64, Sender<Packet>)>,
}

struct Destination {
    name: String,
    sender: Sender<Packet>,
}

/// Shared table of virtual ports.
pub struct LoopbackBus {
    next_id: AtomicU64,
    /// Opened by outputs, read by inputs.
    sources: DashMap<u64, Source>,
    /// Opened by inputs, written by outputs.
    destinations: DashMap<u64, Destination>,
}

static GLOBAL_BUS: OnceLock<Arc<LoopbackBus>> = OnceLock::new();

impl LoopbackBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            sources: DashMap::new(),
            destinations: DashMap::new(),
        })
    }

    /// Process-wide bus.
    pub fn global() -> Arc<Self> {
        GLOBAL_BUS.get_or_init(LoopbackBus::new).clone()
    }

    pub fn input(self: &Arc<Self>, queue_size: usize) -> LoopbackInput {
        LoopbackInput::new(self.clone(), queue_size)
    }

    pub fn output(self: &Arc<Self>) -> LoopbackOutput {
        LoopbackOutput::new(self.clone())
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Ports ordered by creation.
    fn listing<V>(map: &DashMap<u64, V>, name: impl Fn(&V) -> String) -> Vec<(u64, String)> {
        let mut ports: Vec<_> = map
            .iter()
            .map(|entry| (*entry.key(), name(entry.value())))
            .collect();
        ports.sort_by_key(|(id, _)| *id);
        ports
    }

    fn source_listing(&self) -> Vec<(u64, String)> {
        Self::listing(&self.sources, |source| source.name.clone())
    }

    fn destination_listing(&self) -> Vec<(u64, String)> {
        Self::listing(&self.destinations, |dest| dest.name.clone())
    }
}

fn invalid_port(index: usize, count: usize) -> BackendFailure {
    BackendFailure::new(format!(
        "MidiLoopback: invalid port number {} ({} ports available)",
        index, count
    ))
}

fn already_open() -> BackendFailure {
    BackendFailure::new("MidiLoopback: a port is already open on this client")
}

enum Attachment {
    Subscribed(u64),
    Virtual(u64),
}

struct InputLink {
    attachment: Attachment,
    queue: Receiver<(Vec<u8>, f64)>,
    /// A message that did not fit the last caller's buffer.
    held: Option<(Vec<u8>, f64)>,
}

pub struct LoopbackInput {
    bus: Arc<LoopbackBus>,
    id: u64,
    queue_size: usize,
    delivery: Arc<Delivery>,
    link: Option<InputLink>,
}

impl LoopbackInput {
    pub fn new(bus: Arc<LoopbackBus>, queue_size: usize) -> Self {
        let id = bus.allocate_id();
        Self {
            bus,
            id,
            queue_size: queue_size.max(1),
            delivery: Delivery::new(),
            link: None,
        }
    }

    /// Creates the inbound channel and starts the delivery thread.
    fn start(&self, attachment: Attachment, inbound: Receiver<Packet>) -> BackendResult<InputLink> {
        let (queue_tx, queue_rx) = bounded(self.queue_size);
        let delivery = self.delivery.clone();
        thread::Builder::new()
            .name("midi-loopback-input".to_string())
            .spawn(move || Self::delivery_thread(inbound, queue_tx, delivery))
            .map_err(|e| BackendFailure::new(format!("MidiLoopback: {}", e)))?;

        Ok(InputLink {
            attachment,
            queue: queue_rx,
            held: None,
        })
    }

    fn delivery_thread(
        inbound: Receiver<Packet>,
        queue: Sender<(Vec<u8>, f64)>,
        delivery: Arc<Delivery>,
    ) {
        let _scope = NotificationScope::enter();
        let mut last: Option<Instant> = None;

        while let Ok((bytes, sent_at)) = inbound.recv() {
            if delivery.ignores(&bytes) {
                continue;
            }

            let delta = last
                .map(|prev| sent_at.saturating_duration_since(prev).as_secs_f64())
                .unwrap_or(0.0);
            last = Some(sent_at);

            if delivery.dispatch(delta, &bytes) {
                continue;
            }

            match queue.try_send((bytes.to_vec(), delta)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("MIDI loopback input queue full, dropping message");
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }

    fn detach(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        self.delivery.detach_sink();
        match link.attachment {
            Attachment::Subscribed(source) => {
                if let Some(mut entry) = self.bus.sources.get_mut(&source) {
                    entry.subscribers.retain(|(id, _)| *id != self.id);
                }
            }
            Attachment::Virtual(dest) => {
                self.bus.destinations.remove(&dest);
            }
        }
    }
}

impl MidiApi for LoopbackInput {
    fn api(&self) -> Api {
        Api::Dummy
    }

    fn open_port(&mut self, index: usize, _name: &str) -> BackendResult<()> {
        if self.link.is_some() {
            return Err(already_open());
        }
        let ports = self.bus.source_listing();
        let (source, port_name) = ports
            .get(index)
            .cloned()
            .ok_or_else(|| invalid_port(index, ports.len()))?;

        let (inbound_tx, inbound_rx) = unbounded();
        {
            let mut entry = self
                .bus
                .sources
                .get_mut(&source)
                .ok_or_else(|| invalid_port(index, ports.len()))?;
            entry.subscribers.push((self.id, inbound_tx));
        }

        self.link = Some(self.start(Attachment::Subscribed(source), inbound_rx)?);
        debug!("Loopback input {} subscribed to '{}'", self.id, port_name);
        Ok(())
    }

    fn open_virtual_port(&mut self, name: &str) -> BackendResult<()> {
        if self.link.is_some() {
            return Err(already_open());
        }
        let (inbound_tx, inbound_rx) = unbounded();
        let dest = self.bus.allocate_id();
        let link = self.start(Attachment::Virtual(dest), inbound_rx)?;
        self.bus.destinations.insert(
            dest,
            Destination {
                name: name.to_string(),
                sender: inbound_tx,
            },
        );
        self.link = Some(link);
        debug!("Loopback input {} opened virtual port '{}'", self.id, name);
        Ok(())
    }

    fn close_port(&mut self) -> BackendResult<()> {
        // The delivery thread is not joined: it may be inside a receiver that is
        // waiting on the caller's handle lock. Once detached it sees no senders
        // and exits on its own.
        self.detach();
        Ok(())
    }

    fn port_count(&self) -> BackendResult<usize> {
        Ok(self.bus.source_listing().len())
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        let ports = self.bus.source_listing();
        ports
            .get(index)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| invalid_port(index, ports.len()))
    }
}

impl InputApi for LoopbackInput {
    fn ignore_types(&mut self, flags: IgnoreFlags) -> BackendResult<()> {
        self.delivery.set_ignore(flags);
        Ok(())
    }

    fn get_message(&mut self, buf: &mut [u8]) -> BackendResult<(usize, f64)> {
        if self.delivery.has_sink() {
            return Ok((0, 0.0));
        }
        let Some(link) = self.link.as_mut() else {
            return Ok((0, 0.0));
        };
        let Some((bytes, delta)) = link
            .held
            .take()
            .or_else(|| link.queue.try_recv().ok())
        else {
            return Ok((0, 0.0));
        };
        if bytes.len() > buf.len() {
            let err = BackendFailure::new(format!(
                "MidiLoopback: message of {} bytes exceeds buffer of {} bytes",
                bytes.len(),
                buf.len()
            ));
            link.held = Some((bytes, delta));
            return Err(err);
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok((bytes.len(), delta))
    }

    fn set_callback(&mut self, dispatch: DispatchFn, token: CallbackToken) -> BackendResult<()> {
        self.delivery.set_sink("MidiLoopback", dispatch, token)
    }

    fn cancel_callback(&mut self) -> BackendResult<()> {
        self.delivery.clear_sink("MidiLoopback")
    }
}

impl Drop for LoopbackInput {
    fn drop(&mut self) {
        let _ = self.close_port();
    }
}

enum OutputLink {
    Connected(u64),
    Virtual(u64),
}

pub struct LoopbackOutput {
    bus: Arc<LoopbackBus>,
    link: Option<OutputLink>,
}

impl LoopbackOutput {
    pub fn new(bus: Arc<LoopbackBus>) -> Self {
        Self { bus, link: None }
    }

    fn recipients(&self, link: &OutputLink) -> SmallVec<[Sender<Packet>; 2]> {
        match link {
            OutputLink::Connected(dest) => self
                .bus
                .destinations
                .get(dest)
                .map(|entry| entry.sender.clone())
                .into_iter()
                .collect(),
            OutputLink::Virtual(source) => self
                .bus
                .sources
                .get(source)
                .map(|entry| {
                    entry
                        .subscribers
                        .iter()
                        .map(|(_, sender)| sender.clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl MidiApi for LoopbackOutput {
    fn api(&self) -> Api {
        Api::Dummy
    }

    fn open_port(&mut self, index: usize, _name: &str) -> BackendResult<()> {
        if self.link.is_some() {
            return Err(already_open());
        }
        let ports = self.bus.destination_listing();
        let (dest, port_name) = ports
            .get(index)
            .cloned()
            .ok_or_else(|| invalid_port(index, ports.len()))?;
        self.link = Some(OutputLink::Connected(dest));
        debug!("Loopback output connected to '{}'", port_name);
        Ok(())
    }

    fn open_virtual_port(&mut self, name: &str) -> BackendResult<()> {
        if self.link.is_some() {
            return Err(already_open());
        }
        let source = self.bus.allocate_id();
        self.bus.sources.insert(
            source,
            Source {
                name: name.to_string(),
                subscribers: Vec::new(),
            },
        );
        self.link = Some(OutputLink::Virtual(source));
        debug!("Loopback output opened virtual port '{}'", name);
        Ok(())
    }

    fn close_port(&mut self) -> BackendResult<()> {
        if let Some(OutputLink::Virtual(source)) = self.link.take() {
            self.bus.sources.remove(&source);
        }
        Ok(())
    }

    fn port_count(&self) -> BackendResult<usize> {
        Ok(self.bus.destination_listing().len())
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        let ports = self.bus.destination_listing();
        ports
            .get(index)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| invalid_port(index, ports.len()))
    }
}

impl OutputApi for LoopbackOutput {
    fn send_message(&mut self, message: &[u8]) -> BackendResult<()> {
        let link = self
            .link
            .as_ref()
            .ok_or_else(|| BackendFailure::new("MidiLoopback: no open port to send to"))?;

        let sent_at = Instant::now();
        for recipient in self.recipients(link) {
            // A recipient that closed between lookup and send just misses the message.
            let _ = recipient.send((SmallVec::from_slice(message), sent_at));
        }
        Ok(())
    }
}

impl Drop for LoopbackOutput {
    fn drop(&mut self) {
        let _ = self.close_port();
    }
}
