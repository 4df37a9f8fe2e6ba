//! End-to-end tests over the in-process loopback bus: polling, callbacks on the
//! delivery thread, ignore filters, and closing a handle from its own receiver.

use crossbeam_channel::{unbounded, RecvTimeoutError};
use midiconn_io::{
    is_notification_thread, CallbackRegistry, Error, IgnoreFlags, LoopbackBus, MidiIn, MidiOut,
    MidiPort,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn pair(bus: &Arc<LoopbackBus>, port: &str) -> (MidiOut, MidiIn) {
    let out = MidiOut::with_backend(Box::new(bus.output()));
    out.open_virtual_port(port).unwrap();

    let midi = MidiIn::with_backend(Box::new(bus.input(100)));
    midi.set_ignore(IgnoreFlags::ALL).unwrap();
    let index = (0..midi.port_count().unwrap())
        .find(|i| midi.port_name(*i).unwrap() == port)
        .unwrap();
    midi.open_port(index, "test input").unwrap();
    (out, midi)
}

fn poll(midi: &MidiIn) -> Option<(Vec<u8>, f64)> {
    for _ in 0..200 {
        let (message, delta) = midi.message().unwrap();
        if !message.is_empty() {
            return Some((message, delta));
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn test_send_and_poll() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop A");

    out.send_message(&[0x90, 60, 100]).unwrap();
    out.send_message(&[0x80, 60, 0]).unwrap();

    let (first, first_delta) = poll(&midi).unwrap();
    assert_eq!(first, vec![0x90, 60, 100]);
    assert_eq!(first_delta, 0.0);

    let (second, second_delta) = poll(&midi).unwrap();
    assert_eq!(second, vec![0x80, 60, 0]);
    assert!(second_delta >= 0.0);

    assert_eq!(midi.message().unwrap().0, Vec::<u8>::new());
}

#[test]
fn test_ignore_flags_filter_at_backend() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop B");

    out.send_message(&[0xF8]).unwrap();
    out.send_message(&[0xFE]).unwrap();
    out.send_message(&[0xF0, 0x7E, 0xF7]).unwrap();
    out.send_message(&[0xB0, 7, 127]).unwrap();
    assert_eq!(poll(&midi).unwrap().0, vec![0xB0, 7, 127]);

    midi.ignore_types(false, false, false).unwrap();
    out.send_message(&[0xF8]).unwrap();
    assert_eq!(poll(&midi).unwrap().0, vec![0xF8]);
}

#[test]
fn test_callback_runs_on_notification_thread() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop C");
    let (tx, rx) = unbounded();

    let expected = midi.token();
    midi.set_callback(move |handle, message, delta| {
        let _ = tx.send((
            handle.token(),
            message.to_vec(),
            delta,
            is_notification_thread(),
        ));
    })
    .unwrap();

    out.send_message(&[0x90, 64, 90]).unwrap();
    let (token, message, delta, on_notification_thread) = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(token, expected);
    assert_eq!(message, vec![0x90, 64, 90]);
    assert_eq!(delta, 0.0);
    assert!(on_notification_thread);
    assert!(!is_notification_thread());

    // Polling yields nothing while the receiver owns delivery.
    assert!(midi.message().unwrap().0.is_empty());

    midi.cancel_callback().unwrap();
    out.send_message(&[0x90, 65, 90]).unwrap();
    assert_eq!(poll(&midi).unwrap().0, vec![0x90, 65, 90]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_no_delivery_after_close() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop D");
    let (tx, rx) = unbounded();
    midi.set_callback(move |_, message, _| {
        let _ = tx.send(message.to_vec());
    })
    .unwrap();

    out.send_message(&[0x90, 60, 1]).unwrap();
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), vec![0x90, 60, 1]);

    midi.close().unwrap();
    assert!(!CallbackRegistry::global().is_registered(midi.token()));
    out.send_message(&[0x90, 60, 2]).unwrap();
    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(200)),
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn test_receiver_may_close_its_own_handle() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop E");
    let (tx, rx) = unbounded();

    midi.set_callback(move |handle, message, _| {
        let _ = tx.send((message.to_vec(), handle.close(), handle.close()));
    })
    .unwrap();

    out.send_message(&[0xB0, 1, 2]).unwrap();
    let (message, first, second) = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(message, vec![0xB0, 1, 2]);
    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));

    assert!(midi.is_closed());
    assert_eq!(midi.message(), Err(Error::Closed));
    assert_eq!(midi.close(), Ok(()));
}

#[test]
fn test_receiver_calls_handle_during_close() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop G");
    let (entered_tx, entered_rx) = unbounded();
    let (done_tx, done_rx) = unbounded();

    midi.set_callback(move |handle, _, _| {
        let _ = entered_tx.send(());
        thread::sleep(Duration::from_millis(100));
        let _ = done_tx.send((handle.port_count(), handle.message()));
    })
    .unwrap();

    out.send_message(&[0x90, 60, 100]).unwrap();
    entered_rx.recv_timeout(RECV_TIMEOUT).unwrap();

    // Closes while the receiver is still running on the delivery thread.
    assert_eq!(midi.close(), Ok(()));
    let (count, message) = done_rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(count, Err(Error::Closed));
    assert_eq!(message, Err(Error::Closed));
}

#[test]
fn test_receiver_may_drop_last_handle() {
    let bus = LoopbackBus::new();
    let (out, midi) = pair(&bus, "Loop F");
    let (tx, rx) = unbounded();
    let token = midi.token();

    midi.set_callback(move |_, message, _| {
        let _ = tx.send(message.to_vec());
    })
    .unwrap();
    drop(midi);

    assert!(!CallbackRegistry::global().is_registered(token));
    out.send_message(&[0x90, 1, 1]).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_virtual_input_receives() {
    let bus = LoopbackBus::new();
    let midi = MidiIn::with_backend(Box::new(bus.input(100)));
    midi.open_virtual_port("Virtual In").unwrap();

    let out = MidiOut::with_backend(Box::new(bus.output()));
    assert_eq!(out.port_count(), Ok(1));
    assert_eq!(out.port_name(0).unwrap(), "Virtual In");
    out.open_port(0, "to virtual").unwrap();

    out.send_message(&[0x90, 48, 64]).unwrap();
    assert_eq!(poll(&midi).unwrap().0, vec![0x90, 48, 64]);

    midi.close().unwrap();
    assert_eq!(out.port_count(), Ok(0));
}

#[test]
fn test_port_names_round_trip() {
    let bus = LoopbackBus::new();
    let named = MidiOut::with_backend(Box::new(bus.output()));
    named.open_virtual_port("Named").unwrap();
    let unnamed = MidiOut::with_backend(Box::new(bus.output()));
    unnamed.open_virtual_port("").unwrap();

    let midi = MidiIn::with_backend(Box::new(bus.input(100)));
    assert_eq!(midi.port_count(), Ok(2));
    assert_eq!(midi.port_name(0).unwrap(), "Named");
    assert_eq!(midi.port_name(1).unwrap(), "");

    let err = midi.port_name(99999).unwrap_err();
    assert!(err.backend_message().is_some());

    named.close().unwrap();
    assert_eq!(midi.port_count(), Ok(1));
}

#[test]
fn test_invalid_loopback_port() {
    let bus = LoopbackBus::new();
    let midi = MidiIn::with_backend(Box::new(bus.input(100)));
    let err = midi.open_port(99999, "Nowhere").unwrap_err();
    assert!(err.backend_message().unwrap().contains("99999"));
    assert_eq!(midi.close(), Ok(()));
}

#[test]
fn test_send_without_port_fails() {
    let bus = LoopbackBus::new();
    let out = MidiOut::with_backend(Box::new(bus.output()));
    let err = out.send_message(&[0x90, 60, 100]).unwrap_err();
    assert!(err.backend_message().is_some());
    assert!(!out.is_closed());
}
