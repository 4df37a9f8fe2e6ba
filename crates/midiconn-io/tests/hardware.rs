//! Native backend tests.
//!
//! Require a system MIDI service (ALSA sequencer, CoreMIDI, WinMM, or JACK) and,
//! for the loopback test, an output port wired back to an input port, such as
//! the macOS IAC Driver or `snd-virmidi` on Linux.
//! All tests are `#[ignore]` so CI doesn't fail without hardware.
//!
//! Run with:
//!   cargo test -p midiconn-io --features midi-io --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use crossbeam_channel::unbounded;
use midiconn_io::{compiled_apis, Api, MidiIn, MidiOut, MidiPort};
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(200);
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn native_api() -> Api {
    compiled_apis()
        .iter()
        .copied()
        .find(|api| *api != Api::Dummy)
        .expect("midi-io compiles a native API")
}

#[test]
#[ignore]
fn test_enumerate_native_ports() {
    let midi = MidiIn::new(native_api(), "midiconn test", 100).unwrap();
    let count = midi.port_count().unwrap();
    for index in 0..count {
        let name = midi.port_name(index).unwrap();
        println!("input [{}] {}", index, name);
    }

    let out = MidiOut::new(native_api(), "midiconn test").unwrap();
    for index in 0..out.port_count().unwrap() {
        println!("output [{}] {}", index, out.port_name(index).unwrap());
    }
}

#[test]
#[ignore]
fn test_invalid_native_port() {
    let out = MidiOut::new(native_api(), "midiconn test").unwrap();
    let err = out.open_port(99999, "Nowhere").unwrap_err();
    assert!(err.backend_message().is_some());
    assert_eq!(out.close(), Ok(()));
}

#[cfg(unix)]
#[test]
#[ignore]
fn test_virtual_port_round_trip() {
    let api = native_api();
    let out = MidiOut::new(api, "midiconn sender").unwrap();
    out.open_virtual_port("midiconn virtual out").unwrap();
    thread::sleep(SETTLE);

    let midi = MidiIn::new(api, "midiconn receiver", 100).unwrap();
    let index = (0..midi.port_count().unwrap())
        .find(|i| {
            midi.port_name(*i)
                .map(|name| name.contains("midiconn virtual out"))
                .unwrap_or(false)
        })
        .expect("virtual port is visible to other clients");
    midi.ignore_types(false, false, false).unwrap();
    midi.open_port(index, "midiconn in").unwrap();

    let (tx, rx) = unbounded();
    midi.set_callback(move |_, message, delta| {
        let _ = tx.send((message.to_vec(), delta));
    })
    .unwrap();
    thread::sleep(SETTLE);

    out.send_message(&[0x90, 60, 100]).unwrap();
    let (message, _) = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(message, vec![0x90, 60, 100]);

    midi.close().unwrap();
    out.close().unwrap();
}

#[cfg(unix)]
#[test]
#[ignore]
fn test_close_from_native_callback() {
    let api = native_api();
    let out = MidiOut::new(api, "midiconn sender").unwrap();
    out.open_virtual_port("midiconn close test").unwrap();
    thread::sleep(SETTLE);

    let midi = MidiIn::new(api, "midiconn receiver", 100).unwrap();
    let index = (0..midi.port_count().unwrap())
        .find(|i| {
            midi.port_name(*i)
                .map(|name| name.contains("midiconn close test"))
                .unwrap_or(false)
        })
        .expect("virtual port is visible to other clients");
    midi.open_port(index, "midiconn in").unwrap();

    let (tx, rx) = unbounded();
    midi.set_callback(move |handle, _, _| {
        let _ = tx.send(handle.close());
    })
    .unwrap();
    thread::sleep(SETTLE);

    out.send_message(&[0x90, 60, 100]).unwrap();
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), Ok(()));
    assert!(midi.is_closed());
}

#[cfg(unix)]
#[test]
#[ignore]
fn test_close_while_receiver_uses_handle() {
    let api = native_api();
    let out = MidiOut::new(api, "midiconn sender").unwrap();
    out.open_virtual_port("midiconn busy receiver").unwrap();
    thread::sleep(SETTLE);

    let midi = MidiIn::new(api, "midiconn receiver", 100).unwrap();
    let index = (0..midi.port_count().unwrap())
        .find(|i| {
            midi.port_name(*i)
                .map(|name| name.contains("midiconn busy receiver"))
                .unwrap_or(false)
        })
        .expect("virtual port is visible to other clients");
    midi.open_port(index, "midiconn in").unwrap();

    let (entered_tx, entered_rx) = unbounded();
    let (done_tx, done_rx) = unbounded();
    midi.set_callback(move |handle, _, _| {
        let _ = entered_tx.send(());
        thread::sleep(Duration::from_millis(100));
        let _ = done_tx.send(handle.port_count());
    })
    .unwrap();
    thread::sleep(SETTLE);

    out.send_message(&[0x90, 60, 100]).unwrap();
    entered_rx.recv_timeout(RECV_TIMEOUT).unwrap();

    // midir joins its thread on close; that must not happen under the handle lock.
    assert_eq!(midi.close(), Ok(()));
    assert!(done_rx.recv_timeout(RECV_TIMEOUT).unwrap().is_err());
}
