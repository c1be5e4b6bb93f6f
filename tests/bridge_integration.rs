//! End-to-end scenarios through the full bridge: parser -> normalizer ->
//! router -> sinks.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use ponte::{
    InputFilter, Midi1Packet, Midi2Message, MidiBridge, Payload, RouterPacket, TransportId,
    TransportSink,
};

struct ChannelSink {
    tx: Sender<RouterPacket>,
}

impl TransportSink for ChannelSink {
    fn send(&self, packet: &RouterPacket) -> ponte::router::Result<()> {
        self.tx
            .send(*packet)
            .map_err(|err| ponte::router::Error::Sink(err.to_string()))
    }
}

fn channel_sink() -> (Arc<ChannelSink>, Receiver<RouterPacket>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Arc::new(ChannelSink { tx }), rx)
}

fn recv(rx: &Receiver<RouterPacket>) -> RouterPacket {
    rx.recv_timeout(Duration::from_secs(2)).expect("delivery")
}

fn assert_no_delivery(rx: &Receiver<RouterPacket>) {
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn running_status_produces_two_notes() {
    let bridge = MidiBridge::new().unwrap();
    let (sink, rx) = channel_sink();
    bridge.register_tx(TransportId::Usb, sink);

    let mut serial = bridge.input(TransportId::Serial).unwrap();
    serial.feed_bytes(&[0x90, 0x3C, 0x64, 0x40, 0x70]);

    assert_eq!(
        recv(&rx).payload,
        Payload::Midi1(Midi1Packet::new(0x90, [0x3C, 0x64], 3))
    );
    assert_eq!(
        recv(&rx).payload,
        Payload::Midi1(Midi1Packet::new(0x90, [0x40, 0x70], 3))
    );
    bridge.shutdown().unwrap();
}

#[test]
fn realtime_byte_overtakes_pending_note() {
    let bridge = MidiBridge::new().unwrap();
    let (sink, rx) = channel_sink();
    bridge.register_tx(TransportId::Usb, sink);

    let mut serial = bridge.input(TransportId::Serial).unwrap();
    serial.feed_bytes(&[0x90, 0x3C, 0xF8, 0x64]);

    // Clock completes first, then the interrupted Note On.
    assert_eq!(
        recv(&rx).payload,
        Payload::Midi1(Midi1Packet::new(0xF8, [0, 0], 1))
    );
    assert_eq!(
        recv(&rx).payload,
        Payload::Midi1(Midi1Packet::new(0x90, [0x3C, 0x64], 3))
    );
    bridge.shutdown().unwrap();
}

#[test]
fn serial_note_reaches_network_as_midi2() {
    let bridge = MidiBridge::new().unwrap();
    let (eth_sink, eth_rx) = channel_sink();
    let (usb_sink, usb_rx) = channel_sink();
    bridge.register_tx(TransportId::Ethernet, eth_sink);
    bridge.register_tx(TransportId::Usb, usb_sink);

    let mut serial = bridge.input(TransportId::Serial).unwrap();
    serial.feed_bytes(&[0x93, 60, 64]);

    // The network destination gets the translated UMP...
    let Payload::Ump(ump) = recv(&eth_rx).payload else {
        panic!("expected UMP on the network destination");
    };
    assert_eq!(ump.channel(), 3);
    match Midi2Message::from_packet(&ump).unwrap() {
        Midi2Message::NoteOn { note, velocity, .. } => {
            assert_eq!(note, 60);
            assert_eq!(velocity, 32768); // center fixed point
        }
        other => panic!("expected NoteOn, got {other:?}"),
    }

    // ...while USB takes the MIDI 1.0 original unchanged.
    assert_eq!(
        recv(&usb_rx).payload,
        Payload::Midi1(Midi1Packet::new(0x93, [60, 64], 3))
    );
    bridge.shutdown().unwrap();
}

#[test]
fn network_note_reaches_serial_downscaled() {
    let bridge = MidiBridge::new().unwrap();
    let (serial_sink, serial_rx) = channel_sink();
    bridge.register_tx(TransportId::Serial, serial_sink);

    let ump = ponte::core::ump::midi2::note_on(0, 0, 60, 32768, 0, 0).unwrap();
    let mut ethernet = bridge.input(TransportId::Ethernet).unwrap();
    ethernet.feed_words(ump.as_words());

    assert_eq!(
        recv(&serial_rx).payload,
        Payload::Midi1(Midi1Packet::new(0x90, [60, 64], 3))
    );
    let stats = bridge.stats();
    assert_eq!(stats.translations_2to1, 1);
    bridge.shutdown().unwrap();
}

#[test]
fn loopback_is_never_delivered() {
    let bridge = MidiBridge::new().unwrap();
    let (usb_sink, usb_rx) = channel_sink();
    bridge.register_tx(TransportId::Usb, usb_sink);
    // Even with an explicit self-route, the source never hears itself.
    bridge
        .router()
        .set_route(TransportId::Usb, TransportId::Usb, true);

    let mut usb = bridge.input(TransportId::Usb).unwrap();
    usb.feed_bytes(&[0x90, 60, 100]);
    assert_no_delivery(&usb_rx);
    bridge.shutdown().unwrap();
}

#[test]
fn source_filter_blocks_before_fanout() {
    let bridge = MidiBridge::new().unwrap();
    let (usb_sink, usb_rx) = channel_sink();
    let (eth_sink, eth_rx) = channel_sink();
    bridge.register_tx(TransportId::Usb, usb_sink);
    bridge.register_tx(TransportId::Ethernet, eth_sink);
    bridge.set_filter(
        TransportId::Serial,
        InputFilter {
            enabled: true,
            channel_mask: 1 << 4,
            ..Default::default()
        },
    );

    let mut serial = bridge.input(TransportId::Serial).unwrap();
    serial.feed_bytes(&[0x90, 60, 100]); // channel 0: blocked everywhere
    serial.feed_bytes(&[0x94, 61, 100]); // channel 4: passes everywhere

    assert_eq!(recv(&usb_rx).payload.channel(), Some(4));
    assert_eq!(recv(&eth_rx).payload.channel(), Some(4));
    assert_no_delivery(&usb_rx);
    assert_no_delivery(&eth_rx);
    assert_eq!(bridge.stats().filtered(TransportId::Serial), 1);
    bridge.shutdown().unwrap();
}

#[test]
fn garbage_bytes_never_stop_the_stream() {
    let bridge = MidiBridge::new().unwrap();
    let (usb_sink, usb_rx) = channel_sink();
    bridge.register_tx(TransportId::Usb, usb_sink);

    let mut serial = bridge.input(TransportId::Serial).unwrap();
    // Stray data, undefined statuses, then a valid note.
    serial.feed_bytes(&[0x12, 0xF4, 0x7F, 0xF9, 0x90, 60, 100]);

    assert_eq!(
        recv(&usb_rx).payload,
        Payload::Midi1(Midi1Packet::new(0x90, [60, 100], 3))
    );
    assert!(serial.parse_errors() >= 2);
    bridge.shutdown().unwrap();
}
