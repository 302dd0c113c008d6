//! End-to-end codec tests: text frames in, positions/messages/AX.25 out,
//! mirroring a capture of real APRS-IS traffic shapes.

use std::io::Cursor;

use aprs_wire::{ax25, Address, Frame};

const CAPTURE: &[&str] = &[
    "N6WKZ-3>APU25N,WR6ABD:=3746.42N112226.00W# {UIV32N}",
    "W1EJ-10>APT311,WB6TMS-5,N6ZX-3,WIDE2:/210725z3814.29N/12236.93W>275/000/A=000013/ED J SAG",
    "WR6ABD>APN382:!3706.66NS12150.69W#PHG5730 W1,NCAn Loma Prieta LPRC.net A=003980",
    "N6ACK-1>APRS:}WR6ABD>APN382,TCPIP*,N6ACK-1*:!3706.66NS12150.69W#PHG5730",
    "KG6HWF-9>APDR12,TCPIP*,qAC,T2MCI::KG6HWF   :testing notifications{10",
];

#[test]
fn text_frames_round_trip() {
    for line in CAPTURE {
        let frame = Frame::parse(line);
        assert!(frame.is_valid(), "{line}");
        assert_eq!(frame.to_string(), *line);
    }
}

#[test]
fn timestamped_position_from_capture() {
    let frame = Frame::parse(CAPTURE[1]);
    let pos = frame.body.position().expect("position");
    assert!((pos.lat - (38.0 + 14.29 / 60.0)).abs() < 1e-6);
    assert!((pos.lon + (122.0 + 36.93 / 60.0)).abs() < 1e-6);
    assert_eq!(pos.symbol.name(), "Car");
}

#[test]
fn third_party_position_still_decodes() {
    // The nested frame's body starts after the '}' and keeps its own type
    let frame = Frame::parse(CAPTURE[3]);
    assert!(frame.body.packet_type().is_third_party());
    let inner = Frame::parse(&frame.body.as_str()[1..]);
    assert!(inner.is_valid());
    assert!(inner.body.position().is_ok());
}

#[test]
fn message_extraction_from_capture() {
    let msg = Frame::parse(CAPTURE[4]).message();
    assert!(msg.parsed);
    assert_eq!(msg.sender, Address::new("KG6HWF", 9));
    assert_eq!(msg.recipient, Address::new("KG6HWF", 0));
    assert_eq!(msg.body, "testing notifications");
    assert_eq!(msg.id, "10");
}

#[test]
fn kiss_stream_carries_the_capture() {
    // Re-frame the whole capture as a KISS byte stream and read it back
    let mut stream = Vec::new();
    for line in CAPTURE {
        let frame = Frame::parse(line);
        stream.push(0xc0);
        stream.push(0x00); // KISS command byte
        stream.extend_from_slice(&ax25::encode_command(&frame));
        stream.push(0xc0);
    }

    let mut decoder = ax25::Decoder::new(Cursor::new(stream));
    for line in CAPTURE {
        let expected = Frame::parse(line);
        let got = decoder.next_frame().expect(line);
        assert_eq!(got.source, expected.source);
        assert_eq!(got.dest, expected.dest);
        assert_eq!(got.path, expected.path);
        assert_eq!(got.body, expected.body);
    }

    match decoder.next_frame() {
        Err(ax25::Ax25Error::Io(e)) => {
            assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
        }
        other => panic!("expected end of stream, got {other:?}"),
    }
}

#[test]
fn login_hash_matches_published_passcodes() {
    assert_eq!(Address::parse("KG6HWF-9").call_pass(), 22955);
    assert_eq!(Address::parse("KE6AFE-13").call_pass(), 18595);
}
