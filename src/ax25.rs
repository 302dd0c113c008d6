//! AX.25 frame encoding and decoding for KISS transports.

use std::io::{BufRead, BufReader, Read};

use thiserror::Error;

use crate::address::{Address, CLEAR_SSID_MASK, SET_SSID_MASK};
use crate::frame::{Frame, Info};

/// Smallest byte count that can hold a real frame (two addresses plus
/// control/PID). Anything shorter is noise.
const REASONABLE_SIZE: usize = 14;

/// KISS frame delimiter.
const FRAME_DELIMITER: u8 = 0xc0;

/// Control byte (UI frame) and PID (no layer 3) that terminate the address
/// section of every APRS frame.
const CONTROL_PID: [u8; 2] = [0x03, 0xf0];

#[derive(Debug, Error)]
pub enum Ax25Error {
    /// Below the 14-byte floor; the stream decoder silently skips these.
    #[error("short message")]
    ShortFrame,
    /// The control/PID marker never showed up after the address section.
    #[error("truncated message")]
    TruncatedFrame,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn encode(frame: &Frame, source_mask: u8, dest_mask: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + 7 * frame.path.len() + frame.body.len());
    out.extend_from_slice(&frame.dest.encode_ax25(dest_mask));

    // The low bit marks the final address block in the chain
    let mut mask = source_mask;
    if frame.path.is_empty() {
        mask |= 1;
    }
    out.extend_from_slice(&frame.source.encode_ax25(mask));
    for (i, hop) in frame.path.iter().enumerate() {
        let mut mask = CLEAR_SSID_MASK;
        if i == frame.path.len() - 1 {
            mask |= 1;
        }
        out.extend_from_slice(&hop.encode_ax25(mask));
    }

    out.extend_from_slice(&CONTROL_PID);
    out.extend_from_slice(frame.body.as_str().as_bytes());
    out
}

/// Encode a frame as an AX.25 command (source carries the set mask).
pub fn encode_command(frame: &Frame) -> Vec<u8> {
    encode(frame, SET_SSID_MASK, CLEAR_SSID_MASK)
}

/// Encode a frame as an AX.25 response (masks swapped).
pub fn encode_response(frame: &Frame) -> Vec<u8> {
    encode(frame, CLEAR_SSID_MASK, SET_SSID_MASK)
}

/// Decode one AX.25 frame as read from a KISS stream.
///
/// The leading byte is the KISS command byte, hence the destination living
/// at bytes 1..8. A trailing frame delimiter is stripped when present. The
/// payload comes back verbatim; bytes that are not valid UTF-8 are replaced
/// rather than dropped.
pub fn decode_frame(data: &[u8]) -> Result<Frame, Ax25Error> {
    let data = match data.last() {
        Some(&FRAME_DELIMITER) => &data[..data.len() - 1],
        _ => data,
    };
    if data.len() < REASONABLE_SIZE {
        return Err(Ax25Error::ShortFrame);
    }
    // The KISS command byte pushes the address pair out to byte 15; a
    // 14-byte buffer clears the floor but still cannot hold both addresses
    let (Some(dest), Some(source)) = (data.get(1..8), data.get(8..15)) else {
        return Err(Ax25Error::TruncatedFrame);
    };
    let dest = Address::decode_ax25(dest);
    let source = Address::decode_ax25(source);

    let mut path = Vec::new();
    let mut rest = &data[15..];
    while rest.len() > 7 && rest[0] != CONTROL_PID[0] {
        path.push(Address::decode_ax25(&rest[..7]));
        rest = &rest[7..];
    }

    if rest.len() < 2 || rest[..2] != CONTROL_PID {
        return Err(Ax25Error::TruncatedFrame);
    }

    Ok(Frame {
        original: String::new(),
        source,
        dest,
        path,
        body: Info(String::from_utf8_lossy(&rest[2..]).into_owned()),
    })
}

/// Streaming AX.25 decoder over a KISS byte source.
///
/// Owns its reader; one decoder per physical stream, consumed sequentially
/// from a single thread.
pub struct Decoder<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Read the next frame, skipping delimiter-to-delimiter runs too short
    /// to hold one. End of stream surfaces as an `UnexpectedEof` IO error.
    pub fn next_frame(&mut self) -> Result<Frame, Ax25Error> {
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let n = self.reader.read_until(FRAME_DELIMITER, &mut raw)?;
            if n == 0 || raw.last() != Some(&FRAME_DELIMITER) {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            if raw.len() >= REASONABLE_SIZE {
                break;
            }
        }
        decode_frame(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::io::Cursor;

    const CHRISTMAS: &str = "KG6HWF>APX200,WIDE1-1,WIDE2-1:=3722.1 N/12159.1 W-Merry Christmas!";

    #[test]
    fn encode_command_address_masks() {
        let frame = Frame::parse("KG6HWF-9>APX200:hi");
        let encoded = encode_command(&frame);
        // Dest first with the clear mask, then source with the set mask and
        // the last-address bit (no path)
        assert_eq!(&encoded[0..7], hex!("82a0b064606060"));
        assert_eq!(&encoded[7..14], hex!("968e6c90ae8cf3"));
        assert_eq!(&encoded[14..16], [0x03, 0xf0]);
        assert_eq!(&encoded[16..], b"hi");
    }

    #[test]
    fn encode_response_swaps_masks() {
        let frame = Frame::parse("KG6HWF-9>APX200:hi");
        let encoded = encode_response(&frame);
        assert_eq!(encoded[6], 0xe0);
        assert_eq!(encoded[13], 0x73);
    }

    #[test]
    fn encode_marks_last_path_entry() {
        let frame = Frame::parse(CHRISTMAS);
        let encoded = encode_command(&frame);
        // Source is not the last address once a path exists
        assert_eq!(encoded[13] & 1, 0);
        // WIDE1-1 block, then WIDE2-1 carrying the last-address bit
        assert_eq!(encoded[20] & 1, 0);
        assert_eq!(encoded[27] & 1, 1);
        assert_eq!(&encoded[28..30], [0x03, 0xf0]);
    }

    #[test]
    fn decode_round_trips_encoded_frame() {
        let frame = Frame::parse(CHRISTMAS);
        // Prepend the KISS command byte a real stream would carry
        let mut raw = vec![0x00];
        raw.extend_from_slice(&encode_command(&frame));
        let decoded = decode_frame(&raw).unwrap();
        assert_eq!(decoded.source, frame.source);
        assert_eq!(decoded.dest, frame.dest);
        assert_eq!(decoded.path, frame.path);
        assert_eq!(decoded.body, frame.body);
        // AX.25 decode does not reconstruct the original line
        assert!(!decoded.is_valid());
    }

    #[test]
    fn short_input_is_short_frame() {
        for len in 0..REASONABLE_SIZE {
            let raw = vec![0u8; len];
            assert!(
                matches!(decode_frame(&raw), Err(Ax25Error::ShortFrame)),
                "{len} bytes should be short"
            );
        }
    }

    #[test]
    fn address_boundary_lengths_are_truncated() {
        // 14 bytes clear the floor but cannot hold both address blocks;
        // 15 and 16 hold them but never reach the control/PID marker
        for len in 14..=16 {
            let raw = vec![0x41u8; len];
            assert!(
                matches!(decode_frame(&raw), Err(Ax25Error::TruncatedFrame)),
                "{len} bytes should be truncated"
            );
        }
    }

    #[test]
    fn stream_survives_minimal_junk_run() {
        // A delimiter run of exactly 14 junk bytes decodes as a recoverable
        // error rather than killing the stream
        let mut stream = vec![FRAME_DELIMITER];
        stream.extend_from_slice(&[0x41u8; 14]);
        stream.push(FRAME_DELIMITER);

        let mut decoder = Decoder::new(Cursor::new(stream));
        assert!(matches!(
            decoder.next_frame(),
            Err(Ax25Error::TruncatedFrame)
        ));
    }

    #[test]
    fn zeroed_input_is_truncated() {
        let raw = [0u8; 20];
        assert!(matches!(
            decode_frame(&raw),
            Err(Ax25Error::TruncatedFrame)
        ));
    }

    #[test]
    fn stream_decoder_reads_successive_frames() {
        let first = Frame::parse(CHRISTMAS);
        let second = Frame::parse("W1EJ-10>APT311::KG6HWF   :hello{42");

        let mut stream = vec![FRAME_DELIMITER];
        for frame in [&first, &second] {
            stream.push(0x00);
            stream.extend_from_slice(&encode_command(frame));
            stream.push(FRAME_DELIMITER);
        }

        let mut decoder = Decoder::new(Cursor::new(stream));
        // The bare leading delimiter is skipped as a short read
        let a = decoder.next_frame().unwrap();
        assert_eq!(a.body, first.body);
        let b = decoder.next_frame().unwrap();
        assert_eq!(b.source, second.source);
        assert_eq!(b.message().body, "hello");

        match decoder.next_frame() {
            Err(Ax25Error::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected EOF, got {other:?}"),
        }
    }
}
