use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// The information field (payload) of an APRS frame.
///
/// Opaque text; the first byte selects the [`PacketType`] and sub-codecs
/// reinterpret the rest as needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Info(pub String);

impl Info {
    /// Packet type keyed by the first payload byte (0 for an empty payload).
    pub fn packet_type(&self) -> PacketType {
        PacketType(self.0.as_bytes().first().copied().unwrap_or(0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Info {
    fn from(s: &str) -> Self {
        Info(s.to_string())
    }
}

impl From<String> for Info {
    fn from(s: String) -> Self {
        Info(s)
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// APRS data type identifier, the first byte of the information field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketType(pub u8);

impl PacketType {
    /// True for an addressed message (`:`).
    pub fn is_message(self) -> bool {
        self.0 == b':'
    }

    /// True for third-party traffic (`}`), whose body nests another frame.
    pub fn is_third_party(self) -> bool {
        self.0 == b'}'
    }

    /// Human-readable name for known type bytes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0x1c => "Current Mic-E Data (Rev 0 beta)",
            0x1d => "Old Mic-E Data (Rev 0 beta)",
            b'!' => "Position without timestamp (no APRS messaging), or Ultimeter 2000 WX Station",
            b'"' => "Old Mic-E Data (but Current data for TM-D700)",
            b'#' => "Peet Bros U-II Weather Station",
            b'$' => "Raw GPS data or Ultimeter 2000",
            b'%' => "Agrelo DFJr / MicroFinder",
            b')' => "Item",
            b'*' => "Peet Bros U-II Weather Station",
            b',' => "Invalid data or test data",
            b'/' => "Position with timestamp (no APRS messaging)",
            b':' => "Message",
            b';' => "Object",
            b'<' => "Station Capabilities",
            b'=' => "Position without timestamp (with APRS messaging)",
            b'>' => "Status",
            b'?' => "Query",
            b'@' => "Position with timestamp (with APRS messaging)",
            b'T' => "Telemetry data",
            b'[' => "Maidenhead grid locator beacon (obsolete)",
            b'_' => "Weather Report (without position)",
            b'`' => "Current Mic-E Data (not used in TM-D700)",
            b'{' => "User-Defined APRS packet format",
            b'}' => "Third-party traffic",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Unknown {:x}", self.0),
        }
    }
}

/// A parsed APRS text frame: `SOURCE>DEST[,PATH]*:BODY`.
///
/// Structurally malformed input parses to `Frame::default()` rather than an
/// error; check [`Frame::is_valid`] before use. `original` holds the input
/// line verbatim iff parsing succeeded, which makes round-tripping and the
/// validity check trivial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The raw line this frame was parsed from; empty for invalid frames.
    pub original: String,
    pub source: Address,
    pub dest: Address,
    /// Digipeater path in transmission order.
    pub path: Vec<Address>,
    pub body: Info,
}

impl Frame {
    /// Parse one APRS-IS line into a frame.
    ///
    /// Missing `:` or `>` separators yield the invalid sentinel; everything
    /// downstream of the structural split goes through the lenient address
    /// parser and cannot fail.
    pub fn parse(line: &str) -> Frame {
        let Some((header, body)) = line.split_once(':') else {
            return Frame::default();
        };
        let Some((source, rest)) = header.split_once('>') else {
            return Frame::default();
        };
        let mut hops = rest.split(',');
        // split always yields at least one element
        let dest = hops.next().unwrap_or_default();
        Frame {
            original: line.to_string(),
            source: Address::parse(source),
            dest: Address::parse(dest),
            path: hops.map(Address::parse).collect(),
            body: Info::from(body),
        }
    }

    /// True iff this frame came out of a successful parse.
    pub fn is_valid(&self) -> bool {
        !self.original.is_empty()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.source, self.dest)?;
        for hop in &self.path {
            write!(f, ",{hop}")?;
        }
        write!(f, ":{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHRISTMAS: &str = "KG6HWF>APX200,WIDE1-1,WIDE2-1:=3722.1 N/12159.1 W-Merry Christmas!";

    #[test]
    fn parse_basic_frame() {
        let frame = Frame::parse(CHRISTMAS);
        assert!(frame.is_valid());
        assert_eq!(frame.source, Address::new("KG6HWF", 0));
        assert_eq!(frame.dest, Address::new("APX200", 0));
        assert_eq!(
            frame.path,
            vec![Address::new("WIDE1", 1), Address::new("WIDE2", 1)]
        );
        assert_eq!(frame.body.as_str(), "=3722.1 N/12159.1 W-Merry Christmas!");
    }

    #[test]
    fn format_round_trips() {
        for line in [
            CHRISTMAS,
            "KG6HWF-9>APDR12,TCPIP*,qAC,T2SPAIN2::KG6HWF   :testing notifications{10",
            "N6WKZ-3>APU25N,WR6ABD:=3746.42N112226.00W# {UIV32N}",
            "A>B:hello",
        ] {
            assert_eq!(Frame::parse(line).to_string(), line);
        }
    }

    #[test]
    fn malformed_input_yields_invalid_sentinel() {
        for line in ["", "no separators here", "A>B no body", "A,B:body"] {
            let frame = Frame::parse(line);
            assert!(!frame.is_valid(), "{line:?} should not parse");
            assert_eq!(frame, Frame::default());
        }
    }

    #[test]
    fn packet_types() {
        assert!(Info::from(":KG6HWF   :hi").packet_type().is_message());
        assert!(Info::from("}A>B:hi").packet_type().is_third_party());
        assert_eq!(Info::from(":x").packet_type().to_string(), "Message");
        assert_eq!(Info::from("qrv?").packet_type().to_string(), "Unknown 71");
        assert_eq!(Info::default().packet_type(), PacketType(0));
    }
}
