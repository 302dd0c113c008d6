use std::fmt;

use serde::{Deserialize, Serialize};

/// SSID mask used for the "command" side of an AX.25 address pair.
pub const SET_SSID_MASK: u8 = 0x70 << 1;
/// SSID mask used for the "response" side of an AX.25 address pair.
pub const CLEAR_SSID_MASK: u8 = 0x30 << 1;

/// An APRS station address: callsign plus optional SSID.
///
/// SSID 0 has no canonical suffix, so `KG6HWF` and `KG6HWF-0` parse to the
/// same value and both render as `KG6HWF`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Callsign, stored verbatim from the wire.
    pub call: String,
    /// Secondary station identifier, a 4-bit field (0-15).
    pub ssid: u8,
}

impl Address {
    pub fn new(call: impl Into<String>, ssid: u8) -> Self {
        Self {
            call: call.into(),
            ssid,
        }
    }

    /// Parse a text address of the form `CALL` or `CALL-SSID`.
    ///
    /// Parsing is deliberately lenient: APRS-IS carries a lot of malformed
    /// traffic, so an unparseable SSID degrades to 0 instead of failing.
    /// SSIDs are masked to the 4-bit AX.25 field.
    pub fn parse(s: &str) -> Self {
        match s.split_once('-') {
            Some((call, ssid)) => Self {
                call: call.to_string(),
                ssid: ssid.parse::<u32>().map_or(0, |n| (n & 0xf) as u8),
            },
            None => Self {
                call: s.to_string(),
                ssid: 0,
            },
        }
    }

    /// APRS-IS login hash for this callsign.
    ///
    /// Seed 0x73E2, XOR the call bytes in pairs (high byte first), mask to
    /// 15 bits. The SSID does not participate. For odd-length calls the
    /// final lone byte only contributes its high-shifted half; reading past
    /// the end of the call is a historical bug, not a feature.
    pub fn call_pass(&self) -> i16 {
        let bytes = self.call.as_bytes();
        let mut hash: u16 = 0x73e2;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= u16::from(bytes[i]) << 8;
            if i + 1 < bytes.len() {
                hash ^= u16::from(bytes[i + 1]);
            }
            i += 2;
        }
        (hash & 0x7fff) as i16
    }

    /// Encode as a 7-octet AX.25 address field.
    ///
    /// Call bytes are shifted left one bit over a space-filled field; calls
    /// longer than six characters are truncated (fixed-width wire format).
    /// The low bit of the final octet (the "last address" / command-response
    /// flag) comes in through `ssid_mask`, it is not derived from the SSID.
    pub fn encode_ax25(&self, ssid_mask: u8) -> [u8; 7] {
        let mut out = [b' '; 7];
        for (i, c) in self.call.bytes().take(6).enumerate() {
            out[i] = c << 1;
        }
        out[6] = ssid_mask | (self.ssid << 1);
        out
    }

    /// Decode a 7-octet AX.25 address field.
    ///
    /// Accepts any non-empty slice: the last byte supplies the SSID, the
    /// rest the callsign.
    pub fn decode_ax25(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        let decoded: Vec<u8> = raw.iter().map(|b| b >> 1).collect();
        let (call, ssid) = decoded.split_at(decoded.len() - 1);
        Self {
            call: String::from_utf8_lossy(call).trim().to_string(),
            ssid: ssid[0] & 0xf,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid != 0 {
            write!(f, "{}-{}", self.call, self.ssid)
        } else {
            f.write_str(&self.call)
        }
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_round_trip() {
        for ssid in 0..=15u8 {
            let addr = Address::new("KG6HWF", ssid);
            assert_eq!(Address::parse(&addr.to_string()), addr);
        }
    }

    #[test]
    fn format_omits_zero_ssid() {
        assert_eq!(Address::new("KG6HWF", 0).to_string(), "KG6HWF");
        assert_eq!(Address::new("KG6HWF", 9).to_string(), "KG6HWF-9");
    }

    #[test]
    fn parse_is_lenient() {
        // Garbage SSIDs degrade to zero rather than failing
        assert_eq!(Address::parse("KG6HWF-X"), Address::new("KG6HWF", 0));
        // Large SSIDs are masked to the 4-bit field
        assert_eq!(Address::parse("KG6HWF-17"), Address::new("KG6HWF", 1));
        assert_eq!(Address::parse("W1AW-14"), Address::new("W1AW", 14));
    }

    #[test]
    fn call_pass_fixtures() {
        assert_eq!(Address::new("KG6HWF", 9).call_pass(), 22955);
        // SSID does not affect the hash
        assert_eq!(Address::new("KG6HWF", 0).call_pass(), 22955);
        assert_eq!(Address::new("KE6AFE", 13).call_pass(), 18595);
    }

    #[test]
    fn call_pass_odd_length_call() {
        // The lone trailing byte must not read past the end of the call:
        // 0x73E2 ^ 0x4100 ^ 0x42 ^ 0x4300 = 0x71A0
        assert_eq!(Address::new("ABC", 0).call_pass(), 0x71a0);
    }

    #[test]
    fn ax25_encode_fixtures() {
        assert_eq!(
            Address::parse("KG6HWF").encode_ax25(SET_SSID_MASK),
            [0x96, 0x8e, 0x6c, 0x90, 0xae, 0x8c, 0xe0]
        );
        assert_eq!(
            Address::parse("KG6HWF-9").encode_ax25(SET_SSID_MASK),
            [0x96, 0x8e, 0x6c, 0x90, 0xae, 0x8c, 0xf2]
        );
        assert_eq!(
            Address::parse("KG6HWF").encode_ax25(CLEAR_SSID_MASK),
            [0x96, 0x8e, 0x6c, 0x90, 0xae, 0x8c, 0x60]
        );
        assert_eq!(
            Address::parse("KG6HWF-9").encode_ax25(CLEAR_SSID_MASK),
            [0x96, 0x8e, 0x6c, 0x90, 0xae, 0x8c, 0x72]
        );
    }

    #[test]
    fn ax25_decode_round_trip() {
        for src in ["KG6HWF", "KG6HWF-9", "W1AW-5", "X"] {
            let addr = Address::parse(src);
            let encoded = addr.encode_ax25(CLEAR_SSID_MASK);
            assert_eq!(Address::decode_ax25(&encoded), addr);
        }
    }

    #[test]
    fn ax25_encode_truncates_long_calls() {
        let encoded = Address::new("KG6HWFX", 1).encode_ax25(SET_SSID_MASK);
        assert_eq!(Address::decode_ax25(&encoded), Address::new("KG6HWF", 1));
    }
}
