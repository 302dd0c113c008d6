use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::Info;
use crate::symbols;

/// Knots to km/h.
const KNOT_KMH: f64 = 1.852;

/// Errors from position decoding. All are recoverable: `NoPosition` just
/// means "this frame carries no location".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("no positions found")]
    NoPosition,
    #[error("truncated message")]
    Truncated,
    #[error("invalid position ambiguity {0}")]
    InvalidAmbiguity(u8),
    #[error("malformed coordinate field")]
    BadNumber,
}

/// Map marker symbol for an object or station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol table selector; `\` selects the alternate table.
    pub table: u8,
    /// Symbol code within the table.
    pub symbol: u8,
}

impl Symbol {
    pub fn new(table: u8, symbol: u8) -> Self {
        Self { table, symbol }
    }

    /// True if this symbol is part of the primary symbol table.
    pub fn is_primary(&self) -> bool {
        self.table != b'\\'
    }

    /// Name of the symbol; empty for unknown codes.
    pub fn name(&self) -> &'static str {
        symbols::name(self.table, self.symbol)
    }

    /// Textual glyph for this symbol, where one exists.
    pub fn glyph(&self) -> Option<&'static str> {
        symbols::glyph(self.name())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (table, symbol) = (self.table as char, self.symbol as char);
        match self.glyph() {
            Some(glyph) => write!(f, "{{{}{}: {} - {}}}", table, symbol, self.name(), glyph),
            None => write!(f, "{{{}{}: {}}}", table, symbol, self.name()),
        }
    }
}

/// Course and speed of an object or station.
///
/// Course is in degrees; 0 means "unknown" in the uncompressed encoding
/// (the compressed encoding maps a decoded 0 to 360 instead). Speed is in
/// km/h.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub course: f64,
    pub speed: f64,
}

/// A decoded geographic position with everything needed to place a station
/// on a map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees, positive north.
    pub lat: f64,
    /// Degrees, positive east.
    pub lon: f64,
    /// Digits of precision deliberately suppressed (0-4).
    pub ambiguity: u8,
    pub velocity: Velocity,
    pub symbol: Symbol,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{lat={}, lon={}, amb={}, sym={}}}",
            self.lat, self.lon, self.ambiguity, self.symbol
        )
    }
}

/// Decode a 4-character base-91 group (ASCII 33..123, most significant
/// digit first). Defined only for exactly four bytes; anything else is 0.
pub fn decode_base91(s: &[u8]) -> i32 {
    if s.len() != 4 {
        return 0;
    }
    (i32::from(s[0]) - 33) * 91 * 91 * 91
        + (i32::from(s[1]) - 33) * 91 * 91
        + (i32::from(s[2]) - 33) * 91
        + i32::from(s[3])
        - 33
}

/// Center-of-uncertainty offset for an ambiguity level, added to both
/// coordinates so the reported point sits in the middle of the suppressed
/// range.
fn ambiguity_offset(ambiguity: u8) -> Result<f64, PositionError> {
    Ok(match ambiguity {
        0 => 0.0,         // exact
        1 => 0.05 / 60.0, // nearest 1/10 of a minute
        2 => 0.5 / 60.0,  // nearest minute
        3 => 5.0 / 60.0,  // nearest 10 minutes
        4 => 0.5,         // nearest degree
        n => return Err(PositionError::InvalidAmbiguity(n)),
    })
}

/// Parse a numeric sub-field, replacing ambiguity spaces with '0' and
/// counting them into `spaces`.
fn parse_coord_field(field: &[u8], spaces: &mut u8) -> Result<f64, PositionError> {
    let mut cleaned = String::with_capacity(field.len());
    for &b in field {
        if b == b' ' {
            *spaces += 1;
            cleaned.push('0');
        } else {
            cleaned.push(b as char);
        }
    }
    cleaned.parse().map_err(|_| PositionError::BadNumber)
}

/// Lenient fixed-width float parse for the course/speed extension: garbage
/// degrades to 0 the way the original scanner behaved.
fn parse_ext_number(field: &[u8]) -> f64 {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0.0)
}

/// Decode the human-readable format: `DDMM.mmN` latitude, table selector,
/// `DDDMM.mmW` longitude, symbol code, then an optional `CCC/SSS`
/// course/speed extension.
fn decode_uncompressed(input: &[u8]) -> Result<Position, PositionError> {
    // lat:8 symtab:1 lon:9 sym:1
    if input.len() < 19 {
        return Err(PositionError::Truncated);
    }

    let mut pos = Position {
        symbol: Symbol::new(input[8], input[18]),
        ..Position::default()
    };

    let fields = [&input[0..2], &input[2..7], &input[9..12], &input[12..17]];
    let mut spaces = 0u8;
    let mut nums = [0f64; 4];
    for (num, field) in nums.iter_mut().zip(fields) {
        *num = parse_coord_field(field, &mut spaces)?;
    }

    // Each ambiguity level blanks one digit in both coordinates at once
    pos.ambiguity = spaces / 2;
    let offby = ambiguity_offset(pos.ambiguity)?;

    let mut lat = nums[0] + nums[1] / 60.0 + offby;
    let mut lon = nums[2] + nums[3] / 60.0 + offby;
    if input[7] == b'S' {
        lat = -lat;
    }
    if input[17] == b'W' {
        lon = -lon;
    }
    pos.lat = lat;
    pos.lon = lon;

    let ext = &input[19..];
    if ext.len() >= 7 && pos.symbol.symbol != b'_' && ext[3] == b'/' {
        pos.velocity.course = parse_ext_number(&ext[0..3]);
        pos.velocity.speed = parse_ext_number(&ext[4..7]) * KNOT_KMH;
    }

    Ok(pos)
}

/// Decode compressed course/speed bytes into `velocity`, shared between the
/// typed and legacy compressed paths. A decoded course of 0 is reported as
/// 360: the encoding reserves 0 for "unset" but 360 is a legal heading.
fn decode_compressed_velocity(c: u8, s: u8, velocity: &mut Velocity) {
    if c != b' ' && s != b' ' && (b'!'..=b'z').contains(&c) {
        velocity.course = f64::from(c - 33) * 4.0;
        if velocity.course == 0.0 {
            velocity.course = 360.0;
        }
        velocity.speed = KNOT_KMH * (1.08f64.powi(i32::from(s) - 33) - 1.0);
    }
}

/// Decode the base-91 compressed format: table selector, 4-char latitude,
/// 4-char longitude, symbol code, compressed course/speed, type byte.
fn decode_compressed(input: &[u8]) -> Result<Position, PositionError> {
    if input.len() < 12 {
        return Err(PositionError::Truncated);
    }
    let mut pos = Position {
        symbol: Symbol::new(input[0], input[9]),
        // The divisors spread 91^4 steps over the latitude/longitude ranges
        // and must match the encoder bit-for-bit
        lat: 90.0 - f64::from(decode_base91(&input[1..5])) / 380926.0,
        lon: -180.0 + f64::from(decode_base91(&input[5..9])) / 190463.0,
        ..Position::default()
    };
    decode_compressed_velocity(input[10], input[11], &mut pos.velocity);
    Ok(pos)
}

fn decode_at(input: &[u8]) -> Result<Position, PositionError> {
    if input.first().is_some_and(u8::is_ascii_digit) {
        decode_uncompressed(input)
    } else {
        decode_compressed(input)
    }
}

const COORD_FIELD: &str = r"(\d{1,3})([0-5 ][0-9 ])\.([0-9 ]+)([NEWS])";
const SYMBOL_TABLES: &str = r"[0-9/\\A-z]";
// ASCII 33..123, the base-91 alphabet
const B91_CHARS: &str = r"[!-{]";

static UNCOMPRESSED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"([!=]|[/@\*]\d{{6}}[hz/]){COORD_FIELD}({SYMBOL_TABLES}){COORD_FIELD}(.)([0-3][0-9]{{2}}/[0-9]{{3}})?"
    ))
    .expect("valid uncompressed position regex")
});

static COMPRESSED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "([!=/@])({B91_CHARS}{{4}})({B91_CHARS}{{4}})(.)(..)(.)"
    ))
    .expect("valid compressed position regex")
});

/// Legacy whole-body scan for the uncompressed format. Tolerates the
/// coordinate pair arriving in either order by checking which hemisphere
/// letters matched.
fn legacy_uncompressed(input: &str) -> Result<Position, PositionError> {
    let Some(caps) = UNCOMPRESSED_RE.captures(input) else {
        return Err(PositionError::NoPosition);
    };

    let mut pos = Position {
        symbol: Symbol::new(caps[6].as_bytes()[0], caps[11].as_bytes()[0]),
        ..Position::default()
    };

    let fields = [
        caps[2].to_string(),
        format!("{}.{}", &caps[3], &caps[4]),
        caps[7].to_string(),
        format!("{}.{}", &caps[8], &caps[9]),
    ];
    let mut spaces = 0u8;
    let mut nums = [0f64; 4];
    for (num, field) in nums.iter_mut().zip(&fields) {
        *num = parse_coord_field(field.as_bytes(), &mut spaces)?;
    }

    pos.ambiguity = spaces / 2;
    let offby = ambiguity_offset(pos.ambiguity)?;

    let mut a = nums[0] + nums[1] / 60.0 + offby;
    let mut b = nums[2] + nums[3] / 60.0 + offby;

    if matches!(&caps[5], "S" | "W") {
        a = -a;
    }
    if matches!(&caps[10], "W" | "S") {
        b = -b;
    }
    if matches!(&caps[5], "N" | "S") {
        pos.lat = a;
        pos.lon = b;
    } else {
        pos.lat = b;
        pos.lon = a;
    }

    if let Some(ext) = caps.get(12) {
        if pos.symbol.symbol != b'_' {
            let ext = ext.as_str().as_bytes();
            pos.velocity.course = parse_ext_number(&ext[0..3]);
            pos.velocity.speed = parse_ext_number(&ext[4..7]) * KNOT_KMH;
        }
    }

    Ok(pos)
}

/// Legacy whole-body scan for the compressed format. Historical quirk: this
/// path never resolved a symbol, only coordinates and velocity.
fn legacy_compressed(input: &str) -> Result<Position, PositionError> {
    let Some(caps) = COMPRESSED_RE.captures(input) else {
        return Err(PositionError::NoPosition);
    };

    let mut pos = Position {
        lat: 90.0 - f64::from(decode_base91(caps[2].as_bytes())) / 380926.0,
        lon: -180.0 + f64::from(decode_base91(caps[3].as_bytes())) / 190463.0,
        ..Position::default()
    };
    let cs = caps[5].as_bytes();
    decode_compressed_velocity(cs[0], cs[1], &mut pos.velocity);
    Ok(pos)
}

/// Whole-body fallback for payloads without a recognized type prefix, kept
/// for compatibility with older message shapes. Uncompressed is tried first
/// because it is cheaper to reject.
fn legacy_scan(input: &str) -> Result<Position, PositionError> {
    legacy_uncompressed(input).or_else(|_| legacy_compressed(input))
}

impl Info {
    /// Extract the position carried by this payload, if any.
    ///
    /// The payload type selects where the position encoding starts:
    /// `!`/`=` right after the type byte, `/`/`@` after the 7-byte timestamp
    /// block, `;` (object) after the 17-byte name/flag/timestamp region.
    /// Everything else falls back to the legacy whole-body scan. A leading
    /// digit at the computed offset selects the uncompressed format.
    pub fn position(&self) -> Result<Position, PositionError> {
        let body = self.as_str().as_bytes();
        match self.packet_type().0 {
            b'!' | b'=' => {
                if body.len() < 2 {
                    return Err(PositionError::Truncated);
                }
                decode_at(&body[1..])
            }
            b'/' | b'@' => {
                if body.len() < 9 {
                    return Err(PositionError::Truncated);
                }
                decode_at(&body[8..])
            }
            b';' => {
                if body.len() < 19 {
                    return Err(PositionError::Truncated);
                }
                decode_at(&body[18..])
            }
            _ => legacy_scan(self.as_str()),
        }
    }
}
