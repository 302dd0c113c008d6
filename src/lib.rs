//! APRS wire codec: text frames, AX.25/KISS binary framing, positions,
//! messages and the APRS-IS login hash, plus an async APRS-IS client.
//!
//! The codec is purely functional and lenient by design: structurally
//! malformed frames and messages come back as sentinel values to check
//! (`Frame::is_valid`, `Message::parsed`), while position and AX.25
//! decoding return typed recoverable errors. Nothing here panics on
//! garbage traffic.

pub mod address;
pub mod aprs_is;
pub mod ax25;
pub mod frame;
pub mod message;
pub mod position;
pub mod symbols;

pub use address::{Address, CLEAR_SSID_MASK, SET_SSID_MASK};
pub use aprs_is::{AprsIsClient, AprsIsConfig};
pub use frame::{Frame, Info, PacketType};
pub use message::Message;
pub use position::{Position, PositionError, Symbol, Velocity};
