use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::frame::Frame;

static ACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ack[A-Za-z0-9]{1,5}").expect("valid ack pattern"));

static BULLETIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^BLN[0-9A-Z]").expect("valid bulletin pattern"));

/// An addressed message from one APRS station to another.
///
/// `parsed == false` is the failure sentinel: malformed or non-message
/// bodies extract to a default `Message` rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Address,
    pub recipient: Address,
    pub body: String,
    /// Trailing message ID, empty when absent.
    pub id: String,
    pub parsed: bool,
}

impl Message {
    /// True if this message acknowledges another message (`ack` followed by
    /// 1-5 alphanumerics).
    pub fn is_ack(&self) -> bool {
        ACK_RE.is_match(&self.body)
    }

    /// True if this message is addressed to a bulletin or announcement
    /// group (`BLN` plus a digit or letter).
    pub fn is_bulletin(&self) -> bool {
        BULLETIN_RE.is_match(&self.recipient.to_string())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The recipient field is fixed at 9 columns on the wire
        write!(f, ":{:<9}:{}", self.recipient.to_string(), self.body)?;
        if !self.id.is_empty() {
            write!(f, "{{{}", self.id)?;
        }
        Ok(())
    }
}

impl Frame {
    /// Extract the addressed message carried by this frame, unwrapping
    /// third-party relaying as it goes.
    ///
    /// Unwrapping is a bounded loop: each round strips the `}` and reparses
    /// the remainder as a frame, which strictly shrinks the body, so even
    /// adversarial nesting terminates. Bodies of 11 bytes or fewer cannot
    /// plausibly contain a message and stop the unwrap.
    pub fn message(&self) -> Message {
        let mut frame = self.clone();
        while frame.body.packet_type().is_third_party() && frame.body.len() > 11 {
            frame = Frame::parse(&frame.body.as_str()[1..]);
        }

        if !frame.body.packet_type().is_message() || frame.body.len() < 12 {
            return Message::default();
        }
        let body = frame.body.as_str();
        // Multibyte characters inside the fixed-width recipient field make
        // the body unaddressable; treat it as unparsed
        let (Some(recipient), Some(text)) = (body.get(1..10), body.get(11..)) else {
            return Message::default();
        };

        let mut msg = Message {
            sender: frame.source.clone(),
            recipient: Address::parse(recipient.trim()),
            parsed: true,
            ..Message::default()
        };
        match text.split_once('{') {
            Some((text, id)) => {
                msg.body = text.to_string();
                msg.id = id.to_string();
            }
            None => msg.body = text.to_string(),
        }
        msg
    }
}
