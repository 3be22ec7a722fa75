//! # motesim-packet
//!
//! Encoding and decoding of the command messages injected into simulated motes.
//!
//! ## Message Structure
//!
//! A command message is a fixed 28-byte network-order struct:
//! - Destination (2 bytes, big-endian)
//! - Command ID (1 byte)
//! - Payload (25 bytes, zero padded)
//!
//! It travels inside a generic simulator packet tagged with [`AM_COMMAND_MSG`].
//!
//! ## Example
//!
//! ```rust
//! use motesim_packet::{CommandId, CommandMsg};
//!
//! let mut msg = CommandMsg::new();
//! msg.set_dest(1);
//! msg.set_id(CommandId::Ping.as_u8());
//! msg.set_payload(b"\x02Hello").unwrap();
//! let decoded = CommandMsg::decode(&msg.encode()).unwrap();
//! assert_eq!(decoded, msg);
//! ```

pub mod error;

use std::fmt;

pub use error::PacketError;

// ============================================================================
// Constants
// ============================================================================

/// Active-message type of command messages.
pub const AM_COMMAND_MSG: u8 = 99;

/// Encoded size of a command message in bytes.
pub const CMD_PACKET_SIZE: usize = 28;

/// Capacity of the payload field in bytes.
pub const CMD_PAYLOAD_SIZE: usize = CMD_PACKET_SIZE - 3;

// ============================================================================
// Command IDs
// ============================================================================

/// Commands understood by the mote command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    /// Ping another mote; payload is the target ID byte followed by the message.
    Ping = 0,
    /// Print the mote's neighbor table.
    NeighborDump = 1,
    /// Print the mote's routing table.
    RouteDump = 3,
}

impl CommandId {
    /// Look up a command by its wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CommandId::Ping),
            1 => Some(CommandId::NeighborDump),
            3 => Some(CommandId::RouteDump),
            _ => None,
        }
    }

    /// Wire value of this command.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandId::Ping => write!(f, "Ping"),
            CommandId::NeighborDump => write!(f, "Neighbor Dump"),
            CommandId::RouteDump => write!(f, "Route Dump"),
        }
    }
}

// ============================================================================
// Command Message
// ============================================================================

/// A command message addressed to one mote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMsg {
    dest: u16,
    id: u8,
    payload: [u8; CMD_PAYLOAD_SIZE],
}

impl Default for CommandMsg {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandMsg {
    /// Create an all-zero message.
    pub fn new() -> Self {
        CommandMsg {
            dest: 0,
            id: 0,
            payload: [0u8; CMD_PAYLOAD_SIZE],
        }
    }

    /// Active-message type used when embedding this message in a packet.
    pub fn am_type(&self) -> u8 {
        AM_COMMAND_MSG
    }

    /// Destination mote.
    pub fn dest(&self) -> u16 {
        self.dest
    }

    /// Set the destination mote.
    pub fn set_dest(&mut self, dest: u16) {
        self.dest = dest;
    }

    /// Command ID.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Set the command ID.
    pub fn set_id(&mut self, id: u8) {
        self.id = id;
    }

    /// The raw payload field, including zero padding.
    pub fn payload(&self) -> &[u8; CMD_PAYLOAD_SIZE] {
        &self.payload
    }

    /// The payload with trailing zero padding removed.
    pub fn payload_trimmed(&self) -> &[u8] {
        let end = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        &self.payload[..end]
    }

    /// Replace the payload. Bytes past `bytes.len()` are zeroed.
    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<(), PacketError> {
        if bytes.len() > CMD_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge {
                len: bytes.len(),
                max: CMD_PAYLOAD_SIZE,
            });
        }
        self.payload = [0u8; CMD_PAYLOAD_SIZE];
        self.payload[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Replace the payload with the bytes of a string.
    pub fn set_string_payload(&mut self, value: &str) -> Result<(), PacketError> {
        self.set_payload(value.as_bytes())
    }

    /// Encode to the fixed wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CMD_PACKET_SIZE);
        out.extend_from_slice(&self.dest.to_be_bytes());
        out.push(self.id);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode from the wire layout. Bytes past the message are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < CMD_PACKET_SIZE {
            return Err(PacketError::Truncated {
                expected: CMD_PACKET_SIZE,
                actual: data.len(),
            });
        }
        let mut payload = [0u8; CMD_PAYLOAD_SIZE];
        payload.copy_from_slice(&data[3..CMD_PACKET_SIZE]);
        Ok(CommandMsg {
            dest: u16::from_be_bytes([data[0], data[1]]),
            id: data[2],
            payload,
        })
    }

    /// The command this message carries, if it is a known one.
    pub fn command(&self) -> Option<CommandId> {
        CommandId::from_u8(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut msg = CommandMsg::new();
        msg.set_dest(0x0102);
        msg.set_id(CommandId::RouteDump.as_u8());
        msg.set_string_payload("abc").unwrap();

        let bytes = msg.encode();
        assert_eq!(bytes.len(), CMD_PACKET_SIZE);
        assert_eq!(&bytes[..6], &[0x01, 0x02, 3, b'a', b'b', b'c']);
        assert!(bytes[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_payload_too_large() {
        let mut msg = CommandMsg::new();
        let err = msg.set_payload(&[1u8; CMD_PAYLOAD_SIZE + 1]).unwrap_err();
        assert_eq!(
            err,
            PacketError::PayloadTooLarge {
                len: CMD_PAYLOAD_SIZE + 1,
                max: CMD_PAYLOAD_SIZE
            }
        );
        // A full-size payload still fits.
        msg.set_payload(&[1u8; CMD_PAYLOAD_SIZE]).unwrap();
    }

    #[test]
    fn test_set_payload_clears_previous() {
        let mut msg = CommandMsg::new();
        msg.set_string_payload("neighbor command").unwrap();
        msg.set_string_payload("hi").unwrap();
        assert_eq!(msg.payload_trimmed(), b"hi");
        assert_eq!(&msg.payload()[..2], b"hi");
        assert!(msg.payload()[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_truncated() {
        let err = CommandMsg::decode(&[0u8; 5]).unwrap_err();
        assert_eq!(
            err,
            PacketError::Truncated {
                expected: CMD_PACKET_SIZE,
                actual: 5
            }
        );
    }

    #[test]
    fn test_command_ids() {
        assert_eq!(CommandId::from_u8(0), Some(CommandId::Ping));
        assert_eq!(CommandId::from_u8(1), Some(CommandId::NeighborDump));
        assert_eq!(CommandId::from_u8(2), None);
        assert_eq!(CommandId::from_u8(3), Some(CommandId::RouteDump));
        assert_eq!(CommandId::NeighborDump.to_string(), "Neighbor Dump");
    }
}
