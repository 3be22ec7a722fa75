//! Command message codec errors.

use thiserror::Error;

/// Errors that can occur while building or decoding a command message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Payload does not fit in the fixed payload field.
    #[error("payload of {len} bytes exceeds the {max} byte command payload")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Capacity of the payload field.
        max: usize,
    },

    /// Buffer is shorter than a command message.
    #[error("command message needs {expected} bytes, got {actual}")]
    Truncated {
        /// Required length.
        expected: usize,
        /// Length of the buffer.
        actual: usize,
    },
}
