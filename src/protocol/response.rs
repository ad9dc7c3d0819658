//! Response decoding.
//!
//! EZO boards answer with a null-padded fixed-size frame: the first non-null
//! byte is a status code (`1` = success), the rest is an ASCII payload.
//! On some bus controllers (notably older Raspberry Pi revisions) received
//! payload bytes arrive with bit 7 set, so the decoder clears the top bit of
//! every payload byte. The status byte is left untouched.

use tracing::trace;

/// Number of bytes requested when reading a response frame.
pub const RESPONSE_LEN: usize = 31;

/// Status code indicating a successful command.
pub const STATUS_OK: u8 = 1;

/// The decoded result of one command/response exchange.
///
/// Callers must distinguish the variants programmatically; a response is
/// never reduced to a bare string.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandOutcome {
    /// The board acknowledged the command; payload is its ASCII response.
    Success(String),
    /// The board answered with a non-success status code.
    DeviceError(u8),
    /// Nothing but null padding came back from the board.
    TransportError,
}

impl CommandOutcome {
    /// Check whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload text, if this outcome is a success.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Success(payload) => Some(payload),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(payload) => write!(f, "Command succeeded: {}", payload),
            Self::DeviceError(code) => write!(f, "Device error {}", code),
            Self::TransportError => write!(f, "No response"),
        }
    }
}

/// Decode a raw response frame into a [`CommandOutcome`].
///
/// Strips all null padding first. An empty result means the board never
/// produced a response. Otherwise the first byte is the status code; on
/// success every subsequent byte has bit 7 cleared before being interpreted
/// as a character (the controller corruption quirk described in the module
/// docs). Non-success frames carry the raw status code and no payload.
pub fn decode(raw: &[u8]) -> CommandOutcome {
    let response: Vec<u8> = raw.iter().copied().filter(|&b| b != 0).collect();

    let (&status, payload) = match response.split_first() {
        Some(parts) => parts,
        None => return CommandOutcome::TransportError,
    };

    if status != STATUS_OK {
        trace!("Response carried error status {}", status);
        return CommandOutcome::DeviceError(status);
    }

    let text: String = payload.iter().map(|&b| (b & 0x7F) as char).collect();
    trace!("Decoded response payload: {:?}", text);
    CommandOutcome::Success(text)
}
