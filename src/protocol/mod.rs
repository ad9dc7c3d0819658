//! Command text protocol.
//!
//! This module contains the implementations for:
//! - Command encoding (ASCII + null terminator)
//! - Wait-interval classification by command class
//! - Response frame decoding

pub mod command;
pub mod response;

pub use command::{encode, CommandClass, COMMAND_TERMINATOR};
pub use response::{decode, CommandOutcome, RESPONSE_LEN, STATUS_OK};
