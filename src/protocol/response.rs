//! Response definitions
//!
//! Represents responses to clients.

use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordMetadata};
use crate::value::Value;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    ServerError = 0x01,
    RecordNotFound = 0x02,
    GenerationMismatch = 0x03,
    Parameter = 0x04,
    BinTypeMismatch = 0x0C,
    BinNotFound = 0x11,
    NamespaceNotFound = 0x14,
    ElementNotFound = 0x7D,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let status = match byte {
            0x00 => Status::Ok,
            0x01 => Status::ServerError,
            0x02 => Status::RecordNotFound,
            0x03 => Status::GenerationMismatch,
            0x04 => Status::Parameter,
            0x0C => Status::BinTypeMismatch,
            0x11 => Status::BinNotFound,
            0x14 => Status::NamespaceNotFound,
            0x7D => Status::ElementNotFound,
            _ => return None,
        };
        Some(status)
    }
}

/// Result payload of a successful command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// Ping answer
    Pong,

    /// Success without data
    Done,

    /// New generation after a put (0 if the record was deleted)
    Generation(u32),

    Record(Record),

    Metadata(RecordMetadata),

    /// Values read by an operate batch
    Operated(Option<Record>),

    Size(u64),

    /// List elements, sorted
    Values(Vec<Value>),

    Flag(bool),
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (encoded `Reply` for OK, error details otherwise)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a RECORD_NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::RecordNotFound,
            payload: None,
        }
    }

    /// Create an error response with the given status and encoded details
    pub fn error(status: Status, payload: Option<Vec<u8>>) -> Self {
        Self { status, payload }
    }
}
