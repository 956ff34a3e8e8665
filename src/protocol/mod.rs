//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (Framed bincode)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET          - key, optional bin names
//! - 0x02: PUT          - key, record, write policy
//! - 0x03: REMOVE       - key, remove policy
//! - 0x04: PING         - empty
//! - 0x05: EXISTS       - key
//! - 0x06: OPERATE      - key, operations, write policy
//! - 0x10..=0x17: LLIST - add, add_all, remove, size, filter, find, exists, destroy
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: SERVER_ERROR
//! - 0x02: RECORD_NOT_FOUND
//! - 0x03: GENERATION_MISMATCH
//! - 0x04: PARAMETER
//! - 0x0C: BIN_TYPE_MISMATCH
//! - 0x11: BIN_NOT_FOUND
//! - 0x14: NAMESPACE_NOT_FOUND
//! - 0x7D: ELEMENT_NOT_FOUND

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_reply, decode_response, encode_command, encode_error, encode_reply,
    encode_response, read_command, read_response, write_command, write_response, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Reply, Response, Status};
