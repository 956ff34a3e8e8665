//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │   Payload (bincode Command) │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! The command byte must agree with the variant the payload decodes to.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Status
//! - OK:                  bincode `Reply`
//! - RECORD_NOT_FOUND:    empty
//! - GENERATION_MISMATCH: (expected u32, actual u32)
//! - BIN_TYPE_MISMATCH:   (bin, expected type, found type)
//! - BIN_NOT_FOUND, ELEMENT_NOT_FOUND: bin name
//! - NAMESPACE_NOT_FOUND: namespace name
//! - PARAMETER, SERVER_ERROR: message
//!
//! Lengths are big-endian.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::{Command, CommandType, Reply, Response, Status};
use crate::error::{NimbusError, Result};
use crate::value::ValueType;

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame Helpers
// =============================================================================

/// Build a frame: tag (1) + payload_len (4) + payload
fn encode_frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(NimbusError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);

    Ok(message.to_vec())
}

/// Parse a header and return the tag byte plus the payload slice
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(NimbusError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let tag = header.get_u8();
    let payload_len = header.get_u32() as usize;

    // Validate payload length
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(NimbusError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(NimbusError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let payload = bincode::serialize(command)?;
    encode_frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, payload) = split_frame(bytes, "command")?;

    let expected = CommandType::from_u8(tag).ok_or_else(|| {
        NimbusError::Protocol(format!("Unknown command type: 0x{:02x}", tag))
    })?;

    let command: Command = bincode::deserialize(payload)?;
    if command.command_type() != expected {
        return Err(NimbusError::Protocol(format!(
            "Command type mismatch: header says {:?}, payload is {:?}",
            expected,
            command.command_type()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    encode_frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::from_u8(status_byte).ok_or_else(|| {
        NimbusError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Reply / Error Mapping
// =============================================================================

/// Wrap a successful reply in an OK response
pub fn encode_reply(reply: &Reply) -> Result<Response> {
    Ok(Response::ok(Some(bincode::serialize(reply)?)))
}

/// Map an error to its status and encoded details
pub fn encode_error(err: &NimbusError) -> Response {
    let (status, details) = match err {
        NimbusError::RecordNotFound => return Response::not_found(),
        NimbusError::RecordGenerationMismatch { expected, actual } => (
            Status::GenerationMismatch,
            bincode::serialize(&(expected, actual)),
        ),
        NimbusError::BinTypeMismatch {
            bin,
            expected,
            found,
        } => (
            Status::BinTypeMismatch,
            bincode::serialize(&(bin, expected, found)),
        ),
        NimbusError::BinNotFound { bin } => (Status::BinNotFound, bincode::serialize(bin)),
        NimbusError::ElementNotFound { bin } => {
            (Status::ElementNotFound, bincode::serialize(bin))
        }
        NimbusError::NamespaceNotFound(ns) => (Status::NamespaceNotFound, bincode::serialize(ns)),
        NimbusError::Parameter(message) => (Status::Parameter, bincode::serialize(message)),
        other => (Status::ServerError, bincode::serialize(&other.to_string())),
    };

    Response::error(status, details.ok())
}

/// Turn a response back into the reply or the typed error it carries
pub fn decode_reply(response: Response) -> Result<Reply> {
    let payload = response.payload.unwrap_or_default();

    let err = match response.status {
        Status::Ok => return Ok(bincode::deserialize(&payload)?),
        Status::RecordNotFound => NimbusError::RecordNotFound,
        Status::GenerationMismatch => {
            let (expected, actual): (u32, u32) = bincode::deserialize(&payload)?;
            NimbusError::RecordGenerationMismatch { expected, actual }
        }
        Status::BinTypeMismatch => {
            let (bin, expected, found): (String, ValueType, ValueType) =
                bincode::deserialize(&payload)?;
            NimbusError::BinTypeMismatch {
                bin,
                expected,
                found,
            }
        }
        Status::BinNotFound => NimbusError::BinNotFound {
            bin: bincode::deserialize(&payload)?,
        },
        Status::ElementNotFound => NimbusError::ElementNotFound {
            bin: bincode::deserialize(&payload)?,
        },
        Status::NamespaceNotFound => NimbusError::NamespaceNotFound(bincode::deserialize(&payload)?),
        Status::Parameter => NimbusError::Parameter(bincode::deserialize(&payload)?),
        Status::ServerError => NimbusError::Server(bincode::deserialize(&payload)?),
    };

    Err(err)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
///
/// Blocks until the frame is complete or an error occurs
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    // Parse payload length
    let payload_len = (&header[1..]).get_u32() as usize;

    // Validate before allocating
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(NimbusError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

/// Read a complete command from a stream
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "command")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
