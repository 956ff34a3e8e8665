//! Command definitions
//!
//! Represents requests from clients.

use serde::{Deserialize, Serialize};

use crate::key::Key;
use crate::llist::ElementFilter;
use crate::operate::Operation;
use crate::policy::{RemovePolicy, WritePolicy};
use crate::record::Record;
use crate::value::Value;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Remove = 0x03,
    Ping = 0x04,
    Exists = 0x05,
    Operate = 0x06,
    ListAdd = 0x10,
    ListAddAll = 0x11,
    ListRemove = 0x12,
    ListSize = 0x13,
    ListFilter = 0x14,
    ListFind = 0x15,
    ListExists = 0x16,
    ListDestroy = 0x17,
}

impl CommandType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let command_type = match byte {
            0x01 => CommandType::Get,
            0x02 => CommandType::Put,
            0x03 => CommandType::Remove,
            0x04 => CommandType::Ping,
            0x05 => CommandType::Exists,
            0x06 => CommandType::Operate,
            0x10 => CommandType::ListAdd,
            0x11 => CommandType::ListAddAll,
            0x12 => CommandType::ListRemove,
            0x13 => CommandType::ListSize,
            0x14 => CommandType::ListFilter,
            0x15 => CommandType::ListFind,
            0x16 => CommandType::ListExists,
            0x17 => CommandType::ListDestroy,
            _ => return None,
        };
        Some(command_type)
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Read a record, optionally only some bins
    Get {
        key: Key,
        bins: Option<Vec<String>>,
    },

    /// Upsert bins
    Put {
        key: Key,
        record: Record,
        policy: WritePolicy,
    },

    /// Delete a record
    Remove { key: Key, policy: RemovePolicy },

    /// Ping (health check)
    Ping,

    /// Record metadata without bins
    Exists { key: Key },

    /// Atomic operation batch
    Operate {
        key: Key,
        operations: Vec<Operation>,
        policy: WritePolicy,
    },

    ListAdd {
        key: Key,
        bin: String,
        value: Value,
    },

    ListAddAll {
        key: Key,
        bin: String,
        values: Vec<Value>,
    },

    ListRemove {
        key: Key,
        bin: String,
        value: Value,
    },

    ListSize { key: Key, bin: String },

    ListFilter {
        key: Key,
        bin: String,
        filter: Option<ElementFilter>,
    },

    ListFind {
        key: Key,
        bin: String,
        value: Value,
    },

    ListExists {
        key: Key,
        bin: String,
        value: Value,
    },

    ListDestroy { key: Key, bin: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Remove { .. } => CommandType::Remove,
            Command::Ping => CommandType::Ping,
            Command::Exists { .. } => CommandType::Exists,
            Command::Operate { .. } => CommandType::Operate,
            Command::ListAdd { .. } => CommandType::ListAdd,
            Command::ListAddAll { .. } => CommandType::ListAddAll,
            Command::ListRemove { .. } => CommandType::ListRemove,
            Command::ListSize { .. } => CommandType::ListSize,
            Command::ListFilter { .. } => CommandType::ListFilter,
            Command::ListFind { .. } => CommandType::ListFind,
            Command::ListExists { .. } => CommandType::ListExists,
            Command::ListDestroy { .. } => CommandType::ListDestroy,
        }
    }
}
