//! Blocking TCP client
//!
//! Mirrors the [`Engine`](crate::Engine) API over the wire protocol. Each
//! call sends one command and waits for its response; error statuses come
//! back as the same typed [`NimbusError`] variants the engine returns.
//!
//! The client never retries. I/O failures surface as
//! [`NimbusError::Connectivity`] and leave the connection unusable.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::{NimbusError, Result};
use crate::key::Key;
use crate::llist::ElementFilter;
use crate::operate::Operation;
use crate::policy::{RemovePolicy, WritePolicy};
use crate::protocol::{decode_reply, read_response, write_command, Command, Reply, Response};
use crate::record::{Record, RecordMetadata};
use crate::value::Value;

/// A single connection to a NimbusKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    server_addr: String,

    /// Set once a request fails mid-exchange; a late response could still
    /// arrive, so the stream is never read again
    broken: bool,
}

impl Client {
    /// Connect to `addr` (host:port)
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| {
            NimbusError::Connectivity(format!("failed to connect to {}: {}", addr, e))
        })?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            server_addr: addr.to_string(),
            broken: false,
        })
    }

    /// Set socket timeouts (0 means block forever)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let timeout = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        self.reader.get_ref().set_read_timeout(timeout(read_ms))?;
        self.writer.get_ref().set_write_timeout(timeout(write_ms))?;
        Ok(())
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Whether an earlier failure has made this connection unusable
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    // =========================================================================
    // Record Calls
    // =========================================================================

    pub fn ping(&mut self) -> Result<()> {
        match self.request(&Command::Ping)? {
            Reply::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Upsert bins; returns the new generation (0 if the record was deleted)
    pub fn put(&mut self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<u32> {
        let command = Command::Put {
            key: key.clone(),
            record: record.clone(),
            policy: *policy,
        };
        match self.request(&command)? {
            Reply::Generation(generation) => Ok(generation),
            other => Err(unexpected(other)),
        }
    }

    pub fn get(&mut self, key: &Key) -> Result<Record> {
        self.read(key, None)
    }

    /// Read only the named bins
    pub fn select(&mut self, key: &Key, bins: &[&str]) -> Result<Record> {
        let bins = bins.iter().map(|b| b.to_string()).collect();
        self.read(key, Some(bins))
    }

    pub fn exists(&mut self, key: &Key) -> Result<RecordMetadata> {
        match self.request(&Command::Exists { key: key.clone() })? {
            Reply::Metadata(metadata) => Ok(metadata),
            other => Err(unexpected(other)),
        }
    }

    pub fn remove(&mut self, key: &Key, policy: &RemovePolicy) -> Result<()> {
        let command = Command::Remove {
            key: key.clone(),
            policy: *policy,
        };
        self.expect_done(&command)
    }

    /// Apply `operations` atomically; returns the bins read, if any
    pub fn operate(
        &mut self,
        key: &Key,
        operations: &[Operation],
        policy: &WritePolicy,
    ) -> Result<Option<Record>> {
        let command = Command::Operate {
            key: key.clone(),
            operations: operations.to_vec(),
            policy: *policy,
        };
        match self.request(&command)? {
            Reply::Operated(record) => Ok(record),
            other => Err(unexpected(other)),
        }
    }

    // =========================================================================
    // LLIST Calls
    // =========================================================================

    pub fn llist_add(&mut self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<()> {
        let command = Command::ListAdd {
            key: key.clone(),
            bin: bin.to_string(),
            value: value.into(),
        };
        self.expect_done(&command)
    }

    pub fn llist_add_all(&mut self, key: &Key, bin: &str, values: Vec<Value>) -> Result<()> {
        let command = Command::ListAddAll {
            key: key.clone(),
            bin: bin.to_string(),
            values,
        };
        self.expect_done(&command)
    }

    pub fn llist_remove(&mut self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<()> {
        let command = Command::ListRemove {
            key: key.clone(),
            bin: bin.to_string(),
            value: value.into(),
        };
        self.expect_done(&command)
    }

    pub fn llist_size(&mut self, key: &Key, bin: &str) -> Result<u64> {
        let command = Command::ListSize {
            key: key.clone(),
            bin: bin.to_string(),
        };
        match self.request(&command)? {
            Reply::Size(size) => Ok(size),
            other => Err(unexpected(other)),
        }
    }

    pub fn llist_filter(
        &mut self,
        key: &Key,
        bin: &str,
        filter: Option<&ElementFilter>,
    ) -> Result<Vec<Value>> {
        let command = Command::ListFilter {
            key: key.clone(),
            bin: bin.to_string(),
            filter: filter.cloned(),
        };
        self.expect_values(&command)
    }

    pub fn llist_find(&mut self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<Vec<Value>> {
        let command = Command::ListFind {
            key: key.clone(),
            bin: bin.to_string(),
            value: value.into(),
        };
        self.expect_values(&command)
    }

    pub fn llist_exists(&mut self, key: &Key, bin: &str, value: impl Into<Value>) -> Result<bool> {
        let command = Command::ListExists {
            key: key.clone(),
            bin: bin.to_string(),
            value: value.into(),
        };
        match self.request(&command)? {
            Reply::Flag(found) => Ok(found),
            other => Err(unexpected(other)),
        }
    }

    pub fn llist_destroy(&mut self, key: &Key, bin: &str) -> Result<()> {
        let command = Command::ListDestroy {
            key: key.clone(),
            bin: bin.to_string(),
        };
        self.expect_done(&command)
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    fn read(&mut self, key: &Key, bins: Option<Vec<String>>) -> Result<Record> {
        let command = Command::Get {
            key: key.clone(),
            bins,
        };
        match self.request(&command)? {
            Reply::Record(record) => Ok(record),
            other => Err(unexpected(other)),
        }
    }

    fn expect_done(&mut self, command: &Command) -> Result<()> {
        match self.request(command)? {
            Reply::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn expect_values(&mut self, command: &Command) -> Result<Vec<Value>> {
        match self.request(command)? {
            Reply::Values(values) => Ok(values),
            other => Err(unexpected(other)),
        }
    }

    /// Send one command and decode its response
    ///
    /// Any failure while writing or reading a frame breaks the connection.
    fn request(&mut self, command: &Command) -> Result<Reply> {
        if self.broken {
            return Err(NimbusError::Connectivity(
                "connection is unusable".to_string(),
            ));
        }

        tracing::trace!("Sending {:?} to {}", command.command_type(), self.server_addr);

        match self.exchange(command) {
            Ok(response) => decode_reply(response),
            Err(e) => {
                self.mark_broken();
                Err(into_connectivity(e))
            }
        }
    }

    fn exchange(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    fn mark_broken(&mut self) {
        self.broken = true;
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        tracing::debug!("Connection to {} is no longer usable", self.server_addr);
    }
}

fn into_connectivity(err: NimbusError) -> NimbusError {
    match err {
        NimbusError::Io(e) => NimbusError::Connectivity(e.to_string()),
        other => other,
    }
}

fn unexpected(reply: Reply) -> NimbusError {
    NimbusError::Protocol(format!("unexpected reply: {:?}", reply))
}
