//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - Fixed worker pool fed over a crossbeam channel, one connection per worker
//! - Optional background thread sweeping expired records
//! - Commands routed through Engine

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
