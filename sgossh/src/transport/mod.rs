//! Transport layer: the raw byte stream to the device.
//!
//! The driver only needs to write bytes and read whatever comes back, so
//! that is all [`Transport`] asks for. [`SshTransport`] is the production
//! implementation over a russh PTY shell.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;

use crate::error::Result;

/// Duplex byte stream to a device shell.
pub trait Transport: Send {
    /// Write raw bytes to the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` once the remote side has closed the stream.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Tear the connection down.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}
