//! Error types for sgossh.

use std::io;
use thiserror::Error;

/// Main error type for sgossh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform definition errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// Whether this error means the session itself is unusable.
    ///
    /// Transport faults, closed channels and read timeouts all land here.
    /// These are never retried by the driver and should be surfaced to the
    /// caller as a connection failure.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Channel(ChannelError::InvalidPattern(_)) => false,
            Error::Channel(_) => true,
            Error::Driver(DriverError::NotConnected) => true,
            _ => false,
        }
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not present in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(std::time::Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, config mode, polling).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// The device rejected a single-shot command
    #[error("Command '{command}' rejected by device: {message}")]
    CommandRejected { command: String, message: String },

    /// A directive is malformed; nothing was sent
    #[error("Invalid directive at index {index}: {message}")]
    InvalidDirective { index: usize, message: String },

    /// The poller ran out of attempts with conditions still unmet
    #[error("One or more conditional statements have not been satisfied: {conditions:?}")]
    UnsatisfiedConditions { conditions: Vec<String> },

    /// A wait-for condition could not be parsed
    #[error("Invalid condition '{condition}': {message}")]
    InvalidCondition { condition: String, message: String },

    /// Repeated `exit` did not leave configuration mode
    #[error("Still in configuration mode after {depth} exit commands (prompt: '{prompt}')")]
    ConfigModeStuck { depth: usize, prompt: String },

    /// Failed to reach the enabled (`#`) prompt
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Invalid configuration in the driver builder or call options
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Platform definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },
}

/// Result type alias using sgossh's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_connection_failure_grouping() {
        let err: Error = TransportError::Disconnected.into();
        assert!(err.is_connection_failure());

        let err: Error = ChannelError::PatternTimeout(Duration::from_secs(1)).into();
        assert!(err.is_connection_failure());

        let err: Error = DriverError::UnsatisfiedConditions {
            conditions: vec!["result[0] contains foo".into()],
        }
        .into();
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn test_invalid_directive_message() {
        let err: Error = DriverError::InvalidDirective {
            index: 2,
            message: "1 prompt(s) but 0 answer(s)".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Driver error: Invalid directive at index 2: 1 prompt(s) but 0 answer(s)"
        );
    }
}
