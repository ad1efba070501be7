//! Error types for talking to a kea control channel.
//!
//! Transport failures (socket, HTTP, timeouts, undecodable replies) are kept
//! apart from failures reported by kea itself so the poller can tell a dead
//! target from a daemon that rejected a command.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Top-level error type for the kea-client crate.
#[derive(Debug, Error)]
pub enum ClientError {
    /// target string is neither a URL nor a usable socket path
    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget {
        /// target as given
        target: String,
        /// what is wrong with it
        reason: String,
    },

    /// unix socket connect/read/write failure
    #[error("socket error on {}: {source}", .path.display())]
    Socket {
        /// socket path
        path: PathBuf,
        /// underlying error
        source: std::io::Error,
    },

    /// HTTP request or TLS setup failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// reading a certificate or key file failed
    #[error("failed to read {}: {source}", .path.display())]
    File {
        /// file path
        path: PathBuf,
        /// underlying error
        source: std::io::Error,
    },

    /// no reply within the request timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// reply was not the JSON we expected
    #[error("failed to decode reply: {0}")]
    Decode(#[from] serde_json::Error),

    /// kea answered with a non-zero result code
    #[error("command {command:?} failed with result {result}: {text}")]
    Command {
        /// command name
        command: String,
        /// kea result code
        result: i64,
        /// kea's explanation
        text: String,
    },

    /// the target has no DHCPv4 or DHCPv6 daemon behind it
    #[error("no dhcp4/dhcp6 configuration found")]
    NoDhcpConfig,

    /// statistics were requested before any configuration was loaded
    #[error("configuration not loaded yet")]
    NotLoaded,
}

impl ClientError {
    /// Returns true if kea itself rejected the command, as opposed to the
    /// request never completing.
    pub fn is_command(&self) -> bool {
        matches!(self, ClientError::Command { .. })
    }

    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Timeout(_) => true,
            ClientError::Http(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Shorthand result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
