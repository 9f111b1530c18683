//! Error types for wgpeer

use crate::validation::NameError;
use std::path::PathBuf;
use thiserror::Error;

/// Which durable store an operation had already committed when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    /// Gateway configuration document
    Config,
    /// Peer registry
    Registry,
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Config => f.write_str("gateway configuration"),
            Store::Registry => f.write_str("peer registry"),
        }
    }
}

/// wgpeer error type
#[derive(Debug, Error)]
pub enum PeerSyncError {
    /// Peer name rejected by the validator
    #[error("invalid peer name: {0}")]
    InvalidName(#[from] NameError),

    /// Peer already present
    #[error("peer '{0}' already exists")]
    DuplicateName(String),

    /// Peer absent from the registry
    #[error("peer '{0}' not found")]
    PeerNotFound(String),

    /// No host suffix left in the /24
    #[error("address space exhausted: no free host address left in {network}")]
    AddressSpaceExhausted {
        /// The exhausted IPv4 network
        network: String,
    },

    /// Reading a store failed
    #[error("failed to read {}: {source}", path.display())]
    Load {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing a store failed
    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Registry file does not parse
    #[error("malformed registry at line {line}: {reason}")]
    MalformedRegistry {
        /// 1-based line number
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Gateway or tool configuration problem
    #[error("config error: {0}")]
    Config(String),

    /// Key material could not be produced or derived
    #[error("key error: {0}")]
    Key(String),

    /// Another invocation holds the gateway lock
    #[error("gateway is locked by another invocation: {}", path.display())]
    Locked {
        /// Lock file
        path: PathBuf,
    },

    /// One store was committed and the other was not
    #[error("{committed} was updated for peer '{name}' but the follow-up write failed, stores now diverge: {source}")]
    Inconsistent {
        /// Peer being provisioned or removed
        name: String,
        /// Store that already holds the new state
        committed: Store,
        /// The failure on the second store
        #[source]
        source: Box<PeerSyncError>,
    },

    /// Peer is provisioned but the client profile was not emitted
    #[error("peer '{name}' was provisioned but its client profile could not be written: {source}")]
    Profile {
        /// Provisioned peer
        name: String,
        /// Underlying failure
        #[source]
        source: Box<PeerSyncError>,
    },
}

impl PeerSyncError {
    /// True when the failure left durable state behind (partial success).
    pub fn is_partial(&self) -> bool {
        matches!(self, PeerSyncError::Inconsistent { .. } | PeerSyncError::Profile { .. })
    }
}

/// Result type for wgpeer
pub type PeerSyncResult<T> = Result<T, PeerSyncError>;
