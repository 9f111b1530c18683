//! wgpeer - Gateway Peer Configuration Synchronizer
//!
//! Provisions and decommissions peers on a single WireGuard gateway while
//! keeping three stores in step: the gateway configuration file, the peer
//! registry, and (best-effort) the running interface.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PROVISIONING ORCHESTRATOR                       │
//! │        validate → allocate → config edit → registry edit → live        │
//! └──────┬──────────────┬──────────────┬──────────────┬──────────────┬──────┘
//!        │              │              │              │              │
//!  ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐
//!  │   Name    │  │  Address  │  │  Config   │  │ Registry  │  │   Live    │
//!  │ Validator │  │ Allocator │  │  Block    │  │   Store   │  │ Interface │
//!  │           │  │           │  │  Editor   │  │           │  │   Sync    │
//!  └───────────┘  └───────────┘  └─────┬─────┘  └─────┬─────┘  └───────────┘
//!                                      │              │
//!                               ┌──────▼──────────────▼──────┐
//!                               │  Storage port (atomic fs)  │
//!                               └────────────────────────────┘
//! ```
//!
//! The config editor and the registry never call each other; keeping them
//! consistent is the job of [`provision::Provisioner`].

#![warn(missing_docs)]

pub mod allocator;
pub mod block;
pub mod config;
pub mod document;
pub mod error;
pub mod keys;
pub mod live;
pub mod lock;
pub mod profile;
pub mod provision;
pub mod registry;
pub mod storage;
pub mod validation;

pub use allocator::{next_host_suffix, AddressPlan};
pub use config::GatewayConfig;
pub use document::ConfigDocument;
pub use error::{PeerSyncError, PeerSyncResult};
pub use keys::{ClientKeys, KeyGenerator, X25519KeyGenerator};
pub use live::{LiveInterface, LivePeer, SyncOutcome, WgCommand};
pub use lock::GatewayLock;
pub use profile::{ClientProfile, FileProfileSink, ProfileSink};
pub use provision::{AddOutcome, ConsistencyReport, Provisioner, RemoveOutcome};
pub use registry::{PeerRecord, Registry};
pub use storage::{DocumentStore, FileStore, MemoryStore};
pub use validation::{validate_peer_name, NameError};
