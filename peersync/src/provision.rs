//! Provisioning Orchestrator
//!
//! Sequences the components for adding and removing a peer. Up to the first
//! durable write every failure is clean: nothing has been touched. After
//! that the gateway configuration is the commit point; a later failure is
//! reported as a partial success naming what was already written.
//!
//! Config and registry are two files, so there is no atomic commit across
//! them. The gateway lock keeps concurrent invocations out; a crash or write
//! failure between the two replaces leaves them diverged, which
//! [`Provisioner::check`] reports.

use crate::allocator::{next_host_suffix, AddressPlan};
use crate::block::{BlockEditor, PeerBlock};
use crate::config::GatewayConfig;
use crate::document::ConfigDocument;
use crate::error::{PeerSyncError, PeerSyncResult, Store};
use crate::keys::{KeyGenerator, X25519KeyGenerator};
use crate::live::{LiveInterface, LivePeer, SyncOutcome, WgCommand};
use crate::lock::GatewayLock;
use crate::profile::{ClientProfile, FileProfileSink, ProfileSink, DEFAULT_LISTEN_PORT};
use crate::registry::{PeerRecord, Registry};
use crate::storage::{DocumentStore, FileStore};
use crate::validation::validate_peer_name;
use serde::Serialize;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of a successful add
#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    /// Registry row written for the peer
    pub record: PeerRecord,
    /// IPv6 address carrying the same suffix
    pub ipv6: Ipv6Addr,
    /// Where the client profile went
    pub profile: String,
    /// Live interface result
    pub live: SyncOutcome,
}

/// Result of a successful remove
#[derive(Debug, Clone, Serialize)]
pub struct RemoveOutcome {
    /// Registry row that was deleted
    pub record: PeerRecord,
    /// Whether a config block was found and removed
    pub block_removed: bool,
    /// Live interface result
    pub live: SyncOutcome,
}

/// Cross-store consistency report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Registered peers without a config block
    pub missing_blocks: Vec<String>,
    /// Config blocks without a registry row
    pub unregistered_blocks: Vec<String>,
    /// Names with more than one config block
    pub duplicate_blocks: Vec<String>,
}

impl ConsistencyReport {
    /// True when registry and config agree
    pub fn is_consistent(&self) -> bool {
        self.missing_blocks.is_empty()
            && self.unregistered_blocks.is_empty()
            && self.duplicate_blocks.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct ClientSettings {
    endpoint: Option<String>,
    dns: Vec<String>,
    allowed_ips: Vec<String>,
}

/// Peer provisioning orchestrator
pub struct Provisioner {
    config_store: Arc<dyn DocumentStore>,
    registry_store: Arc<dyn DocumentStore>,
    live: Arc<dyn LiveInterface>,
    keys: Arc<dyn KeyGenerator>,
    profiles: Arc<dyn ProfileSink>,
    plan: AddressPlan,
    client: ClientSettings,
    lock: Option<(PathBuf, Duration)>,
    editor: BlockEditor,
}

impl Provisioner {
    /// Create orchestrator from explicit collaborators
    pub fn new(
        plan: AddressPlan,
        config_store: Arc<dyn DocumentStore>,
        registry_store: Arc<dyn DocumentStore>,
        live: Arc<dyn LiveInterface>,
        keys: Arc<dyn KeyGenerator>,
        profiles: Arc<dyn ProfileSink>,
    ) -> Self {
        Self {
            config_store,
            registry_store,
            live,
            keys,
            profiles,
            plan,
            client: ClientSettings {
                endpoint: None,
                dns: Vec::new(),
                allowed_ips: vec!["0.0.0.0/0".into(), "::/0".into()],
            },
            lock: None,
            editor: BlockEditor::new(),
        }
    }

    /// Production wiring for a gateway
    pub fn from_config(config: &GatewayConfig) -> PeerSyncResult<Self> {
        config.validate()?;
        let live = WgCommand::new(&config.interface, config.command_timeout())
            .with_command(config.wg_command.clone());

        Ok(Self::new(
            config.address_plan()?,
            Arc::new(FileStore::new(config.config_file())),
            Arc::new(FileStore::new(&config.registry_path)),
            Arc::new(live),
            Arc::new(X25519KeyGenerator),
            Arc::new(FileProfileSink::new(&config.clients_dir, &config.interface)),
        )
        .with_lock(config.lock_path.clone(), config.lock_timeout())
        .with_client_settings(
            config.endpoint.clone(),
            config.client_dns.clone(),
            config.client_allowed_ips.clone(),
        ))
    }

    /// Hold an advisory lock on `path` during mutations
    pub fn with_lock(mut self, path: PathBuf, timeout: Duration) -> Self {
        self.lock = Some((path, timeout));
        self
    }

    /// Settings written into client profiles
    pub fn with_client_settings(
        mut self,
        endpoint: Option<String>,
        dns: Vec<String>,
        allowed_ips: Vec<String>,
    ) -> Self {
        self.client = ClientSettings {
            endpoint,
            dns,
            allowed_ips,
        };
        self
    }

    async fn acquire_lock(&self) -> PeerSyncResult<Option<GatewayLock>> {
        match &self.lock {
            Some((path, timeout)) => Ok(Some(GatewayLock::acquire(path, *timeout).await?)),
            None => Ok(None),
        }
    }

    /// Provision a new peer.
    pub async fn add(&self, name: &str) -> PeerSyncResult<AddOutcome> {
        validate_peer_name(name)?;
        let _lock = self.acquire_lock().await?;

        let document = ConfigDocument::load(self.config_store.as_ref())?;
        let mut registry = Registry::load(self.registry_store.as_ref())?;
        if registry.exists(name) || document.has_marker(name) {
            return Err(PeerSyncError::DuplicateName(name.to_string()));
        }

        let suffix = next_host_suffix(&document, &self.plan)?;
        let ipv4 = self.plan.ipv4(suffix);
        let ipv6 = self.plan.ipv6(suffix);

        let server_private_key = document.interface_value("PrivateKey").ok_or_else(|| {
            PeerSyncError::Key(format!(
                "no PrivateKey in the [Interface] section of {}",
                self.config_store.location()
            ))
        })?;
        let server_public_key = self.keys.public_key(server_private_key)?;
        let listen_port = document
            .interface_value("ListenPort")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_LISTEN_PORT);
        let keys = self.keys.generate()?;

        let block = PeerBlock {
            name,
            public_key: &keys.public_key,
            preshared_key: &keys.preshared_key,
            ipv4,
            ipv6,
        };
        self.editor
            .append_block(document, &block)
            .save(self.config_store.as_ref())?;
        info!("Added peer {} ({}) to {}", name, ipv4, self.config_store.location());

        let record = PeerRecord::new(name, keys.public_key.clone(), ipv4);
        registry.insert(record.clone())?;
        registry
            .save(self.registry_store.as_ref())
            .map_err(|e| PeerSyncError::Inconsistent {
                name: name.to_string(),
                committed: Store::Config,
                source: Box::new(e),
            })?;
        info!("Registered peer {} in {}", name, self.registry_store.location());

        let live = self
            .live
            .apply(&LivePeer {
                public_key: &keys.public_key,
                preshared_key: &keys.preshared_key,
                ipv4,
                ipv6,
            })
            .await;
        log_live(name, &live);

        let profile = ClientProfile {
            name: name.to_string(),
            private_key: keys.private_key,
            preshared_key: keys.preshared_key,
            ipv4,
            ipv6,
            server_public_key,
            endpoint: self.endpoint(listen_port),
            dns: self.client.dns.clone(),
            allowed_ips: self.client.allowed_ips.clone(),
        };
        if profile.endpoint.is_none() {
            warn!("No endpoint configured, client profile for {} has no Endpoint line", name);
        }
        let location = self
            .profiles
            .emit(&profile)
            .map_err(|e| PeerSyncError::Profile {
                name: name.to_string(),
                source: Box::new(e),
            })?;

        Ok(AddOutcome {
            record,
            ipv6,
            profile: location,
            live,
        })
    }

    /// Decommission a peer.
    pub async fn remove(&self, name: &str) -> PeerSyncResult<RemoveOutcome> {
        validate_peer_name(name)?;
        let _lock = self.acquire_lock().await?;

        let mut registry = Registry::load(self.registry_store.as_ref())?;
        let record = registry
            .get(name)
            .cloned()
            .ok_or_else(|| PeerSyncError::PeerNotFound(name.to_string()))?;
        let document = ConfigDocument::load(self.config_store.as_ref())?;

        let live = self.live.retract(&record.public_key).await;
        log_live(name, &live);

        let removal = self.editor.remove_block(document, name);
        if removal.found {
            if !removal.terminated {
                warn!(
                    "Block for {} had no AllowedIPs line, removed through end of {}",
                    name,
                    self.config_store.location()
                );
            }
            removal.document.save(self.config_store.as_ref())?;
            info!("Removed peer {} from {}", name, self.config_store.location());
        } else {
            warn!("No config block for {} in {}", name, self.config_store.location());
        }

        registry.remove(name);
        registry
            .save(self.registry_store.as_ref())
            .map_err(|e| {
                if removal.found {
                    PeerSyncError::Inconsistent {
                        name: name.to_string(),
                        committed: Store::Config,
                        source: Box::new(e),
                    }
                } else {
                    e
                }
            })?;
        info!("Unregistered peer {} from {}", name, self.registry_store.location());

        if let Err(e) = self.profiles.discard(name) {
            warn!("Could not delete client profile of {}: {}", name, e);
        }

        Ok(RemoveOutcome {
            record,
            block_removed: removal.found,
            live,
        })
    }

    /// Registered peers in append order
    pub fn list(&self) -> PeerSyncResult<Vec<PeerRecord>> {
        Ok(Registry::load(self.registry_store.as_ref())?.records().to_vec())
    }

    /// Compare registry and config
    pub fn check(&self) -> PeerSyncResult<ConsistencyReport> {
        let document = ConfigDocument::load(self.config_store.as_ref())?;
        let registry = Registry::load(self.registry_store.as_ref())?;
        let blocks = document.peer_names();

        let mut report = ConsistencyReport::default();
        for record in registry.records() {
            if !blocks.contains(&record.name.as_str()) {
                report.missing_blocks.push(record.name.clone());
            }
        }
        for (i, name) in blocks.iter().enumerate() {
            if !registry.exists(name) && !report.unregistered_blocks.iter().any(|n| n == name) {
                report.unregistered_blocks.push(name.to_string());
            }
            if blocks[..i].contains(name) && !report.duplicate_blocks.iter().any(|n| n == name) {
                report.duplicate_blocks.push(name.to_string());
            }
        }
        Ok(report)
    }

    fn endpoint(&self, port: u16) -> Option<String> {
        let host = self.client.endpoint.as_deref()?;
        if host.parse::<SocketAddr>().is_ok() {
            return Some(host.to_string());
        }
        Some(match host.parse::<Ipv6Addr>() {
            Ok(v6) => format!("[{v6}]:{port}"),
            Err(_) if host.contains(':') => host.to_string(),
            Err(_) => format!("{host}:{port}"),
        })
    }
}

fn log_live(name: &str, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Applied => info!("Live interface updated for {}", name),
        SyncOutcome::Skipped { reason } => info!("Live update for {} skipped: {}", name, reason),
        SyncOutcome::Warned {
            reason,
            remediation,
        } => warn!(
            "Live update for {} failed: {}; run `{}` to resync",
            name, reason, remediation
        ),
    }
}
