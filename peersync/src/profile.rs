//! Client profiles
//!
//! The profile is the client-side counterpart of a peer block: the client's
//! own key and address plus the gateway as its single peer. It holds the
//! client private key, so it is written owner-only like the gateway stores.

use crate::error::{PeerSyncError, PeerSyncResult};
use crate::storage::{DocumentStore, FileStore};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

/// Listen port assumed when the gateway config does not set one
pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// Rendered client configuration.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    /// Peer name
    pub name: String,
    /// Client private key
    pub private_key: String,
    /// Preshared key
    pub preshared_key: String,
    /// Client IPv4 address
    pub ipv4: Ipv4Addr,
    /// Client IPv6 address
    pub ipv6: Ipv6Addr,
    /// Gateway public key
    pub server_public_key: String,
    /// `host:port` of the gateway, if known
    pub endpoint: Option<String>,
    /// DNS servers
    pub dns: Vec<String>,
    /// Routes through the tunnel
    pub allowed_ips: Vec<String>,
}

impl ClientProfile {
    /// WireGuard configuration text for the client.
    pub fn render(&self) -> String {
        let mut out = format!(
            "[Interface]\nPrivateKey = {}\nAddress = {}/32,{}/128\n",
            self.private_key, self.ipv4, self.ipv6
        );
        if !self.dns.is_empty() {
            out.push_str(&format!("DNS = {}\n", self.dns.join(",")));
        }
        out.push_str(&format!(
            "\n[Peer]\nPublicKey = {}\nPresharedKey = {}\n",
            self.server_public_key, self.preshared_key
        ));
        if let Some(endpoint) = &self.endpoint {
            out.push_str(&format!("Endpoint = {endpoint}\n"));
        }
        out.push_str(&format!("AllowedIPs = {}\n", self.allowed_ips.join(",")));
        out
    }
}

/// Client profile emission collaborator.
pub trait ProfileSink: Send + Sync {
    /// Emit the profile, returning where it went.
    fn emit(&self, profile: &ClientProfile) -> PeerSyncResult<String>;

    /// Forget the profile of a removed peer. Missing profiles are not an error.
    fn discard(&self, name: &str) -> PeerSyncResult<()>;
}

/// Writes `<dir>/<interface>-client-<name>.conf`.
#[derive(Debug, Clone)]
pub struct FileProfileSink {
    dir: PathBuf,
    interface: String,
}

impl FileProfileSink {
    /// Sink writing into `dir`
    pub fn new(dir: impl Into<PathBuf>, interface: &str) -> Self {
        Self {
            dir: dir.into(),
            interface: interface.to_string(),
        }
    }

    /// Profile path for `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}-client-{}.conf", self.interface, name))
    }

    fn ensure_dir(&self) -> PeerSyncResult<()> {
        if self.dir.is_dir() {
            return Ok(());
        }
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.dir).map_err(|source| PeerSyncError::Persistence {
            path: self.dir.clone(),
            source,
        })
    }
}

impl ProfileSink for FileProfileSink {
    fn emit(&self, profile: &ClientProfile) -> PeerSyncResult<String> {
        self.ensure_dir()?;
        let path = self.path_for(&profile.name);
        FileStore::new(&path).persist(&profile.render())?;
        Ok(path.display().to_string())
    }

    fn discard(&self, name: &str) -> PeerSyncResult<()> {
        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PeerSyncError::Persistence { path, source }),
        }
    }
}
