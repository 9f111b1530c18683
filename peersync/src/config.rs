//! Gateway Configuration

use crate::allocator::AddressPlan;
use crate::error::{PeerSyncError, PeerSyncResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one gateway interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WireGuard interface name
    pub interface: String,
    /// Gateway configuration file, `/etc/wireguard/<interface>.conf` if unset
    pub config_path: Option<PathBuf>,
    /// Peer registry file
    pub registry_path: PathBuf,
    /// Advisory lock file
    pub lock_path: PathBuf,
    /// Directory receiving client profiles
    pub clients_dir: PathBuf,
    /// Peer IPv4 network, must be a /24
    pub ipv4_network: String,
    /// Peer IPv6 network
    pub ipv6_network: String,
    /// Public host clients connect to
    pub endpoint: Option<String>,
    /// DNS servers pushed to clients
    pub client_dns: Vec<String>,
    /// Routes clients send through the tunnel
    pub client_allowed_ips: Vec<String>,
    /// Command line used to invoke `wg`, e.g. `["sudo", "wg"]`
    pub wg_command: Vec<String>,
    /// Upper bound for every external command
    pub command_timeout_secs: u64,
    /// How long to wait for the gateway lock
    pub lock_timeout_secs: u64,
}

const WIREGUARD_DIR: &str = "/etc/wireguard";

impl Default for GatewayConfig {
    fn default() -> Self {
        let base = Path::new(WIREGUARD_DIR);
        Self {
            interface: "wg0".into(),
            config_path: None,
            registry_path: base.join("peers.csv"),
            lock_path: base.join(".wgpeer.lock"),
            clients_dir: base.join("clients"),
            ipv4_network: "10.2.53.0/24".into(),
            ipv6_network: "fd42:42:42::/64".into(),
            endpoint: None,
            client_dns: vec!["1.1.1.1".into(), "1.0.0.1".into()],
            client_allowed_ips: vec!["0.0.0.0/0".into(), "::/0".into()],
            wg_command: vec!["wg".into()],
            command_timeout_secs: 10,
            lock_timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    /// Parse TOML
    pub fn from_toml_str(text: &str) -> PeerSyncResult<Self> {
        toml::from_str(text).map_err(|e| PeerSyncError::Config(e.to_string()))
    }

    /// Load from file
    pub fn load(path: &Path) -> PeerSyncResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PeerSyncError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Gateway configuration file in effect
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| Path::new(WIREGUARD_DIR).join(format!("{}.conf", self.interface)))
    }

    /// Parsed address plan
    pub fn address_plan(&self) -> PeerSyncResult<AddressPlan> {
        AddressPlan::new(&self.ipv4_network, &self.ipv6_network)
    }

    /// External command timeout
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Lock wait timeout
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Check everything that can be checked without touching the gateway.
    pub fn validate(&self) -> PeerSyncResult<()> {
        if self.interface.is_empty()
            || !self
                .interface
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(PeerSyncError::Config(format!(
                "invalid interface name {:?}",
                self.interface
            )));
        }
        if self.wg_command.is_empty() {
            return Err(PeerSyncError::Config("wg_command must not be empty".into()));
        }
        if self.command_timeout_secs == 0 {
            return Err(PeerSyncError::Config("command_timeout_secs must be positive".into()));
        }
        self.address_plan().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GatewayConfig::from_toml_str(
            r#"
            interface = "wg1"
            endpoint = "vpn.example.com"
            ipv4_network = "10.9.0.0/24"
            "#,
        )
        .unwrap();

        assert_eq!(config.interface, "wg1");
        assert_eq!(config.endpoint.as_deref(), Some("vpn.example.com"));
        assert_eq!(config.registry_path, PathBuf::from("/etc/wireguard/peers.csv"));
        assert_eq!(config.command_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_follows_interface() {
        let config = GatewayConfig::from_toml_str("interface = \"wg7\"").unwrap();
        assert_eq!(config.config_file(), PathBuf::from("/etc/wireguard/wg7.conf"));

        let config = GatewayConfig::from_toml_str(
            "interface = \"wg7\"\nconfig_path = \"/srv/gw.conf\"",
        )
        .unwrap();
        assert_eq!(config.config_file(), PathBuf::from("/srv/gw.conf"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GatewayConfig {
            ipv4_network: "10.0.0.0/16".into(),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GatewayConfig {
            interface: "wg0; rm -rf /".into(),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(GatewayConfig::from_toml_str("interface = 3").is_err());
    }
}
