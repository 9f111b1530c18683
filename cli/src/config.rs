//! Configuration lookup

use peersync::GatewayConfig;
use std::path::Path;

/// Used when neither `--config` nor `WGPEER_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/wgpeer/config.toml";

/// Locate, load and validate the gateway configuration.
pub fn resolve(
    explicit: Option<&Path>,
    interface: Option<String>,
) -> Result<GatewayConfig, String> {
    resolve_with_fallback(explicit, Path::new(DEFAULT_CONFIG_PATH), interface)
}

fn resolve_with_fallback(
    explicit: Option<&Path>,
    fallback: &Path,
    interface: Option<String>,
) -> Result<GatewayConfig, String> {
    let mut config = match explicit {
        Some(path) => GatewayConfig::load(path).map_err(|e| e.to_string())?,
        None if fallback.exists() => GatewayConfig::load(fallback).map_err(|e| e.to_string())?,
        None => {
            tracing::debug!("{} not found, using defaults", fallback.display());
            GatewayConfig::default()
        }
    };

    if let Some(interface) = interface {
        config.interface = interface;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_fallback_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_with_fallback(None, &dir.path().join("config.toml"), None).unwrap();
        assert_eq!(config.interface, "wg0");
    }

    #[test]
    fn test_interface_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "interface = \"wg1\"\nendpoint = \"vpn.example.com\"\n").unwrap();

        let config = resolve_with_fallback(None, &path, None).unwrap();
        assert_eq!(config.interface, "wg1");
        assert_eq!(config.config_file(), PathBuf::from("/etc/wireguard/wg1.conf"));

        let config =
            resolve_with_fallback(Some(&path), Path::new("/nonexistent"), Some("wg2".into()))
                .unwrap();
        assert_eq!(config.interface, "wg2");
        assert_eq!(config.endpoint.as_deref(), Some("vpn.example.com"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(resolve_with_fallback(Some(&missing), &missing, None).is_err());
    }

    #[test]
    fn test_invalid_interface_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("config.toml");
        assert!(resolve_with_fallback(None, &fallback, Some("wg0/../x".into())).is_err());
    }
}
