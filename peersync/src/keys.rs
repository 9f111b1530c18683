//! Key material
//!
//! WireGuard keys are 32-byte Curve25519 values exchanged as base64 text.
//! The synchronizer treats them as opaque strings; only this module knows
//! how they are produced.

use crate::error::{PeerSyncError, PeerSyncResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;

/// Key triple issued to a new client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKeys {
    /// Client private key, only ever written to the client profile
    pub private_key: String,
    /// Client public key, stored in the gateway config and registry
    pub public_key: String,
    /// Preshared key shared by gateway and client
    pub preshared_key: String,
}

/// Key generation collaborator.
pub trait KeyGenerator: Send + Sync {
    /// Fresh client key triple
    fn generate(&self) -> PeerSyncResult<ClientKeys>;

    /// Public key belonging to a base64 private key
    fn public_key(&self, private_key: &str) -> PeerSyncResult<String>;
}

/// In-process X25519 key generator
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519KeyGenerator;

impl KeyGenerator for X25519KeyGenerator {
    fn generate(&self) -> PeerSyncResult<ClientKeys> {
        let private = x25519_dalek::StaticSecret::random_from_rng(rand::thread_rng());
        let public = x25519_dalek::PublicKey::from(&private);

        let mut preshared = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut preshared);

        Ok(ClientKeys {
            private_key: STANDARD.encode(private.as_bytes()),
            public_key: STANDARD.encode(public.as_bytes()),
            preshared_key: STANDARD.encode(preshared),
        })
    }

    fn public_key(&self, private_key: &str) -> PeerSyncResult<String> {
        let bytes = STANDARD
            .decode(private_key.trim())
            .map_err(|e| PeerSyncError::Key(format!("private key is not base64: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            PeerSyncError::Key(format!("private key must be 32 bytes, got {}", b.len()))
        })?;

        let private = x25519_dalek::StaticSecret::from(bytes);
        Ok(STANDARD.encode(x25519_dalek::PublicKey::from(&private).as_bytes()))
    }
}
