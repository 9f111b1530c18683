//! Peer registry
//!
//! CSV table with a fixed header row and one row per peer, in the order the
//! peers were added:
//!
//! ```text
//! name,public_key,ip
//! alice,pQ0mSu...=,10.2.53.2
//! ```

use crate::error::{PeerSyncError, PeerSyncResult};
use crate::storage::DocumentStore;
use serde::Serialize;
use std::net::Ipv4Addr;

/// Header row of the registry file
pub const HEADER: &str = "name,public_key,ip";

/// One provisioned peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerRecord {
    /// Unique peer name
    pub name: String,
    /// Client public key (opaque base64)
    pub public_key: String,
    /// Allocated IPv4 address
    pub ip: Ipv4Addr,
}

impl PeerRecord {
    /// Create record
    pub fn new(name: impl Into<String>, public_key: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            ip,
        }
    }

    /// Host suffix (last octet of the IPv4 address)
    pub fn host_suffix(&self) -> u8 {
        self.ip.octets()[3]
    }

    fn to_row(&self) -> String {
        format!("{},{},{}", self.name, self.public_key, self.ip)
    }

    fn from_row(row: &str, line: usize) -> PeerSyncResult<Self> {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        let &[name, public_key, ip] = fields.as_slice() else {
            return Err(PeerSyncError::MalformedRegistry {
                line,
                reason: format!("expected 3 fields, found {}", fields.len()),
            });
        };
        if name.is_empty() {
            return Err(PeerSyncError::MalformedRegistry {
                line,
                reason: "empty name".into(),
            });
        }
        let ip = ip.parse().map_err(|_| PeerSyncError::MalformedRegistry {
            line,
            reason: format!("invalid ip {ip:?}"),
        })?;
        Ok(Self::new(name, public_key, ip))
    }
}

/// Ordered peer registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<PeerRecord>,
}

impl Registry {
    /// Parse registry text. Blank lines are ignored.
    pub fn parse(text: &str) -> PeerSyncResult<Self> {
        let mut rows = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((line, header)) = rows.next() else {
            return Ok(Self::default());
        };
        if header.trim() != HEADER {
            return Err(PeerSyncError::MalformedRegistry {
                line,
                reason: format!("expected header {HEADER:?}"),
            });
        }

        let mut registry = Self::default();
        for (line, row) in rows {
            let record = PeerRecord::from_row(row, line)?;
            if registry.exists(&record.name) {
                return Err(PeerSyncError::MalformedRegistry {
                    line,
                    reason: format!("duplicate peer {:?}", record.name),
                });
            }
            registry.records.push(record);
        }
        Ok(registry)
    }

    /// Render with header row.
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for record in &self.records {
            out.push_str(&record.to_row());
            out.push('\n');
        }
        out
    }

    /// Whether a peer named `name` exists
    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up a peer
    pub fn get(&self, name: &str) -> Option<&PeerRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// All peers in append order
    pub fn records(&self) -> &[PeerRecord] {
        &self.records
    }

    /// Append a peer.
    pub fn insert(&mut self, record: PeerRecord) -> PeerSyncResult<()> {
        if self.exists(&record.name) {
            return Err(PeerSyncError::DuplicateName(record.name));
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove a peer, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<PeerRecord> {
        let index = self.records.iter().position(|r| r.name == name)?;
        Some(self.records.remove(index))
    }

    /// Load from a store; an absent store is an empty registry.
    pub fn load(store: &dyn DocumentStore) -> PeerSyncResult<Self> {
        match store.load()? {
            Some(text) => Self::parse(&text),
            None => Ok(Self::default()),
        }
    }

    /// Persist to a store.
    pub fn save(&self, store: &dyn DocumentStore) -> PeerSyncResult<()> {
        store.persist(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn record(name: &str, suffix: u8) -> PeerRecord {
        PeerRecord::new(name, format!("{name}-key="), Ipv4Addr::new(10, 2, 53, suffix))
    }

    #[test]
    fn test_insert_and_render() {
        let mut registry = Registry::default();
        registry.insert(record("alice", 2)).unwrap();
        registry.insert(record("bob", 3)).unwrap();
        assert_eq!(
            registry.render(),
            "name,public_key,ip\nalice,alice-key=,10.2.53.2\nbob,bob-key=,10.2.53.3\n"
        );
        assert_eq!(Registry::parse(&registry.render()).unwrap(), registry);
    }

    #[test]
    fn test_duplicate_insert() {
        let mut registry = Registry::default();
        registry.insert(record("alice", 2)).unwrap();
        assert!(matches!(
            registry.insert(record("alice", 3)),
            Err(PeerSyncError::DuplicateName(name)) if name == "alice"
        ));
        assert_eq!(registry.records().len(), 1);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut registry = Registry::default();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            registry.insert(record(name, i as u8 + 2)).unwrap();
        }
        assert_eq!(registry.remove("b").map(|r| r.host_suffix()), Some(3));
        assert_eq!(registry.remove("b"), None);
        let names: Vec<_> = registry.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_header_is_not_a_peer() {
        let registry = Registry::parse("name,public_key,ip\n").unwrap();
        assert!(!registry.exists("name"));
        assert!(registry.records().is_empty());
    }

    #[test]
    fn test_malformed_rows() {
        assert!(matches!(
            Registry::parse("name,public_key,ip\nalice,key\n"),
            Err(PeerSyncError::MalformedRegistry { line: 2, .. })
        ));
        assert!(matches!(
            Registry::parse("name,public_key,ip\nalice,key,10.2.53.300\n"),
            Err(PeerSyncError::MalformedRegistry { line: 2, .. })
        ));
        assert!(matches!(
            Registry::parse("alice,key,10.2.53.2\n"),
            Err(PeerSyncError::MalformedRegistry { line: 1, .. })
        ));
    }

    #[test]
    fn test_absent_store_loads_empty() {
        let store = MemoryStore::new();
        let mut registry = Registry::load(&store).unwrap();
        registry.insert(record("alice", 2)).unwrap();
        registry.save(&store).unwrap();
        assert_eq!(
            store.contents().as_deref(),
            Some("name,public_key,ip\nalice,alice-key=,10.2.53.2\n")
        );
    }
}
