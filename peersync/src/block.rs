//! Peer block editing
//!
//! A peer block is the run of lines starting at its marker comment
//! (`# peer_name=<name>`) and ending at the first `AllowedIPs` line after it,
//! plus at most one blank separator line.
//!
//! Appending to a document without a final newline writes the block with no
//! separator after it; the block's last line ends the file instead. A tail
//! block without separator is therefore removed together with the final
//! newline, which makes append followed by remove an exact inverse.
//!
//! Removal is a single forward pass through a four-state machine:
//!
//! ```text
//!            marker(name)                 AllowedIPs =
//!  Normal ─────────────────► InBlock ─────────────────► JustPassedAllowed
//!    ▲                        │  ▲ any other line             │
//!    │                        └──┘ (discarded)                │
//!    ├──── blank line (discarded) ────────────────────────────┤
//!    └──── non-blank line (re-processed as Normal) ───────────┘
//! ```

use crate::document::{marker_line, ConfigDocument};
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Content of a peer block as written into the gateway configuration.
#[derive(Debug, Clone)]
pub struct PeerBlock<'a> {
    /// Peer name, carried by the marker comment
    pub name: &'a str,
    /// Client public key
    pub public_key: &'a str,
    /// Preshared key shared by gateway and client
    pub preshared_key: &'a str,
    /// Allocated IPv4 address
    pub ipv4: Ipv4Addr,
    /// Allocated IPv6 address
    pub ipv6: Ipv6Addr,
}

impl PeerBlock<'_> {
    /// Lines of the block, including the trailing blank separator.
    pub fn lines(&self) -> Vec<String> {
        vec![
            marker_line(self.name),
            "[Peer]".to_string(),
            format!("PublicKey = {}", self.public_key),
            format!("PresharedKey = {}", self.preshared_key),
            format!("AllowedIPs = {}/32,{}/128", self.ipv4, self.ipv6),
            String::new(),
        ]
    }
}

/// Result of removing a block.
#[derive(Debug, Clone)]
pub struct Removal {
    /// Document after removal
    pub document: ConfigDocument,
    /// Whether a marker for the peer was seen
    pub found: bool,
    /// False when the input ended before the block's `AllowedIPs` line
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Normal,
    InBlockBeforeAllowed,
    JustPassedAllowed,
}

/// Appends and removes peer blocks.
pub struct BlockEditor {
    allowed_ips: Regex,
}

impl BlockEditor {
    /// Create editor
    pub fn new() -> Self {
        Self {
            allowed_ips: Regex::new(r"^AllowedIPs\s*=").expect("static AllowedIPs pattern"),
        }
    }

    /// Whether `line` is an `AllowedIPs` assignment.
    pub fn is_allowed_ips(&self, line: &str) -> bool {
        self.allowed_ips.is_match(line)
    }

    /// Append a peer block at the end of the document.
    ///
    /// The block's blank separator supplies the final newline when the input
    /// had none, so removing the block again restores the input exactly.
    pub fn append_block(
        &self,
        mut document: ConfigDocument,
        block: &PeerBlock<'_>,
    ) -> ConfigDocument {
        for line in block.lines() {
            document.push_line(line);
        }
        document
    }

    /// Remove the block anchored by `name`.
    ///
    /// Without a matching marker the returned document equals the input.
    pub fn remove_block(&self, document: ConfigDocument, name: &str) -> Removal {
        let marker = marker_line(name);
        let mut kept = Vec::with_capacity(document.lines().len());
        let mut state = BlockState::Normal;
        let mut found = false;

        for line in document.lines() {
            if state == BlockState::JustPassedAllowed {
                state = BlockState::Normal;
                if line.trim().is_empty() {
                    continue;
                }
                // non-blank: falls through and is handled as Normal
            }

            match state {
                BlockState::Normal => {
                    if *line == marker {
                        found = true;
                        state = BlockState::InBlockBeforeAllowed;
                    } else {
                        kept.push(line.clone());
                    }
                }
                BlockState::InBlockBeforeAllowed => {
                    if self.is_allowed_ips(line) {
                        state = BlockState::JustPassedAllowed;
                    }
                }
                BlockState::JustPassedAllowed => unreachable!("handled before dispatch"),
            }
        }

        if !found {
            return Removal {
                document,
                found: false,
                terminated: true,
            };
        }

        let trailing_newline = state != BlockState::JustPassedAllowed;
        Removal {
            document: document.with_lines(kept, trailing_newline),
            found,
            terminated: state != BlockState::InBlockBeforeAllowed,
        }
    }
}

impl Default for BlockEditor {
    fn default() -> Self {
        Self::new()
    }
}
