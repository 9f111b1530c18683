//! Gateway configuration document
//!
//! The configuration is kept as the exact sequence of lines read from disk so
//! that everything outside an edited peer block is written back untouched.

use crate::error::{PeerSyncError, PeerSyncResult};
use crate::storage::DocumentStore;

/// Prefix of the comment line that anchors a peer block.
pub const MARKER_PREFIX: &str = "# peer_name=";

/// Gateway configuration as an ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl ConfigDocument {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        let trailing_newline = text.ends_with('\n');
        let body = if trailing_newline {
            &text[..text.len() - 1]
        } else {
            text
        };
        Self {
            lines: body.split('\n').map(String::from).collect(),
            trailing_newline,
        }
    }

    /// Build a document from lines. The rendered text ends with a newline.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let trailing_newline = !lines.is_empty();
        Self { lines, trailing_newline }
    }

    /// Load from a store. The gateway configuration must already exist.
    pub fn load(store: &dyn DocumentStore) -> PeerSyncResult<Self> {
        store.load()?.map(|text| Self::parse(&text)).ok_or_else(|| {
            PeerSyncError::Config(format!(
                "gateway configuration {} does not exist",
                store.location()
            ))
        })
    }

    /// Persist to a store.
    pub fn save(&self, store: &dyn DocumentStore) -> PeerSyncResult<()> {
        store.persist(&self.render())
    }

    /// Render back to text.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// All lines, in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether the document has no lines at all
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append a line. The trailing newline flag is left as it was, so a
    /// pushed empty line terminates a document that had no final newline.
    pub(crate) fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Same document with other lines. `trailing_newline` can only drop the
    /// final newline, never add one.
    pub(crate) fn with_lines(&self, lines: Vec<String>, trailing_newline: bool) -> Self {
        Self {
            trailing_newline: trailing_newline && self.trailing_newline && !lines.is_empty(),
            lines,
        }
    }

    /// Value of `key` inside the `[Interface]` section.
    ///
    /// The section ends at the first `[Peer]` header or marker comment.
    pub fn interface_value(&self, key: &str) -> Option<&str> {
        let mut in_interface = false;
        for line in &self.lines {
            let trimmed = line.trim();
            if trimmed.starts_with(MARKER_PREFIX) {
                break;
            }
            if trimmed.starts_with('[') {
                if in_interface {
                    break;
                }
                in_interface = trimmed.eq_ignore_ascii_case("[Interface]");
                continue;
            }
            if !in_interface {
                continue;
            }
            if let Some((k, v)) = trimmed.split_once('=') {
                if k.trim() == key {
                    return Some(v.trim());
                }
            }
        }
        None
    }

    /// Names carried by marker comments, in document order.
    pub fn peer_names(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| line.strip_prefix(MARKER_PREFIX))
            .collect()
    }

    /// Whether a marker comment for `name` exists.
    pub fn has_marker(&self, name: &str) -> bool {
        let marker = marker_line(name);
        self.lines.iter().any(|line| *line == marker)
    }
}

/// Marker comment line for `name`.
pub fn marker_line(name: &str) -> String {
    format!("{MARKER_PREFIX}{name}")
}
