//! Snapshot identity: (node id, render mode).
//!
//! Два ключа равны тогда и только тогда, когда совпадают оба поля.
//! NodeId/RenderMode: тонкие обёртки над String, чтобы не путать их местами.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node (branch) in the host tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render mode tag of the host (layout algorithm: "rectangular", "circular", ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderMode(String);

impl RenderMode {
    pub fn new<S: Into<String>>(mode: S) -> Self {
        Self(mode.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RenderMode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RenderMode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a snapshot. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    node_id: NodeId,
    render_mode: RenderMode,
}

impl SnapshotKey {
    pub fn new(node_id: impl Into<NodeId>, render_mode: impl Into<RenderMode>) -> Self {
        Self {
            node_id: node_id.into(),
            render_mode: render_mode.into(),
        }
    }

    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[inline]
    pub fn render_mode(&self) -> &RenderMode {
        &self.render_mode
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node_id, self.render_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equal_iff_both_fields_match() {
        let a = SnapshotKey::new("n1", "rectangular");
        assert_eq!(a, SnapshotKey::new("n1", "rectangular"));
        assert_ne!(a, SnapshotKey::new("n1", "circular"));
        assert_ne!(a, SnapshotKey::new("n2", "rectangular"));
    }

    #[test]
    fn comparison_is_exact() {
        // без нормализации регистра/пробелов
        assert_ne!(
            SnapshotKey::new("N1", "rectangular"),
            SnapshotKey::new("n1", "rectangular")
        );
        assert_ne!(
            SnapshotKey::new("n1", "rectangular "),
            SnapshotKey::new("n1", "rectangular")
        );
    }

    #[test]
    fn hash_agrees_with_eq() {
        let mut set = HashSet::new();
        set.insert(SnapshotKey::new("root", "radial"));
        set.insert(SnapshotKey::new("root", "radial"));
        set.insert(SnapshotKey::new("root", "diagonal"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_joins_fields() {
        let k = SnapshotKey::new("n5", "circular");
        assert_eq!(k.to_string(), "n5@circular");
    }
}
