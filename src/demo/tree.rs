//! In-memory tree with a small Newick reader.
//!
//! Grammar (subset): `tree := node ';'?`, `node := ('(' node (',' node)* ')')? label? (':' length)?`.
//! Unlabelled nodes get generated ids `#<slot>` (preorder slot, root is `#0`).
//! Duplicate labels are rejected (ids must be unique to be restorable).

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

use crate::host::{NodeRef, NodeRegistry};
use crate::key::NodeId;

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub length: Option<f64>,
    pub collapsed: bool,
}

/// Node table; index 0 is the root when the tree is non-empty.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    by_id: HashMap<NodeId, usize>,
}

impl Tree {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse_newick(src: &str) -> Result<Self> {
        let mut p = Parser {
            s: src.as_bytes(),
            pos: 0,
            tree: Tree::empty(),
        };
        p.skip_ws();
        if p.peek().is_none() {
            bail!("newick: empty input");
        }
        p.parse_nodes()?;
        p.skip_ws();
        if p.peek() == Some(b';') {
            p.pos += 1;
            p.skip_ws();
        }
        if p.pos != p.s.len() {
            bail!("newick: trailing input at byte {}", p.pos);
        }
        Ok(p.tree)
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_at(&self, slot: usize) -> Option<&TreeNode> {
        self.nodes.get(slot)
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flip the collapsed flag of a node. Returns the new value.
    pub fn toggle_collapsed(&mut self, id: &NodeId) -> Option<bool> {
        let i = self.index_of(id)?;
        let n = &mut self.nodes[i];
        n.collapsed = !n.collapsed;
        Some(n.collapsed)
    }

    /// Visible leaves and collapsed node ids below `from` (collapsed subtrees
    /// count as one leaf and are not descended into).
    pub fn visible_summary(&self, from: usize) -> (usize, Vec<NodeId>) {
        let mut leaves = 0usize;
        let mut collapsed = Vec::new();
        let mut stack = vec![from];
        while let Some(i) = stack.pop() {
            let n = &self.nodes[i];
            if n.collapsed && i != from {
                collapsed.push(n.id.clone());
                leaves += 1;
                continue;
            }
            if n.children.is_empty() {
                leaves += 1;
            } else {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        collapsed.sort();
        (leaves, collapsed)
    }
}

impl NodeRegistry for Tree {
    fn lookup(&self, id: &NodeId) -> Option<NodeRef> {
        self.index_of(id).map(|slot| NodeRef {
            id: id.clone(),
            slot,
        })
    }
}

struct Parser<'a> {
    s: &'a [u8],
    pos: usize,
    tree: Tree,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Iterative descent: `open` holds nodes whose '(' is not closed yet,
    /// so nesting depth is bounded by memory, not by the call stack.
    fn parse_nodes(&mut self) -> Result<()> {
        let mut open: Vec<usize> = Vec::new();
        'node: loop {
            self.skip_ws();
            let idx = self.start_node(open.last().copied());
            if self.peek() == Some(b'(') {
                self.pos += 1;
                open.push(idx);
                continue;
            }
            self.finish_node(idx)?;

            while let Some(&top) = open.last() {
                self.skip_ws();
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        continue 'node;
                    }
                    Some(b')') => {
                        self.pos += 1;
                        open.pop();
                        self.finish_node(top)?;
                    }
                    Some(c) => bail!("newick: unexpected '{}' at byte {}", c as char, self.pos),
                    None => bail!("newick: unbalanced '('"),
                }
            }
            return Ok(());
        }
    }

    // preorder: слот резервируется до детей, чтобы корень был нулевым
    fn start_node(&mut self, parent: Option<usize>) -> usize {
        let idx = self.tree.nodes.len();
        self.tree.nodes.push(TreeNode {
            id: NodeId::from(""),
            parent,
            children: Vec::new(),
            length: None,
            collapsed: false,
        });
        if let Some(p) = parent {
            self.tree.nodes[p].children.push(idx);
        }
        idx
    }

    // label and length follow the node (after ')' for inner nodes)
    fn finish_node(&mut self, idx: usize) -> Result<()> {
        let label = self.label();
        let length = self.length()?;

        let id = if label.is_empty() {
            NodeId::new(format!("#{}", idx))
        } else {
            NodeId::new(label)
        };
        if self.tree.by_id.contains_key(&id) {
            bail!("newick: duplicate node label '{}'", id);
        }
        self.tree.by_id.insert(id.clone(), idx);
        let n = &mut self.tree.nodes[idx];
        n.id = id;
        n.length = length;
        Ok(())
    }

    fn label(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, b'(' | b')' | b',' | b';' | b':') {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.s[start..self.pos]).trim().to_string()
    }

    fn length(&mut self) -> Result<Option<f64>> {
        self.skip_ws();
        if self.peek() != Some(b':') {
            return Ok(None);
        }
        self.pos += 1;
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E' | b'+' | b'-'))
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.s[start..self.pos])?;
        let v = text
            .parse::<f64>()
            .map_err(|_| anyhow!("newick: bad branch length '{}' at byte {}", text, start))?;
        Ok(Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_structure() -> Result<()> {
        let t = Tree::parse_newick("((a,b)n1,(c,d)n5)root;")?;
        assert_eq!(t.len(), 7);
        assert_eq!(t.root().unwrap().id.as_str(), "root");
        let n5 = t.get(&NodeId::from("n5")).unwrap();
        assert_eq!(n5.children.len(), 2);
        assert_eq!(t.node_at(n5.parent.unwrap()).unwrap().id.as_str(), "root");
        Ok(())
    }

    #[test]
    fn anonymous_nodes_and_lengths() -> Result<()> {
        let t = Tree::parse_newick("(A:0.1,B:0.2,(C:0.3,D:0.4):0.5);")?;
        assert_eq!(t.root().unwrap().id.as_str(), "#0");
        assert_eq!(t.get(&NodeId::from("#3")).unwrap().length, Some(0.5));
        assert_eq!(t.get(&NodeId::from("D")).unwrap().length, Some(0.4));
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(Tree::parse_newick("").is_err());
        assert!(Tree::parse_newick("((a,b)").is_err());
        assert!(Tree::parse_newick("(a,a)r;").is_err());
        assert!(Tree::parse_newick("(a,b)r; extra").is_err());
        assert!(Tree::parse_newick("(a:x,b)r;").is_err());
    }

    #[test]
    fn collapsed_subtree_counts_as_one_leaf() -> Result<()> {
        let mut t = Tree::parse_newick("((a,b)n1,(c,d)n5)root;")?;
        assert_eq!(t.visible_summary(0), (4, vec![]));
        assert_eq!(t.toggle_collapsed(&NodeId::from("n1")), Some(true));
        assert_eq!(t.visible_summary(0), (3, vec![NodeId::from("n1")]));
        // collapsed root of the view is still drawn expanded
        let n1 = t.index_of(&NodeId::from("n1")).unwrap();
        assert_eq!(t.visible_summary(n1), (2, vec![]));
        Ok(())
    }

    #[test]
    fn deep_nesting_does_not_overflow() -> Result<()> {
        let depth = 100_000;
        let src = format!("{}a{};", "(".repeat(depth), ")".repeat(depth));
        let t = Tree::parse_newick(&src)?;
        assert_eq!(t.len(), depth + 1);
        assert_eq!(t.root().unwrap().id.as_str(), "#0");
        let leaf = t.get(&NodeId::from("a")).unwrap();
        assert_eq!(leaf.parent, Some(depth - 1));
        assert_eq!(t.visible_summary(0), (1, vec![]));

        let unbalanced = format!("{}a{};", "(".repeat(depth), ")".repeat(depth - 1));
        assert!(Tree::parse_newick(&unbalanced).is_err());
        Ok(())
    }

    #[test]
    fn registry_lookup() -> Result<()> {
        let t = Tree::parse_newick("(x,y)r;")?;
        let r = t.lookup(&NodeId::from("y")).unwrap();
        assert_eq!(r.slot, 2);
        assert!(t.lookup(&NodeId::from("zz")).is_none());
        Ok(())
    }
}
