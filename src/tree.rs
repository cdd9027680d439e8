//! In-memory command tree for block-indented configurations.
//!
//! A [`ConfigTree`] is an ordered tree of [`CommandLine`]s built once per
//! fetch or per desired-state specification and never mutated afterwards; a
//! new tree is built rather than an existing one edited, which keeps diff
//! computation pure.

use serde::{Deserialize, Serialize};

/// Default number of spaces per nesting level (single-space indentation, the
/// convention of IOS-style CLIs).
pub const DEFAULT_INDENT_UNIT: usize = 1;

/// A single configuration command with its nested children.
///
/// `text` is stored trimmed; nesting is carried by `depth` and re-rendered
/// from it. A line's depth always equals its parent's depth + 1; root lines
/// have depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    /// The command text, with leading indentation stripped
    pub text: String,
    /// Nesting depth (0 for root lines)
    pub depth: usize,
    /// Child commands, in source order
    pub children: Vec<CommandLine>,
}

impl CommandLine {
    /// Create a new command line with no children.
    pub fn new(text: impl Into<String>, depth: usize) -> Self {
        Self {
            text: text.into(),
            depth,
            children: Vec::new(),
        }
    }

    /// Render this line with its indentation restored.
    pub fn rendered(&self, indent_unit: usize) -> String {
        if self.depth == 0 {
            self.text.clone()
        } else {
            format!("{}{}", " ".repeat(self.depth * indent_unit), self.text)
        }
    }

    /// Flatten this subtree into rendered lines, pre-order (parent first,
    /// then children in order).
    pub fn flatten(&self, indent_unit: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.children.len());
        lines.push(self.rendered(indent_unit));
        for child in &self.children {
            lines.extend(child.flatten(indent_unit));
        }
        lines
    }

    /// Find a direct child by command text.
    pub fn find_child(&self, text: &str) -> Option<&CommandLine> {
        self.children.iter().find(|c| c.text == text.trim())
    }

    /// Total number of lines in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(CommandLine::subtree_len).sum::<usize>()
    }

    /// Structural equality of the whole subtree: text and all descendants,
    /// order-sensitive, ignoring depth offsets.
    pub fn same_subtree(&self, other: &CommandLine) -> bool {
        self.text == other.text
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.same_subtree(b))
    }
}

/// An ordered tree of configuration commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTree {
    /// Top-level commands, in source order
    pub roots: Vec<CommandLine>,
    /// Spaces per nesting level used when this tree was built
    pub indent_unit: usize,
}

impl ConfigTree {
    /// Create a tree from already-built roots.
    pub fn new(roots: Vec<CommandLine>, indent_unit: usize) -> Self {
        Self { roots, indent_unit }
    }

    /// Create an empty tree with the default indent unit.
    pub fn empty() -> Self {
        Self::new(Vec::new(), DEFAULT_INDENT_UNIT)
    }

    /// True if the tree holds no commands.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of command lines in the tree.
    pub fn len(&self) -> usize {
        self.roots.iter().map(CommandLine::subtree_len).sum()
    }

    /// Flatten the whole tree into rendered lines, pre-order.
    pub fn flatten(&self) -> Vec<String> {
        self.roots
            .iter()
            .flat_map(|r| r.flatten(self.indent_unit))
            .collect()
    }

    /// Render the tree back to configuration text.
    pub fn to_text(&self) -> String {
        self.flatten().join("\n")
    }

    /// Walk a parent path (e.g. `["router bgp 65000", "neighbor 1.1.1.1"]`)
    /// and return the innermost section, if present.
    pub fn find_section(&self, parents: &[String]) -> Option<&CommandLine> {
        let mut current: Option<&CommandLine> = None;
        for (i, parent) in parents.iter().enumerate() {
            let search_in = if i == 0 {
                &self.roots[..]
            } else {
                &current?.children[..]
            };
            current = search_in.iter().find(|n| n.text == parent.trim());
            current?;
        }
        current
    }

    /// Iterate over every command line in the tree, pre-order.
    pub fn iter_lines(&self) -> impl Iterator<Item = &CommandLine> {
        fn walk<'a>(node: &'a CommandLine, out: &mut Vec<&'a CommandLine>) {
            out.push(node);
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut all = Vec::new();
        for root in &self.roots {
            walk(root, &mut all);
        }
        all.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ConfigTree {
        let mut acl = CommandLine::new("ip access-list test", 0);
        acl.children
            .push(CommandLine::new("10 permit ip 1.1.1.1 any log", 1));
        acl.children
            .push(CommandLine::new("20 deny ip any any", 1));
        ConfigTree::new(
            vec![CommandLine::new("hostname R1", 0), acl],
            DEFAULT_INDENT_UNIT,
        )
    }

    #[test]
    fn test_rendered_restores_indentation() {
        let line = CommandLine::new("10 permit ip 1.1.1.1 any log", 2);
        assert_eq!(line.rendered(1), "  10 permit ip 1.1.1.1 any log");
        assert_eq!(line.rendered(2), "    10 permit ip 1.1.1.1 any log");
    }

    #[test]
    fn test_flatten_pre_order() {
        let tree = sample_tree();
        assert_eq!(
            tree.flatten(),
            vec![
                "hostname R1",
                "ip access-list test",
                " 10 permit ip 1.1.1.1 any log",
                " 20 deny ip any any",
            ]
        );
    }

    #[test]
    fn test_find_section() {
        let tree = sample_tree();
        let section = tree.find_section(&["ip access-list test".to_string()]);
        assert!(section.is_some());
        assert_eq!(section.unwrap().children.len(), 2);

        assert!(tree.find_section(&["interface Gi0/0".to_string()]).is_none());
    }

    #[test]
    fn test_same_subtree() {
        let tree = sample_tree();
        let other = sample_tree();
        assert!(tree.roots[1].same_subtree(&other.roots[1]));

        let mut changed = sample_tree();
        changed.roots[1].children[0].text = "10 permit ip 2.2.2.2 any".to_string();
        assert!(!tree.roots[1].same_subtree(&changed.roots[1]));
    }

    #[test]
    fn test_len_counts_all_lines() {
        assert_eq!(sample_tree().len(), 4);
        assert!(ConfigTree::empty().is_empty());
    }
}
