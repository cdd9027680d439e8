//! Diff engine: computes the ordered command sequence that transforms an
//! actual configuration tree into a desired one.
//!
//! Pairing of desired and actual lines is governed by a [`MatchPolicy`];
//! what happens on a partial mismatch under a matched parent is governed by
//! a [`ReplacePolicy`]. Commands are emitted in desired-tree pre-order so
//! that each parent immediately precedes its own inserted or changed
//! children, which satisfies devices that require hierarchical context per
//! command.
//!
//! The diff is deliberately additive under `replace=line`: lines present on
//! the device but absent from the desired state are never removed unless a
//! block replacement rips out the whole parent. This mirrors the corrective
//! (not purging) behavior of the CLI config modules this crate generalizes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tree::{CommandLine, ConfigTree};

// ============================================================================
// Policies
// ============================================================================

/// How desired lines are paired with actual lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// A desired line matches any actual line with identical text,
    /// irrespective of position or parent (default).
    #[default]
    Line,
    /// A desired line matches an actual line with identical text and
    /// identical index among its siblings.
    Strict,
    /// A desired line matches only if its entire subtree is identical to
    /// some actual subtree, order-sensitive.
    Exact,
    /// Skip comparison entirely; every desired line is emitted verbatim.
    None,
}

impl std::str::FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "line" => Ok(MatchPolicy::Line),
            "strict" => Ok(MatchPolicy::Strict),
            "exact" => Ok(MatchPolicy::Exact),
            "none" => Ok(MatchPolicy::None),
            _ => Err(Error::policy(format!(
                "invalid match policy '{}'. Valid options: line, strict, exact, none",
                s
            ))),
        }
    }
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPolicy::Line => write!(f, "line"),
            MatchPolicy::Strict => write!(f, "strict"),
            MatchPolicy::Exact => write!(f, "exact"),
            MatchPolicy::None => write!(f, "none"),
        }
    }
}

/// What a partial mismatch under a matched parent triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePolicy {
    /// Recurse and emit only the differing child commands (default).
    #[default]
    Line,
    /// Remove the entire parent block (`no <parent>`) and reinsert the full
    /// desired subtree, even if only one child differs.
    Block,
}

impl std::str::FromStr for ReplacePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "line" => Ok(ReplacePolicy::Line),
            "block" => Ok(ReplacePolicy::Block),
            _ => Err(Error::policy(format!(
                "invalid replace policy '{}'. Valid options: line, block",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplacePolicy::Line => write!(f, "line"),
            ReplacePolicy::Block => write!(f, "block"),
        }
    }
}

// ============================================================================
// Diff result
// ============================================================================

/// The literal command sequence required to bring the actual configuration
/// in line with the desired one, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Commands to apply, removals preceding insertions within a block
    pub commands: Vec<String>,
}

impl DiffResult {
    /// True if the actual configuration already satisfies the desired one.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of commands to apply.
    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

// ============================================================================
// Diff computation
// ============================================================================

/// Compute the commands that transform `actual` into `desired` under the
/// given policies. Never fails for well-formed trees; every policy
/// combination is defined.
pub fn diff(
    desired: &ConfigTree,
    actual: &ConfigTree,
    match_policy: MatchPolicy,
    replace_policy: ReplacePolicy,
) -> DiffResult {
    let indent_unit = desired.indent_unit;
    let mut commands = Vec::new();

    match match_policy {
        MatchPolicy::None => {
            // No dependency on `actual` at all.
            commands = desired.flatten();
        }
        MatchPolicy::Line => {
            let known: HashSet<&str> =
                actual.iter_lines().map(|l| l.text.as_str()).collect();
            for root in &desired.roots {
                emit_line_match(root, &known, replace_policy, indent_unit, &mut commands);
            }
        }
        MatchPolicy::Strict => {
            for (index, root) in desired.roots.iter().enumerate() {
                emit_strict_match(
                    root,
                    index,
                    &actual.roots,
                    replace_policy,
                    indent_unit,
                    &mut commands,
                );
            }
        }
        MatchPolicy::Exact => {
            let subtrees: Vec<&CommandLine> = actual.iter_lines().collect();
            for root in &desired.roots {
                if !subtrees.iter().any(|a| a.same_subtree(root)) {
                    commands.extend(root.flatten(indent_unit));
                }
            }
        }
    }

    DiffResult { commands }
}

/// A subtree is satisfied under `line` matching when every line of it
/// appears somewhere in the actual configuration.
fn line_satisfied(node: &CommandLine, known: &HashSet<&str>) -> bool {
    known.contains(node.text.as_str())
        && node.children.iter().all(|c| line_satisfied(c, known))
}

fn emit_line_match(
    node: &CommandLine,
    known: &HashSet<&str>,
    replace: ReplacePolicy,
    indent_unit: usize,
    out: &mut Vec<String>,
) {
    if line_satisfied(node, known) {
        return;
    }
    if !known.contains(node.text.as_str()) {
        // Unmatched line: insert the full subtree, parent first.
        out.extend(node.flatten(indent_unit));
        return;
    }
    // Parent matched but children differ.
    match replace {
        ReplacePolicy::Block => {
            out.push(negation(node, indent_unit));
            out.extend(node.flatten(indent_unit));
        }
        ReplacePolicy::Line => {
            let mut inner = Vec::new();
            for child in &node.children {
                emit_line_match(child, known, replace, indent_unit, &mut inner);
            }
            if !inner.is_empty() {
                // Parent line re-entered as hierarchical context.
                out.push(node.rendered(indent_unit));
                out.extend(inner);
            }
        }
    }
}

/// A subtree is satisfied under `strict` matching when it occupies the same
/// sibling index with the same text, recursively.
fn strict_satisfied(node: &CommandLine, index: usize, siblings: &[CommandLine]) -> bool {
    match siblings.get(index) {
        Some(actual) if actual.text == node.text => node
            .children
            .iter()
            .enumerate()
            .all(|(i, c)| strict_satisfied(c, i, &actual.children)),
        _ => false,
    }
}

fn emit_strict_match(
    node: &CommandLine,
    index: usize,
    siblings: &[CommandLine],
    replace: ReplacePolicy,
    indent_unit: usize,
    out: &mut Vec<String>,
) {
    if strict_satisfied(node, index, siblings) {
        return;
    }
    let paired = match siblings.get(index) {
        Some(actual) if actual.text == node.text => actual,
        _ => {
            out.extend(node.flatten(indent_unit));
            return;
        }
    };
    match replace {
        ReplacePolicy::Block => {
            out.push(negation(node, indent_unit));
            out.extend(node.flatten(indent_unit));
        }
        ReplacePolicy::Line => {
            let mut inner = Vec::new();
            for (i, child) in node.children.iter().enumerate() {
                emit_strict_match(child, i, &paired.children, replace, indent_unit, &mut inner);
            }
            if !inner.is_empty() {
                out.push(node.rendered(indent_unit));
                out.extend(inner);
            }
        }
    }
}

/// Vendor-negation form of a command, at the command's own nesting level.
fn negation(node: &CommandLine, indent_unit: usize) -> String {
    if node.depth == 0 {
        format!("no {}", node.text)
    } else {
        format!("{}no {}", " ".repeat(node.depth * indent_unit), node.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use pretty_assertions::assert_eq;

    fn tree(text: &str) -> ConfigTree {
        tokenize(text, 1).unwrap()
    }

    #[test]
    fn test_match_policy_from_str() {
        assert_eq!("line".parse::<MatchPolicy>().unwrap(), MatchPolicy::Line);
        assert_eq!("strict".parse::<MatchPolicy>().unwrap(), MatchPolicy::Strict);
        assert_eq!("exact".parse::<MatchPolicy>().unwrap(), MatchPolicy::Exact);
        assert_eq!("none".parse::<MatchPolicy>().unwrap(), MatchPolicy::None);
        assert!("invalid".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn test_replace_policy_from_str() {
        assert_eq!("line".parse::<ReplacePolicy>().unwrap(), ReplacePolicy::Line);
        assert_eq!("block".parse::<ReplacePolicy>().unwrap(), ReplacePolicy::Block);
        assert!("merge".parse::<ReplacePolicy>().is_err());
    }

    #[test]
    fn test_diff_identical_trees_is_empty() {
        let desired = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\n");
        let result = diff(&desired, &desired.clone(), MatchPolicy::Line, ReplacePolicy::Line);
        assert!(result.is_empty());
    }

    #[test]
    fn test_diff_changed_root_line() {
        let desired = tree("hostname R1\n");
        let actual = tree("hostname R0\n");
        let result = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        assert_eq!(result.commands, vec!["hostname R1"]);
    }

    #[test]
    fn test_diff_inserts_missing_subtree_pre_order() {
        let desired = tree("interface Gi0/0\n ip address 10.0.0.1 255.255.255.0\n no shutdown\n");
        let actual = tree("hostname R1\n");
        let result = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        assert_eq!(
            result.commands,
            vec![
                "interface Gi0/0",
                " ip address 10.0.0.1 255.255.255.0",
                " no shutdown",
            ]
        );
    }

    #[test]
    fn test_diff_line_replace_emits_parent_context() {
        let desired = tree("interface Gi0/0\n ip address 10.0.0.2 255.255.255.0\n no shutdown\n");
        let actual = tree("interface Gi0/0\n ip address 10.0.0.1 255.255.255.0\n no shutdown\n");
        let result = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        assert_eq!(
            result.commands,
            vec!["interface Gi0/0", " ip address 10.0.0.2 255.255.255.0"]
        );
    }

    #[test]
    fn test_diff_block_replace_negates_whole_parent() {
        let desired = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\n");
        let actual = tree("ip access-list test\n 20 permit ip 2.2.2.2 any\n");
        let result = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Block);
        assert_eq!(
            result.commands,
            vec![
                "no ip access-list test",
                "ip access-list test",
                " 10 permit ip 1.1.1.1 any log",
            ]
        );
    }

    #[test]
    fn test_diff_block_superset_of_line() {
        let desired = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\n 30 deny ip any any\n");
        let actual = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\n 20 permit tcp any any\n");
        let line = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        let block = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Block);
        assert!(block.len() >= line.len());
        assert_eq!(block.commands[0], "no ip access-list test");
    }

    #[test]
    fn test_diff_line_is_additive() {
        // Actual-only lines are left alone under replace=line.
        let desired = tree("interface Gi0/0\n no shutdown\n");
        let actual = tree("interface Gi0/0\n no shutdown\n description legacy\n");
        let result = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        assert!(result.is_empty());
    }

    #[test]
    fn test_diff_line_matches_anywhere() {
        // Under line matching, text position does not matter.
        let desired = tree("ntp server 10.0.0.5\n");
        let actual = tree("interface Gi0/0\n ntp server 10.0.0.5\n");
        let result = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        assert!(result.is_empty());
    }

    #[test]
    fn test_diff_strict_requires_position() {
        let desired = tree("hostname R1\nip routing\n");
        let actual = tree("ip routing\nhostname R1\n");
        // line matching: both present, nothing to do
        let line = diff(&desired, &actual, MatchPolicy::Line, ReplacePolicy::Line);
        assert!(line.is_empty());
        // strict matching: indexes swapped, both re-emitted
        let strict = diff(&desired, &actual, MatchPolicy::Strict, ReplacePolicy::Line);
        assert_eq!(strict.commands, vec!["hostname R1", "ip routing"]);
    }

    #[test]
    fn test_diff_strict_child_position() {
        let desired = tree("ip access-list test\n 10 permit ip 1.1.1.1 any\n 20 deny ip any any\n");
        let actual = tree("ip access-list test\n 20 deny ip any any\n 10 permit ip 1.1.1.1 any\n");
        let result = diff(&desired, &actual, MatchPolicy::Strict, ReplacePolicy::Line);
        assert_eq!(
            result.commands,
            vec![
                "ip access-list test",
                " 10 permit ip 1.1.1.1 any",
                " 20 deny ip any any",
            ]
        );
    }

    #[test]
    fn test_diff_exact_subtree_match() {
        let desired = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\n");
        let same = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\nhostname R1\n");
        assert!(diff(&desired, &same, MatchPolicy::Exact, ReplacePolicy::Line).is_empty());

        // One extra actual child breaks exact subtree equality.
        let extra = tree("ip access-list test\n 10 permit ip 1.1.1.1 any log\n 20 deny ip any any\n");
        let result = diff(&desired, &extra, MatchPolicy::Exact, ReplacePolicy::Line);
        assert_eq!(
            result.commands,
            vec!["ip access-list test", " 10 permit ip 1.1.1.1 any log"]
        );
    }

    #[test]
    fn test_diff_none_ignores_actual() {
        let desired = tree("hostname R1\ninterface Gi0/0\n no shutdown\n");
        let a = tree("hostname R1\ninterface Gi0/0\n no shutdown\n");
        let b = tree("completely unrelated\n");
        let from_a = diff(&desired, &a, MatchPolicy::None, ReplacePolicy::Line);
        let from_b = diff(&desired, &b, MatchPolicy::None, ReplacePolicy::Line);
        assert_eq!(from_a, from_b);
        assert_eq!(
            from_a.commands,
            vec!["hostname R1", "interface Gi0/0", " no shutdown"]
        );
    }

    #[test]
    fn test_diff_nested_block_negation_indented() {
        let desired =
            tree("router bgp 65000\n neighbor 192.168.1.1\n  remote-as 65001\n");
        let actual =
            tree("router bgp 65000\n neighbor 192.168.1.1\n  remote-as 65009\n");
        let result = diff(&desired, &actual, MatchPolicy::Strict, ReplacePolicy::Block);
        assert_eq!(result.commands[0], "no router bgp 65000");
    }

    #[test]
    fn test_diff_empty_desired_is_empty() {
        let desired = ConfigTree::empty();
        let actual = tree("hostname R1\n");
        for policy in [
            MatchPolicy::Line,
            MatchPolicy::Strict,
            MatchPolicy::Exact,
            MatchPolicy::None,
        ] {
            assert!(diff(&desired, &actual, policy, ReplacePolicy::Line).is_empty());
        }
    }
}
