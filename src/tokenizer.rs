//! Line tokenizer for block-indented configuration text.
//!
//! Splits raw device output into a [`ConfigTree`] of commands with
//! parent/child nesting derived from leading indentation. Pure function,
//! no side effects.

use crate::error::{Error, Result};
use crate::tree::{CommandLine, ConfigTree};

/// Tokenize block-indented configuration text into a command tree.
///
/// Depth is computed by counting leading spaces and dividing by
/// `indent_unit` (the number of spaces per nesting level for the source
/// device's convention); a leading tab counts as one full indent unit.
/// Blank lines and device comment lines (`!`, `#`) are dropped. A line
/// becomes a child of the nearest preceding line with depth exactly one
/// less; lines with no qualifying ancestor become roots.
///
/// # Errors
///
/// Returns [`Error::MalformedConfig`] when a line's depth exceeds the
/// previous line's depth + 1 (an indent jump with no intermediate parent),
/// or when leading whitespace is not a whole multiple of `indent_unit`.
pub fn tokenize(raw_text: &str, indent_unit: usize) -> Result<ConfigTree> {
    let indent_unit = indent_unit.max(1);
    let mut roots: Vec<CommandLine> = Vec::new();
    // Path of child indices from the root to the last inserted line, one
    // entry per depth level.
    let mut path: Vec<usize> = Vec::new();
    let mut previous_depth: Option<usize> = None;

    for (idx, line) in raw_text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with('#') {
            continue;
        }

        let indent = leading_indent(line, indent_unit);
        if indent % indent_unit != 0 {
            return Err(Error::malformed_config(
                idx + 1,
                line,
                format!(
                    "indentation of {} spaces is not a multiple of the indent unit ({})",
                    indent, indent_unit
                ),
            ));
        }
        let depth = indent / indent_unit;

        match previous_depth {
            None if depth > 0 => {
                return Err(Error::malformed_config(
                    idx + 1,
                    line,
                    "first command line must start at depth 0",
                ));
            }
            Some(prev) if depth > prev + 1 => {
                return Err(Error::malformed_config(
                    idx + 1,
                    line,
                    format!(
                        "indent jump from depth {} to {} with no intermediate parent",
                        prev, depth
                    ),
                ));
            }
            _ => {}
        }

        let node = CommandLine::new(trimmed, depth);
        if depth == 0 {
            roots.push(node);
            path.clear();
            path.push(roots.len() - 1);
        } else {
            path.truncate(depth);
            let parent = resolve_path(&mut roots, &path);
            parent.children.push(node);
            path.push(parent.children.len() - 1);
        }
        previous_depth = Some(depth);
    }

    Ok(ConfigTree::new(roots, indent_unit))
}

/// Width of a line's leading whitespace in columns: a space is one column,
/// a tab one full indent unit, matching how the devices themselves echo
/// tab-indented sections.
fn leading_indent(line: &str, indent_unit: usize) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { indent_unit } else { 1 })
        .sum()
}

/// Follow a child-index path to the node it names.
fn resolve_path<'a>(roots: &'a mut [CommandLine], path: &[usize]) -> &'a mut CommandLine {
    let mut node = &mut roots[path[0]];
    for &idx in &path[1..] {
        node = &mut node.children[idx];
    }
    node
}
