//! Reconciliation orchestration: fetch → diff → apply → persist.
//!
//! The [`Reconciler`] drives one device [`Transport`] through a single
//! linear reconciliation pass and produces a structured
//! [`ReconcileOutcome`]. Each invocation is synchronous from the caller's
//! point of view: nothing suspends except the transport's own network
//! calls, and the transport is borrowed exclusively for the duration of
//! the call.
//!
//! Dry-run mode guarantees that no mutating transport call is issued;
//! read-only calls (fetching the running configuration for comparison)
//! may still occur.

use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use tracing::{debug, info, warn};

use crate::differ::{diff, DiffResult, MatchPolicy, ReplacePolicy};
use crate::error::{Error, Result};
use crate::tokenizer::tokenize;
use crate::transport::Transport;
use crate::tree::DEFAULT_INDENT_UNIT;

// ============================================================================
// Reconciliation options
// ============================================================================

/// A validated reconciliation request.
///
/// This is the configuration record handed over by the (out-of-scope)
/// CLI/automation layer: desired state plus the knobs governing matching,
/// replacement, backup, and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSpec {
    /// Desired configuration as literal lines (mutually exclusive with `src`)
    #[serde(default)]
    pub lines: Vec<String>,

    /// Path to a file holding the desired configuration (mutually exclusive
    /// with `lines`); `~` is expanded
    pub src: Option<String>,

    /// Ordered ancestor command lines scoping the comparison
    #[serde(default)]
    pub parents: Vec<String>,

    /// Commands spliced in before the diff-derived commands, regardless of
    /// diff outcome
    #[serde(default)]
    pub before: Vec<String>,

    /// Commands spliced in after the diff-derived commands, regardless of
    /// diff outcome
    #[serde(default)]
    pub after: Vec<String>,

    /// How desired lines are paired with actual lines
    #[serde(rename = "match", default)]
    pub match_policy: MatchPolicy,

    /// What a partial mismatch under a matched parent triggers
    #[serde(default)]
    pub replace: ReplacePolicy,

    /// Record the running configuration before any mutation
    #[serde(default)]
    pub backup: bool,

    /// Directory for backup files (default `./backups`)
    pub backup_dir: Option<PathBuf>,

    /// Persist the configuration after apply
    #[serde(default)]
    pub save: bool,

    /// Check mode: suppress all mutating transport calls
    #[serde(default)]
    pub dry_run: bool,

    /// Spaces per nesting level in the device's configuration
    #[serde(default = "default_indent_unit")]
    pub indent_unit: usize,

    /// Regex patterns for lines excluded from comparison on both sides
    #[serde(default)]
    pub diff_ignore_lines: Vec<String>,
}

fn default_indent_unit() -> usize {
    DEFAULT_INDENT_UNIT
}

impl Default for ReconcileSpec {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            src: None,
            parents: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            match_policy: MatchPolicy::Line,
            replace: ReplacePolicy::Line,
            backup: false,
            backup_dir: None,
            save: false,
            dry_run: false,
            indent_unit: DEFAULT_INDENT_UNIT,
            diff_ignore_lines: Vec::new(),
        }
    }
}

impl ReconcileSpec {
    /// A spec applying the given literal lines.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A spec sourcing the desired configuration from a file.
    pub fn with_src(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Self::default()
        }
    }

    /// Validate option combinations. Fails fast with [`Error::Policy`]
    /// before any transport call; no partial state is possible.
    pub fn validate(&self) -> Result<()> {
        if !self.lines.is_empty() && self.src.is_some() {
            return Err(Error::policy("'lines' and 'src' are mutually exclusive"));
        }
        if self.lines.is_empty() && self.src.is_none() {
            return Err(Error::policy(
                "one of 'lines' or 'src' must provide the desired configuration",
            ));
        }
        if self.indent_unit == 0 {
            return Err(Error::policy("'indent_unit' must be at least 1"));
        }
        for pattern in &self.diff_ignore_lines {
            Regex::new(pattern).map_err(|e| {
                Error::policy(format!("invalid diff_ignore_lines pattern '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// Reconciliation outcome
// ============================================================================

/// Rendered before/after view of a reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDiff {
    /// Summary of the configuration before the change
    pub before: String,
    /// Summary of the configuration after the change
    pub after: String,
    /// Line-level diff details
    pub details: Option<String>,
}

/// Result of one reconciliation pass. Never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Whether any command was (or, in dry-run, would be) applied
    pub changed: bool,
    /// The full command sequence, including `before`/`after` splices
    pub commands: Vec<String>,
    /// The diff-derived commands only
    pub updates: Vec<String>,
    /// Whether the device reported the configuration as persisted
    pub saved: bool,
    /// The pre-change running configuration, verbatim, when a backup was
    /// requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    /// Where the backup file was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Rendered running-vs-proposed diff, when an actual config was fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<ConfigDiff>,
    /// Non-fatal vendor notices (e.g. save suppressed in check mode)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

// ============================================================================
// Reconciler
// ============================================================================

/// Orchestrates one fetch → diff → apply → persist cycle.
#[derive(Debug)]
pub struct Reconciler {
    spec: ReconcileSpec,
    ignore_patterns: Vec<Regex>,
}

impl Reconciler {
    /// Validate the spec and prepare a reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Policy`] for invalid option combinations.
    pub fn new(spec: ReconcileSpec) -> Result<Self> {
        spec.validate()?;
        let ignore_patterns = spec
            .diff_ignore_lines
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::policy(e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            spec,
            ignore_patterns,
        })
    }

    /// Run the reconciliation against one device transport.
    ///
    /// # Errors
    ///
    /// Transport failures propagate immediately as [`Error::Transport`],
    /// aborting the remaining steps; the device's own command semantics
    /// govern any partial application. Malformed device output surfaces as
    /// [`Error::MalformedConfig`].
    pub async fn reconcile(&self, transport: &dyn Transport) -> Result<ReconcileOutcome> {
        let spec = &self.spec;
        let host = transport.identifier();
        let mut warnings = Vec::new();

        // Step 1: pre-change backup, before any mutation.
        let mut fetched: Option<String> = None;
        let mut backup_content = None;
        let mut backup_path = None;
        if spec.backup {
            if spec.dry_run {
                warnings.push("backup skipped in check mode".to_string());
            } else {
                debug!(host, "fetching running config for backup");
                let running = transport.fetch_running_config().await?;
                let dir = spec
                    .backup_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("./backups"));
                let record = crate::backup::write_backup(&dir, host, &running)?;
                debug!(host, path = %record.file_path.display(), "backup written");
                backup_path = Some(record.file_path);
                backup_content = Some(running.clone());
                fetched = Some(running);
            }
        }

        // Step 2: build the desired tree.
        let desired_text = self.desired_text()?;
        let desired = tokenize(&desired_text, spec.indent_unit)?;

        // Step 3: fetch and tokenize the actual config, unless matching is
        // disabled.
        let mut rendered_diff = None;
        let updates = if spec.match_policy == MatchPolicy::None {
            diff(&desired, &crate::tree::ConfigTree::empty(), MatchPolicy::None, spec.replace)
        } else {
            let running = match fetched {
                Some(text) => text,
                None => {
                    debug!(host, "fetching running config");
                    transport.fetch_running_config().await?
                }
            };
            let filtered = self.filter_ignored(&running);
            let actual = tokenize(&filtered, spec.indent_unit)?;

            // Step 4: compute the diff.
            let result = diff(&desired, &actual, spec.match_policy, spec.replace);
            let scoped = self.scoped_actual_text(&actual);
            rendered_diff = Some(self.render_diff(&scoped, &desired.to_text(), &result));
            result
        };

        // Step 5: splice in before/after commands, preserving their order.
        let mut commands = Vec::with_capacity(
            spec.before.len() + updates.commands.len() + spec.after.len(),
        );
        commands.extend(spec.before.iter().cloned());
        commands.extend(updates.commands.iter().cloned());
        commands.extend(spec.after.iter().cloned());

        // Step 6: apply.
        let changed = !commands.is_empty();
        if changed {
            if spec.dry_run {
                info!(host, count = commands.len(), "check mode: commands not applied");
            } else {
                info!(host, count = commands.len(), "applying commands");
                transport.run_commands(&commands).await?;
            }
        } else {
            debug!(host, "configuration already satisfies desired state");
        }

        // Step 7: persist when requested, even if nothing changed.
        let mut saved = false;
        if spec.save {
            if spec.dry_run {
                warn!(host, "save requested but suppressed in check mode");
                warnings.push("nothing to save in check mode".to_string());
            } else {
                debug!(host, "persisting configuration");
                saved = transport.persist().await?;
            }
        }

        Ok(ReconcileOutcome {
            changed,
            commands,
            updates: updates.commands,
            saved,
            backup: backup_content,
            backup_path,
            diff: rendered_diff,
            warnings,
        })
    }

    /// Resolve the desired configuration text: literal lines or `src` file,
    /// nested under the `parents` context.
    fn desired_text(&self) -> Result<String> {
        let spec = &self.spec;
        let body = if let Some(ref src) = spec.src {
            let expanded = shellexpand::tilde(src).to_string();
            std::fs::read_to_string(&expanded)?
        } else {
            spec.lines.join("\n")
        };
        let body = self.filter_ignored(&body);

        if spec.parents.is_empty() {
            return Ok(body);
        }

        let unit = spec.indent_unit;
        let mut text = String::new();
        for (depth, parent) in spec.parents.iter().enumerate() {
            text.push_str(&" ".repeat(depth * unit));
            text.push_str(parent.trim());
            text.push('\n');
        }
        let offset = " ".repeat(spec.parents.len() * unit);
        for line in body.lines() {
            if line.trim().is_empty() {
                continue;
            }
            text.push_str(&offset);
            text.push_str(line);
            text.push('\n');
        }
        Ok(text)
    }

    /// Render the part of the actual configuration the diff details should
    /// cover: the section matched by `parents`, or the whole tree. Keeps
    /// unrelated running lines out of the rendered diff when the comparison
    /// is scoped.
    fn scoped_actual_text(&self, actual: &crate::tree::ConfigTree) -> String {
        let spec = &self.spec;
        if spec.parents.is_empty() {
            return actual.to_text();
        }
        let Some(section) = actual.find_section(&spec.parents) else {
            return String::new();
        };
        let unit = spec.indent_unit;
        let mut text = String::new();
        for (depth, parent) in spec.parents.iter().enumerate() {
            text.push_str(&" ".repeat(depth * unit));
            text.push_str(parent.trim());
            text.push('\n');
        }
        for child in &section.children {
            for line in child.flatten(unit) {
                text.push_str(&line);
                text.push('\n');
            }
        }
        text.trim_end().to_string()
    }

    /// Drop lines matching any ignore pattern.
    fn filter_ignored(&self, text: &str) -> String {
        if self.ignore_patterns.is_empty() {
            return text.to_string();
        }
        text.lines()
            .filter(|line| !self.ignore_patterns.iter().any(|p| p.is_match(line.trim())))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render a running-vs-proposed diff with the command list appended.
    fn render_diff(&self, before: &str, after: &str, updates: &DiffResult) -> ConfigDiff {
        let text_diff = TextDiff::from_lines(before, after);
        let mut details = String::new();
        let mut additions = 0usize;
        let mut deletions = 0usize;

        for change in text_diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => {
                    deletions += 1;
                    "-"
                }
                ChangeTag::Insert => {
                    additions += 1;
                    "+"
                }
                ChangeTag::Equal => " ",
            };
            details.push_str(sign);
            details.push_str(change.value());
            if !change.value().ends_with('\n') {
                details.push('\n');
            }
        }

        if !updates.is_empty() {
            details.push_str("\ncommands:\n");
            for cmd in &updates.commands {
                details.push_str("  ");
                details.push_str(cmd);
                details.push('\n');
            }
        }

        ConfigDiff {
            before: format!("{} lines", before.lines().count()),
            after: format!(
                "{} lines ({} additions, {} deletions)",
                after.lines().count(),
                additions,
                deletions
            ),
            details: Some(details),
        }
    }
}

/// Convenience wrapper: validate the spec and run one reconciliation.
pub async fn reconcile(
    spec: ReconcileSpec,
    transport: &dyn Transport,
) -> Result<ReconcileOutcome> {
    Reconciler::new(spec)?.reconcile(transport).await
}

/// Parse a reconcile spec out of a loose key/value record, the shape an
/// automation layer typically hands over.
pub fn spec_from_record(record: &HashMap<String, serde_json::Value>) -> Result<ReconcileSpec> {
    let value = serde_json::to_value(record)
        .and_then(serde_json::from_value)
        .map_err(|e| Error::policy(format!("invalid reconcile options: {e}")))?;
    Ok(value)
}
