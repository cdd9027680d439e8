//! Device transport abstraction.
//!
//! The reconciler never talks to a device directly; it drives a
//! [`Transport`] implemented by vendor-specific CLI/REST/ZAPI clients.
//! Transports own their connection lifecycle, prompt handling, and any
//! retry policy; this crate surfaces their failures verbatim and aborts.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a device transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to establish the connection to the device.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected by the device.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A command could not be executed or was rejected.
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Connection or operation timed out.
    #[error("Transport timeout after {0} seconds")]
    Timeout(u64),

    /// The device returned output the transport could not interpret.
    #[error("Malformed device response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A connection to a single configurable device.
///
/// The reconciler borrows a transport exclusively for the duration of one
/// reconciliation; it neither pools nor retains it across calls, and it
/// assumes at most one in-flight reconciliation per device connection.
/// Callers are responsible for serializing concurrent calls against the
/// same device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A human-readable identifier for the device (hostname or address).
    fn identifier(&self) -> &str;

    /// Fetch the device's running configuration as block-indented text.
    async fn fetch_running_config(&self) -> TransportResult<String>;

    /// Execute an ordered command sequence, returning the combined device
    /// output. Partial application is governed by the device's own command
    /// semantics; no rollback is attempted here.
    async fn run_commands(&self, commands: &[String]) -> TransportResult<String>;

    /// Persist the running configuration (e.g. copy to startup). Returns
    /// whether the device reported the save as performed.
    async fn persist(&self) -> TransportResult<bool>;
}

// ============================================================================
// Field-name mapping for transport adapters
// ============================================================================

/// A pure, declarative field-name mapping table.
///
/// Vendor APIs frequently want request keys renamed wholesale (the classic
/// underscore-to-hyphen transform). Adapters consume a `FieldMap` built
/// once at startup instead of scattering string replacements; the
/// reconciler core never touches it.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    renames: HashMap<String, String>,
}

impl FieldMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from explicit `(from, to)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            renames: pairs
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        }
    }

    /// Build the common underscore-to-hyphen mapping for the given keys.
    pub fn underscore_to_hyphen<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            renames: keys
                .into_iter()
                .map(|k| (k.as_ref().to_string(), k.as_ref().replace('_', "-")))
                .collect(),
        }
    }

    /// Register a single rename.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.renames.insert(from.into(), to.into());
    }

    /// Resolve a field name; unmapped names pass through unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames.get(name).map_or(name, String::as_str)
    }

    /// Apply the mapping to every key of a JSON-style record.
    pub fn apply(
        &self,
        record: &HashMap<String, serde_json::Value>,
    ) -> HashMap<String, serde_json::Value> {
        record
            .iter()
            .map(|(k, v)| (self.resolve(k).to_string(), v.clone()))
            .collect()
    }
}
