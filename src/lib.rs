//! # Driftline - Declarative Configuration Reconciliation
//!
//! Driftline brings a block-indented device configuration (the format used
//! by most network-device CLIs) in line with a desired state: fetch the
//! running configuration, compute the ordered command set that closes the
//! gap, apply it, and optionally persist - the classic `*_config` module
//! cycle, extracted into a reusable, transport-agnostic library.
//!
//! ## Core Concepts
//!
//! - **Desired state**: the configuration the caller wants the device to
//!   have, as literal lines or a source file, optionally scoped under
//!   parent commands
//! - **Actual state**: the configuration currently fetched from the device
//! - **Match policy**: how desired and actual lines are paired (`line`,
//!   `strict`, `exact`, `none`)
//! - **Replace policy**: whether a partial mismatch corrects individual
//!   lines or replaces the whole parent block
//! - **Transport**: the vendor-specific client (CLI, REST, ZAPI) behind a
//!   small async trait; driftline never speaks a device protocol itself
//!
//! ## Architecture Overview
//!
//! ```text
//! ReconcileSpec ──▶ Reconciler ──▶ ReconcileOutcome
//!                      │
//!        ┌─────────────┼──────────────┐
//!        ▼             ▼              ▼
//!   Tokenizer       Differ        Transport
//!   (text ──▶     (desired vs     (fetch / run
//!    ConfigTree)   actual ──▶      / persist)
//!                  commands)
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use driftline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> driftline::Result<()> {
//!     let spec = ReconcileSpec {
//!         lines: vec!["10 permit ip 1.1.1.1 any log".into()],
//!         parents: vec!["ip access-list test".into()],
//!         save: true,
//!         ..Default::default()
//!     };
//!
//!     let transport = MyIosTransport::connect("router1").await?;
//!     let outcome = reconcile(spec, &transport).await?;
//!
//!     if outcome.changed {
//!         println!("applied: {:?}", outcome.commands);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backup;
pub mod differ;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod tokenizer;
pub mod transport;
pub mod tree;

pub use error::{Error, Result};

/// Convenient re-exports of the commonly used types and traits.
pub mod prelude {
    pub use crate::backup::ConfigBackup;
    pub use crate::differ::{diff, DiffResult, MatchPolicy, ReplacePolicy};
    pub use crate::error::{Error, Result};
    pub use crate::reconciler::{
        reconcile, ConfigDiff, ReconcileOutcome, ReconcileSpec, Reconciler,
    };
    pub use crate::registry::TransportRegistry;
    pub use crate::tokenizer::tokenize;
    pub use crate::transport::{FieldMap, Transport, TransportError, TransportResult};
    pub use crate::tree::{CommandLine, ConfigTree};
}
