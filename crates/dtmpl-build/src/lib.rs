//! Dockerfile rendering and reconciliation for dtmpl.
//!
//! # Reconcile pipeline
//!
//! ```text
//! dtmpl update
//!   for each variant ── MappingTable::versions_for() (null mapping → skip)
//!     for each version
//!       1. Render  ── dj ... -o <tmp>          (Renderer)
//!       2. Diff    ── diff -u <target|empty> <tmp>
//!       3. Replace ── mkdir -p + atomic rename  (skipped on dry-run)
//! ```
//!
//! Every external process goes through a [`CommandRunner`], and rendering
//! through a [`Renderer`], so the engine can be driven by mocks in tests.

pub mod diff;
pub mod reconcile;
pub mod renderer;
pub mod shell;

pub use diff::{DiffError, DiffOutcome, unified_diff};
pub use reconcile::{
    Outcome, ReconcileEngine, ReconcileEntry, ReconcileError, ReconcileOptions, ReconcileReport,
};
pub use renderer::{DjinjaRenderer, RenderError, RenderRequest, Renderer};
pub use shell::{CommandRunner, RealRunner, ShellError, ShellResult};
