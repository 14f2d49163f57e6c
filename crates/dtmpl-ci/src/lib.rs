//! Companion CI tooling for dtmpl.
//!
//! - [`ChangedDockerfiles`] lists the Dockerfiles touched by a revision range
//!   and orders them by variant precedence, so dependent images build after
//!   their bases.
//! - [`BuildTrigger`] renders a build request and posts it to the registry API.

pub mod changed;
pub mod executor;
pub mod git;
pub mod payload;
pub mod registry;

pub use changed::{ChangedDockerfiles, ListError, OrderError, order_by_variant};
pub use executor::{GitExecutor, RealGit};
pub use git::GitError;
pub use payload::{
    BuildRequest, DEFAULT_PAYLOAD_TEMPLATE, PayloadError, load_payload_template, render_payload,
};
pub use registry::{
    ACCESS_TOKEN_VAR, ApiError, ApiResponse, BuildResult, BuildTrigger, DEFAULT_REGISTRY,
    HttpRegistry, RegistryApi, RegistrySettings, TriggerError,
};
