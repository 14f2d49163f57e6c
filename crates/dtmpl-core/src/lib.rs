//! Core types and configuration for dtmpl.
//!
//! This crate defines the `docker-template.yaml` schema ([`TemplateConfig`]),
//! the merged run [`Settings`], the version/variant resolution rules, and the
//! variant-to-version [`MappingTable`].

pub mod config;
pub mod dirglob;
pub mod error;
pub mod mapping;
pub mod resolve;
pub mod target;

pub use config::{CliOverrides, RenderContext, Settings, TemplateConfig, parse_env_args};
pub use dirglob::dirglob;
pub use error::{Error, Result};
pub use mapping::{MappingTable, VersionSelection};
pub use resolve::{resolve_variants, resolve_versions};
pub use target::{DockerfileTarget, Variant};
