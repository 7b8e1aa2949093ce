//! Canon Common Library
//!
//! Shared types for the canonical machine layer: normalized axis vectors,
//! modal state enums, G/M code masks and modal groups, the three-way gcode
//! model records, the error taxonomy, and configuration loading.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric limits and conversion factors
//! - [`config`] - Generic TOML loading, log level, shared service config
//! - [`machine`] - Canonical machine domain types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod machine;
pub mod prelude;
