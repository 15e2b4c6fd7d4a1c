//! modkit-lib: module resolution and installation for modkit
//!
//! This crate provides the pieces a host needs to install Lua modules into a
//! shared build context:
//! - `resolve`: specifier candidates, path resolution and vendored-path helpers
//! - `module`: loading entry files under both conventions, sidecar metadata and installation
//! - `context`: the build context and the views of it exposed to modules
//! - `eval`: evaluation of a `modkit.lua` project file

pub mod consts;
pub mod context;
pub mod eval;
pub mod lua;
pub mod module;
pub mod resolve;
pub mod util;
