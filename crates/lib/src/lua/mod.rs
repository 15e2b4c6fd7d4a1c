//! Lua runtime.
//!
//! # Submodules
//!
//! - [`globals`] - The `modkit` global table
//! - [`helpers`] - Helper tables exposed to modules
//! - [`loaders`] - File loading with `__dir`/`__file` injection
//! - [`runtime`] - Runtime creation and `package.path` management

pub mod globals;
pub mod helpers;
pub mod loaders;
pub mod runtime;
