//! Module loading and installation.
//!
//! # Submodules
//!
//! - [`load`] - Modern-then-legacy loading of a resolved entry file
//! - [`instance`] - Specifier candidates, sidecar metadata, callable check
//! - [`install`] - Invocation, bookkeeping and the installed-module ledger
//! - [`define`] - `modkit.define_module{}` for module authors

pub mod define;
mod error;
pub mod install;
pub mod instance;
pub mod load;
mod types;

pub use error::{InstallError, LoadError};
pub use install::install_module;
pub use instance::load_instance;
pub use types::{InstallResult, ModuleCallable, ModuleMeta, ModuleReference};
