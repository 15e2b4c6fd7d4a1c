//! Build context.
//!
//! The context is the single piece of mutable state the installer touches: it
//! carries the configuration layers, the transpile list, the module search
//! paths and the installed-module ledger. It is shared as an
//! `Rc<RefCell<BuildContext>>` so installed modules can mutate it through the
//! Lua views in [`lua`].

pub mod lua;
mod types;

pub use lua::{ContextHandle, ModuleContainer};
pub use types::{BuildContext, Compat, InstalledModuleRecord, LayerDescriptor, SharedContext};
