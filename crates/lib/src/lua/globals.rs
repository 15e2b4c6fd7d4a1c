//! The `modkit` global table.
//!
//! Registered in every runtime and available to project files and modules:
//! - `modkit.version` - Host version
//! - `modkit.path` - Path helpers (see [`helpers::path`])
//! - `modkit.define_module{}` - Wrap a setup function into a module

use mlua::prelude::*;

use super::helpers;
use crate::consts::APP_NAME;
use crate::module::define::create_define_module;

/// Register the `modkit` global table in the Lua runtime.
pub fn register_globals(lua: &Lua) -> LuaResult<()> {
  let modkit = lua.create_table()?;

  modkit.set("version", env!("CARGO_PKG_VERSION"))?;
  modkit.set("path", helpers::path::create_path_helpers(lua)?)?;
  modkit.set("define_module", create_define_module(lua)?)?;

  lua.globals().set(APP_NAME, modkit)?;

  Ok(())
}
