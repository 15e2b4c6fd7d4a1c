use std::path::PathBuf;

use mlua::prelude::*;
use tracing::debug;

use crate::lua::{globals, loaders};

/// Create a Lua runtime with the host loaders and the `modkit` global.
pub fn create_runtime() -> LuaResult<Lua> {
  let lua = Lua::new();
  loaders::install_loaders(&lua)?;
  globals::register_globals(&lua)?;
  Ok(lua)
}

/// Prepend `dirs` to `package.path` so modules can `require` from them.
pub fn extend_package_path(lua: &Lua, dirs: &[PathBuf]) -> LuaResult<()> {
  if dirs.is_empty() {
    return Ok(());
  }

  let templates: Vec<String> = dirs
    .iter()
    .flat_map(|dir| {
      let dir = dir.to_string_lossy().replace('\\', "/");
      [format!("{}/?.lua", dir), format!("{}/?/init.lua", dir)]
    })
    .collect();
  let new_paths = templates.join(";");

  let package: LuaTable = lua.globals().get("package")?;
  let current: String = package.get("path")?;
  package.set("path", format!("{};{}", new_paths, current))?;

  debug!(package_path = %new_paths, "extended package.path");
  Ok(())
}
