//! Dual-convention module loading.
//!
//! Module entry files come in two shapes:
//!
//! - **Modern**: the chunk `return`s its export. A returned table with a
//!   `default` field is unwrapped to that field.
//! - **Legacy**: the chunk assigns `module.exports` (or fills `exports`) and
//!   returns nothing. Legacy loads go through `package.searchpath` with the
//!   module directories as extra roots and are cached in `package.loaded`.
//!
//! [`load`] always tries the modern shape first. That pass already binds
//! `module`/`exports`, so a legacy file that loads cleanly runs exactly once.
//! Any failure falls back to a legacy require; when both fail the legacy error
//! is returned.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::debug;

use crate::lua::loaders;

/// Load the module entry at `path`, modern convention first.
pub fn load(lua: &Lua, path: &Path, search_paths: &[PathBuf]) -> LuaResult<LuaValue> {
  match import_module(lua, path) {
    Ok(value) => Ok(value),
    Err(e) => {
      debug!(path = %path.display(), error = %e, "modern load failed, trying legacy require");
      require_module(lua, path, search_paths)
    }
  }
}

/// Evaluate `path` as a fresh chunk and return its export.
///
/// The chunk also sees `module` and `exports`. A chunk that returns nothing but
/// filled them is legacy-shaped: its exports are cached in `package.loaded` and
/// returned, so the file never runs a second time through [`require_module`].
pub fn import_module(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let key = cache_key(path)?;
  let (env, module, exports) = module_env(lua, &key)?;
  let value = loaders::exec_file_in(lua, &key, env)?;

  match value {
    LuaValue::Nil => {
      let exported: LuaValue = module.get("exports")?;
      if !has_exports(&exported, &exports) {
        return Err(LuaError::external(format!(
          "'{}' does not return a value",
          path.display()
        )));
      }
      debug!(path = %key.display(), "module assigned exports instead of returning");
      loaded_table(lua)?.raw_set(key.to_string_lossy().as_ref(), exported.clone())?;
      Ok(exported)
    }
    LuaValue::Table(ref table) => match table.raw_get::<LuaValue>("default")? {
      LuaValue::Nil => Ok(value),
      default => Ok(default),
    },
    other => Ok(other),
  }
}

/// Load `path` as a legacy module, resolving it against `search_paths` when it
/// is not a file itself.
pub fn require_module(lua: &Lua, path: &Path, search_paths: &[PathBuf]) -> LuaResult<LuaValue> {
  let key = cache_key(&locate_legacy(lua, path, search_paths)?)?;
  let name = key.to_string_lossy().into_owned();

  let loaded = loaded_table(lua)?;
  let cached: LuaValue = loaded.raw_get(name.as_str())?;
  if !cached.is_nil() {
    debug!(path = %name, "legacy module served from cache");
    return Ok(cached);
  }

  let (env, module, _) = module_env(lua, &key)?;
  loaders::exec_file_in(lua, &key, env)?;

  // The chunk may have replaced `module.exports` wholesale.
  let value: LuaValue = module.get("exports")?;
  loaded.raw_set(name.as_str(), value.clone())?;
  Ok(value)
}

/// Canonical path of a module file, also its `package.loaded` key.
fn cache_key(path: &Path) -> LuaResult<PathBuf> {
  dunce::canonicalize(path).map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))
}

fn loaded_table(lua: &Lua) -> LuaResult<LuaTable> {
  let package: LuaTable = lua.globals().get("package")?;
  package.get("loaded")
}

/// File environment with fresh `module` and `exports` bindings.
fn module_env(lua: &Lua, path: &Path) -> LuaResult<(LuaTable, LuaTable, LuaTable)> {
  let module = lua.create_table()?;
  let exports = lua.create_table()?;
  module.set("exports", exports.clone())?;

  let env = loaders::file_env(lua, path)?;
  env.raw_set("module", module.clone())?;
  env.raw_set("exports", exports.clone())?;
  Ok((env, module, exports))
}

/// Whether a chunk exported anything: `module.exports` replaced, or the
/// original `exports` table filled.
fn has_exports(exported: &LuaValue, original: &LuaTable) -> bool {
  match exported {
    LuaValue::Nil => false,
    LuaValue::Table(table) if table == original => table.pairs::<LuaValue, LuaValue>().next().is_some(),
    _ => true,
  }
}

fn locate_legacy(lua: &Lua, path: &Path, search_paths: &[PathBuf]) -> LuaResult<PathBuf> {
  if path.is_file() {
    return Ok(path.to_path_buf());
  }

  let package: LuaTable = lua.globals().get("package")?;
  let default_path: String = package.get("path")?;
  let mut templates: Vec<String> = search_paths
    .iter()
    .flat_map(|dir| {
      let dir = dir.to_string_lossy().replace('\\', "/");
      [format!("{}/?.lua", dir), format!("{}/?/init.lua", dir)]
    })
    .collect();
  templates.push(default_path);

  // An empty separator keeps dots in the name literal.
  let searchpath: LuaFunction = package.get("searchpath")?;
  let name = path.to_string_lossy().replace('\\', "/");
  let (found, err): (Option<String>, Option<String>) = searchpath.call((name.as_str(), templates.join(";"), "", "/"))?;

  match found {
    Some(file) => Ok(PathBuf::from(file)),
    None => Err(LuaError::external(format!(
      "cannot find module '{}':{}",
      name,
      err.unwrap_or_default()
    ))),
  }
}
