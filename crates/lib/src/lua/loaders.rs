//! File loading with per-file environments.
//!
//! Every file loaded through this module runs in its own environment table
//! that inherits from `_G` and carries:
//! - `__dir`: directory of the file being executed
//! - `__file`: canonical path of the file itself
//!
//! The same environment is used by the host when it evaluates module entry
//! files, so a module sees its own location regardless of how it was loaded.
//!
//! [`install_loaders`] hooks `package.searchers[2]`, `dofile` and `loadfile` so
//! that files pulled in by modules get the same treatment.

use std::fs;
use std::path::{Path, PathBuf};

use mlua::prelude::*;

/// Registry key holding the directory of the file currently executing.
/// `dofile` resolves relative paths against it.
const CURRENT_DIR_KEY: &str = "__modkit_current_dir";

/// Canonical path and contents of a Lua source file.
fn read_source(path: &Path) -> LuaResult<(PathBuf, String)> {
  let canonical = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))?;
  let content = fs::read_to_string(&canonical)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical.display(), e)))?;
  Ok((canonical, content))
}

/// Environment table for `path`: `__dir`, `__file`, globals through `__index`.
pub fn file_env(lua: &Lua, path: &Path) -> LuaResult<LuaTable> {
  let env = lua.create_table()?;
  env.set("__file", path.to_string_lossy().as_ref())?;
  env.set(
    "__dir",
    path.parent().unwrap_or(Path::new(".")).to_string_lossy().as_ref(),
  )?;

  let mt = lua.create_table()?;
  mt.set("__index", lua.globals())?;
  mt.set("__newindex", lua.globals())?;
  env.set_metatable(Some(mt))?;

  Ok(env)
}

/// Execute `path` in `env`, returning the chunk's first return value.
///
/// `env` is built by the caller from [`file_env`] so that it can add its own
/// bindings before the chunk runs.
pub fn exec_file_in(lua: &Lua, path: &Path, env: LuaTable) -> LuaResult<LuaValue> {
  let (canonical, content) = read_source(path)?;
  let dir = canonical
    .parent()
    .unwrap_or(Path::new("."))
    .to_string_lossy()
    .into_owned();

  let prev_dir: Option<String> = lua.named_registry_value(CURRENT_DIR_KEY)?;
  lua.set_named_registry_value(CURRENT_DIR_KEY, dir)?;

  let result = lua
    .load(&content)
    .set_name(format!("@{}", canonical.display()))
    .set_environment(env)
    .eval::<LuaValue>();

  // Restore even on failure; a cleanup error must not mask the load error.
  let _ = lua.set_named_registry_value(CURRENT_DIR_KEY, prev_dir);

  result
}

/// Load and execute a Lua file with `__dir` and `__file` set.
pub fn load_file_with_dir(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let canonical = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))?;
  let env = file_env(lua, &canonical)?;
  exec_file_in(lua, &canonical, env)
}

/// Compile a Lua file into a function without running it.
pub fn load_file_as_function(lua: &Lua, path: &Path) -> LuaResult<LuaFunction> {
  let (canonical, content) = read_source(path)?;
  let env = file_env(lua, &canonical)?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical.display()))
    .set_environment(env)
    .into_function()
}

/// Resolve a possibly relative path against the directory of the running file.
fn resolve_relative(lua: &Lua, path_str: &str) -> LuaResult<PathBuf> {
  let path = Path::new(path_str);
  if path.is_absolute() {
    return Ok(path.to_path_buf());
  }

  let current: Option<String> = lua.named_registry_value(CURRENT_DIR_KEY)?;
  if let Some(current) = current {
    let resolved = Path::new(&current).join(path);
    if resolved.exists() {
      return Ok(resolved);
    }
  }

  Ok(path.to_path_buf())
}

/// `package.searchers[2]` replacement: `package.searchpath` for lookup,
/// [`load_file_with_dir`] for execution.
fn create_lua_searcher(lua: &Lua) -> LuaResult<LuaFunction> {
  lua.create_function(|lua, modname: String| {
    let package: LuaTable = lua.globals().get("package")?;
    let path: String = package.get("path")?;
    let searchpath: LuaFunction = package.get("searchpath")?;

    // (filepath) on success, (nil, errmsg) otherwise
    let found: Option<String> = searchpath.call::<(Option<String>, Option<String>)>((modname.as_str(), path))?.0;

    match found {
      Some(filepath) => {
        let target = PathBuf::from(&filepath);
        let loader = lua.create_function(move |lua, _: LuaMultiValue| load_file_with_dir(lua, &target))?;
        Ok((LuaValue::Function(loader), LuaValue::String(lua.create_string(&filepath)?)))
      }
      None => Ok((
        LuaValue::Nil,
        LuaValue::String(lua.create_string(format!("\n\tno file for module '{}'", modname))?),
      )),
    }
  })
}

fn create_dofile(lua: &Lua) -> LuaResult<LuaFunction> {
  lua.create_function(|lua, path: Option<String>| match path {
    Some(path_str) => {
      let resolved = resolve_relative(lua, &path_str)?;
      load_file_with_dir(lua, &resolved)
    }
    None => Err(LuaError::external("dofile() without path not supported")),
  })
}

fn create_loadfile(lua: &Lua) -> LuaResult<LuaFunction> {
  lua.create_function(|lua, (path, mode): (String, Option<String>)| {
    if let Some(ref m) = mode
      && m != "t"
      && m != "bt"
    {
      return Err(LuaError::external(format!(
        "loadfile mode '{}' not supported (only 't' and 'bt' allowed)",
        m
      )));
    }

    let resolved = resolve_relative(lua, &path)?;
    load_file_as_function(lua, &resolved)
  })
}

/// Install the `__dir`-aware `require` searcher, `dofile` and `loadfile`.
pub fn install_loaders(lua: &Lua) -> LuaResult<()> {
  let package: LuaTable = lua.globals().get("package")?;
  let searchers: LuaTable = package.get("searchers")?;
  searchers.set(2, create_lua_searcher(lua)?)?;

  lua.globals().set("dofile", create_dofile(lua)?)?;
  lua.globals().set("loadfile", create_loadfile(lua)?)?;

  Ok(())
}
