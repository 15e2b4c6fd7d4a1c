use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::resolve::{get_directory, is_vendored, normalize_lexically};

/// Create the `modkit.path` table.
pub fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  // modkit.path.join(...)
  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut result = PathBuf::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          result.push(s.to_str()?.as_ref());
        }
      }
      Ok(result.to_string_lossy().into_owned())
    })?,
  )?;

  // modkit.path.dirname(path)
  path.set(
    "dirname",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .parent()
          .map(|p| p.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // modkit.path.basename(path)
  path.set(
    "basename",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  path.set(
    "is_absolute",
    lua.create_function(|_, path_str: String| Ok(Path::new(&path_str).is_absolute()))?,
  )?;

  path.set(
    "normalize",
    lua.create_function(|_, path_str: String| Ok(normalize_lexically(Path::new(&path_str)).to_string_lossy().into_owned()))?,
  )?;

  // modkit.path.directory(path) - containing directory of an existing absolute file
  path.set(
    "directory",
    lua.create_function(|_, path_str: String| Ok(get_directory(Path::new(&path_str)).to_string_lossy().into_owned()))?,
  )?;

  path.set(
    "is_vendored",
    lua.create_function(|_, path_str: String| Ok(is_vendored(Path::new(&path_str))))?,
  )?;

  Ok(path)
}
