//! Module installation.

use std::path::Path;

use mlua::prelude::*;
use tracing::{info, warn};

use super::error::InstallError;
use super::instance::load_instance;
use super::types::{InstallResult, ModuleReference};
use crate::context::{InstalledModuleRecord, SharedContext};
use crate::resolve::{PathResolver, get_directory, normalize_module_transpile_path};

/// Install a module into `ctx`.
///
/// Steps, in order:
/// 1. Load the module (see [`load_instance`])
/// 2. Collect the module directories of the local (non-vendored) layers
/// 3. Call the module with `options` (an empty table when `nil`) under the
///    context's calling convention
/// 4. Stop without recording anything if the module returned `false`
/// 5. For specifiers, record the transpile path and, when the specifier is a
///    file outside the local layer module directories, add its directory to
///    `ctx.modules_dirs`
/// 6. Append an [`InstalledModuleRecord`] to the ledger
///
/// Errors from loading and from the module itself propagate unchanged.
/// Mutations already applied to `ctx` are not rolled back.
pub fn install_module(
  lua: &Lua,
  ctx: &SharedContext,
  resolver: &dyn PathResolver,
  reference: impl Into<ModuleReference>,
  options: LuaValue,
) -> Result<(), InstallError> {
  let reference = reference.into();
  let label = reference.to_string();
  let specifier = reference.specifier().map(str::to_string);

  let search_paths = ctx.borrow().modules_dirs.clone();
  let (module, build_meta) = load_instance(lua, reference, &search_paths, resolver)?;

  let (local_layer_dirs, compat) = {
    let c = ctx.borrow();
    (c.local_layer_module_dirs(), c.compat)
  };

  let options = match options {
    LuaValue::Nil => LuaValue::Table(lua.create_table()?),
    other => other,
  };

  // No borrow is held here: the module mutates ctx through its Lua handle.
  let returned = module
    .invoke(lua, compat, ctx, options)
    .map_err(|source| InstallError::CallableExecution {
      module: label.clone(),
      source,
    })?;

  let timings = match InstallResult::from_lua(lua, returned)? {
    InstallResult::Aborted => {
      warn!(module = %label, "module setup returned false, skipping");
      return Ok(());
    }
    InstallResult::Completed { timings } => timings,
  };

  if let Some(spec) = &specifier {
    let mut c = ctx.borrow_mut();
    c.transpile.push(normalize_module_transpile_path(spec));

    let directory = get_directory(Path::new(spec));
    if directory != Path::new(spec) && !local_layer_dirs.contains(&directory) {
      c.modules_dirs.push(directory);
    }
  }

  let meta = module.get_meta(lua)?.merged_over(build_meta);
  let record = InstalledModuleRecord {
    meta,
    timings,
    entry_path: specifier.as_deref().map(|s| resolver.resolve_alias(s)),
  };

  info!(module = %label, name = ?record.meta.get("name"), "installed module");
  ctx.borrow_mut().installed_modules.push(record);

  Ok(())
}
