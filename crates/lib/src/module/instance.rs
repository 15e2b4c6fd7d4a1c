//! Turning a [`ModuleReference`] into a callable plus its build-time metadata.

use std::fs;
use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::{debug, error};

use super::error::{InstallError, LoadError};
use super::load;
use super::types::{ModuleCallable, ModuleMeta, ModuleReference};
use crate::consts::SIDECAR_FILE;
use crate::resolve::{PathResolver, candidates};

/// Obtain the callable behind `reference` and the metadata shipped next to it.
///
/// Callables are returned as-is with empty metadata. Specifiers are tried as
/// `<s>/modkit`, `<s>/module` and `<s>`; the first candidate that resolves and
/// loads wins. A candidate that fails to resolve or load only moves the search
/// on to the next one, while a broken `module.json` next to a loaded entry is
/// fatal.
pub fn load_instance(
  lua: &Lua,
  reference: ModuleReference,
  search_paths: &[PathBuf],
  resolver: &dyn PathResolver,
) -> Result<(ModuleCallable, ModuleMeta), InstallError> {
  let specifier = match reference {
    ModuleReference::Callable(callable) => return Ok((callable, ModuleMeta::default())),
    ModuleReference::Named(specifier) => specifier,
  };

  let mut attempts = Vec::new();
  for candidate in candidates(&specifier) {
    let src = match resolver.resolve_path(&candidate, search_paths) {
      Ok(src) => src,
      Err(source) => {
        debug!(candidate = %candidate, error = %source, "candidate did not resolve");
        attempts.push(LoadError::Resolve { candidate, source });
        continue;
      }
    };

    match load::load(lua, &src, search_paths) {
      Ok(value) => {
        debug!(candidate = %candidate, path = %src.display(), "module loaded");
        let meta = read_sidecar(&src)?;
        let callable = ModuleCallable::from_value(value)?;
        return Ok((callable, meta));
      }
      Err(source) => {
        debug!(candidate = %candidate, error = %source, "candidate failed to load");
        attempts.push(LoadError::Load {
          candidate,
          path: src,
          source,
        });
      }
    }
  }

  let source = attempts.last().cloned().map(Box::new);
  if let Some(last) = &source {
    error!(module = %specifier, error = %last, "error while requiring module");
  }

  Err(InstallError::ResolutionExhausted {
    specifier,
    attempts,
    source,
  })
}

/// Read `module.json` from the directory of `entry`, if there is one.
pub fn read_sidecar(entry: &Path) -> Result<ModuleMeta, InstallError> {
  let path = entry.parent().unwrap_or(Path::new(".")).join(SIDECAR_FILE);
  if !path.is_file() {
    return Ok(ModuleMeta::default());
  }

  let content = fs::read_to_string(&path).map_err(|source| InstallError::MetadataRead {
    path: path.clone(),
    source,
  })?;

  serde_json::from_str(&content).map_err(|source| InstallError::MetadataParse { path, source })
}
