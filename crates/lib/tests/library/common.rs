//! Shared helpers for library integration tests.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use modkit_lib::context::{BuildContext, Compat, SharedContext};
use modkit_lib::lua::runtime::create_runtime;
use modkit_lib::module::{InstallError, ModuleReference, install_module};
use modkit_lib::resolve::FsResolver;
use tempfile::TempDir;

/// Isolated project directory with a runtime and a fresh context.
pub struct TestProject {
  pub temp: TempDir,
  pub lua: Lua,
  pub ctx: SharedContext,
  pub resolver: FsResolver,
}

impl TestProject {
  pub fn new(compat: Compat) -> LuaResult<Self> {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    Ok(Self {
      lua: create_runtime()?,
      ctx: BuildContext::new(&root).with_compat(compat).into_shared(),
      resolver: FsResolver::new(&root),
      temp,
    })
  }

  /// Canonical project root.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    write_file(&self.root(), relative_path, content)
  }

  /// Write a file under `lua_modules`.
  pub fn vendor(&self, relative_path: &str, content: &str) -> PathBuf {
    self.write_file(&format!("lua_modules/{}", relative_path), content)
  }

  pub fn install(&self, reference: impl Into<ModuleReference>, options: LuaValue) -> Result<(), InstallError> {
    install_module(&self.lua, &self.ctx, &self.resolver, reference, options)
  }

  /// Evaluate a Lua expression in the project runtime.
  pub fn eval<T: FromLua>(&self, code: &str) -> LuaResult<T> {
    self.lua.load(code).eval()
  }
}

pub fn write_file(root: &Path, relative_path: &str, content: &str) -> PathBuf {
  let path = root.join(relative_path);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}
