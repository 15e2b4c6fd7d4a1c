//! Project file evaluation.
//!
//! A project file (`modkit.lua` by default) returns a table describing the
//! build context and the modules to install:
//!
//! ```lua
//! return {
//!   compat = "current",              -- or "legacy"
//!   src_dir = "src",                 -- source dir of the root layer
//!   modules_dirs = { "vendor" },     -- extra module roots, relative to the project
//!   aliases = { ["~"] = "src" },
//!   layers = {
//!     { cwd = "layers/base", modules_dir = "plugins" },
//!   },
//!   modules = {
//!     "my-mod",                             -- specifier
//!     { "./local/mod", { flag = true } },   -- specifier with options
//!     function(options, ctx) end,           -- inline module
//!   },
//! }
//! ```
//!
//! Modules are installed in declaration order into a single shared context.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::info;

use crate::context::{BuildContext, Compat, LayerDescriptor};
use crate::lua::{loaders, runtime};
use crate::module::{InstallError, ModuleCallable, ModuleReference, install_module};
use crate::resolve::FsResolver;

/// Errors that can occur during project evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
  #[error("project file not found: {}: {source}", path.display())]
  NotFound {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Lua evaluation error.
  #[error("lua error: {0}")]
  Lua(#[from] LuaError),

  /// The project table has an unexpected shape.
  #[error("invalid project config: {0}")]
  Config(String),

  #[error(transparent)]
  Install(#[from] InstallError),
}

/// Build context and resolver described by a project file.
#[derive(Debug, Clone)]
pub struct Project {
  pub ctx: BuildContext,
  pub resolver: FsResolver,
}

/// Read a project file without installing its modules.
pub fn load_project(path: &Path) -> Result<Project, EvalError> {
  let lua = runtime::create_runtime()?;
  let (project, _) = read_project(&lua, path)?;
  Ok(project)
}

/// Evaluate a project file and install every module it lists.
///
/// Returns the final build context, ledger included. The first failing
/// install aborts evaluation.
pub fn evaluate_project(path: &Path) -> Result<BuildContext, EvalError> {
  let ctx = {
    let lua = runtime::create_runtime()?;
    let (Project { ctx, resolver }, config) = read_project(&lua, path)?;
    runtime::extend_package_path(&lua, &ctx.modules_dirs)?;

    let ctx = ctx.into_shared();
    if let Some(modules) = config.get::<Option<LuaTable>>("modules")? {
      for (index, entry) in modules.sequence_values::<LuaValue>().enumerate() {
        let (reference, options) = parse_module_entry(index + 1, entry?)?;
        install_module(&lua, &ctx, &resolver, reference, options)?;
      }
    }

    info!(
      installed = ctx.borrow().installed_modules.len(),
      "project evaluated"
    );
    ctx
  };

  // The runtime is gone, so this is normally the last reference.
  Ok(
    Rc::try_unwrap(ctx)
      .map(RefCell::into_inner)
      .unwrap_or_else(|shared| shared.borrow().clone()),
  )
}

fn read_project(lua: &Lua, path: &Path) -> Result<(Project, LuaTable), EvalError> {
  let path = dunce::canonicalize(path).map_err(|source| EvalError::NotFound {
    path: path.to_path_buf(),
    source,
  })?;
  let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();

  let config = match loaders::load_file_with_dir(lua, &path)? {
    LuaValue::Table(t) => t,
    other => {
      return Err(EvalError::Config(format!(
        "project file must return a table, got {}",
        other.type_name()
      )));
    }
  };

  let project = parse_project(&root, &config)?;
  Ok((project, config))
}

fn parse_project(root: &Path, config: &LuaTable) -> Result<Project, EvalError> {
  let compat = match config.get::<Option<String>>("compat")? {
    Some(s) => s.parse::<Compat>().map_err(EvalError::Config)?,
    None => Compat::default(),
  };

  let mut ctx = BuildContext::new(root).with_compat(compat);

  if let Some(src_dir) = config.get::<Option<String>>("src_dir")?
    && let Some(root_layer) = ctx.layers.first_mut()
  {
    root_layer.src_dir = Some(PathBuf::from(src_dir));
  }

  if let Some(layers) = config.get::<Option<LuaTable>>("layers")? {
    for layer in layers.sequence_values::<LuaTable>() {
      ctx.layers.push(parse_layer(root, &layer?)?);
    }
  }

  if let Some(dirs) = config.get::<Option<Vec<String>>>("modules_dirs")? {
    for dir in dirs {
      ctx.add_modules_dir(&root.join(dir));
    }
  }

  let mut resolver = FsResolver::new(root);
  if let Some(aliases) = config.get::<Option<LuaTable>>("aliases")? {
    for pair in aliases.pairs::<String, String>() {
      let (alias, target) = pair?;
      resolver = resolver.with_alias(alias, target);
    }
  }

  Ok(Project { ctx, resolver })
}

fn parse_layer(root: &Path, layer: &LuaTable) -> Result<LayerDescriptor, EvalError> {
  let cwd: String = layer
    .get("cwd")
    .map_err(|_| EvalError::Config("layer requires a 'cwd' string".to_string()))?;

  Ok(LayerDescriptor {
    cwd: root.join(cwd),
    src_dir: layer.get::<Option<String>>("src_dir")?.map(PathBuf::from),
    modules_dir: layer.get("modules_dir")?,
  })
}

/// Parse one entry of the `modules` list into a reference and its options.
fn parse_module_entry(index: usize, entry: LuaValue) -> Result<(ModuleReference, LuaValue), EvalError> {
  if ModuleCallable::is_callable(&entry) {
    return Ok((ModuleCallable::from_value(entry)?.into(), LuaValue::Nil));
  }

  match entry {
    LuaValue::String(s) => Ok((ModuleReference::Named(s.to_str()?.to_string()), LuaValue::Nil)),
    LuaValue::Table(tuple) => {
      let target: LuaValue = tuple.raw_get(1)?;
      let options: LuaValue = tuple.raw_get(2)?;
      match target {
        LuaValue::String(s) => Ok((ModuleReference::Named(s.to_str()?.to_string()), options)),
        callable if ModuleCallable::is_callable(&callable) => {
          Ok((ModuleCallable::from_value(callable)?.into(), options))
        }
        other => Err(EvalError::Config(format!(
          "modules[{}]: expected a specifier or a module, got {}",
          index,
          other.type_name()
        ))),
      }
    }
    other => Err(EvalError::Config(format!(
      "modules[{}]: expected a specifier, a module or {{ module, options }}, got {}",
      index,
      other.type_name()
    ))),
  }
}
