use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_LAYER_MODULES_DIR, VENDOR_DIR};
use crate::module::ModuleMeta;
use crate::resolve::is_vendored;

/// Build context shared between the host and the modules it installs.
pub type SharedContext = Rc<RefCell<BuildContext>>;

/// Calling convention used when invoking a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compat {
  /// Previous host generation: the module is called with the module container
  /// as its first argument, followed by `(options, ctx)`.
  Legacy,
  /// The module is called as `module(options, ctx)`.
  #[default]
  Current,
}

impl Compat {
  pub fn as_str(&self) -> &'static str {
    match self {
      Compat::Legacy => "legacy",
      Compat::Current => "current",
    }
  }
}

impl fmt::Display for Compat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Compat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "legacy" => Ok(Compat::Legacy),
      "current" => Ok(Compat::Current),
      other => Err(format!("unknown compat mode '{}' (expected 'legacy' or 'current')", other)),
    }
  }
}

/// A configuration layer contributing a source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
  pub cwd: PathBuf,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub src_dir: Option<PathBuf>,
  /// Module subdirectory of the source directory, `modules` when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub modules_dir: Option<String>,
}

impl LayerDescriptor {
  pub fn new(cwd: impl Into<PathBuf>) -> Self {
    Self {
      cwd: cwd.into(),
      src_dir: None,
      modules_dir: None,
    }
  }

  /// Source directory of the layer, `cwd` when no override is set.
  pub fn source_dir(&self) -> PathBuf {
    match &self.src_dir {
      Some(src) => self.cwd.join(src),
      None => self.cwd.clone(),
    }
  }

  /// Local module directory of this layer, or `None` for vendored layers.
  pub fn local_module_dir(&self) -> Option<PathBuf> {
    let src = self.source_dir();
    if is_vendored(&src) {
      return None;
    }
    let modules = self.modules_dir.as_deref().unwrap_or(DEFAULT_LAYER_MODULES_DIR);
    Some(src.join(modules))
  }
}

/// One entry of the installed-module ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstalledModuleRecord {
  pub meta: ModuleMeta,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timings: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entry_path: Option<PathBuf>,
}

/// Mutable build state threaded through every install.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildContext {
  pub root_dir: PathBuf,
  pub compat: Compat,
  pub layers: Vec<LayerDescriptor>,
  /// Paths of installed vendored code, relative to the vendored directory.
  pub transpile: Vec<String>,
  /// Roots searched for bare specifiers and legacy loads.
  pub modules_dirs: Vec<PathBuf>,
  /// Append-only installed-module ledger.
  pub installed_modules: Vec<InstalledModuleRecord>,
  /// Free-form options modules read and write through `ctx:get()` / `ctx:set()`.
  pub options: serde_json::Map<String, serde_json::Value>,
}

impl BuildContext {
  /// Context rooted at `root_dir` with a single root layer and
  /// `<root>/lua_modules` as module directory.
  pub fn new(root_dir: impl Into<PathBuf>) -> Self {
    let root_dir = root_dir.into();
    Self {
      layers: vec![LayerDescriptor::new(&root_dir)],
      modules_dirs: vec![root_dir.join(VENDOR_DIR)],
      root_dir,
      ..Default::default()
    }
  }

  pub fn with_compat(mut self, compat: Compat) -> Self {
    self.compat = compat;
    self
  }

  pub fn into_shared(self) -> SharedContext {
    Rc::new(RefCell::new(self))
  }

  /// Module directories of all non-vendored layers.
  pub fn local_layer_module_dirs(&self) -> BTreeSet<PathBuf> {
    self
      .layers
      .iter()
      .filter_map(LayerDescriptor::local_module_dir)
      .collect()
  }

  /// Add a module search root unless it is already present.
  pub fn add_modules_dir(&mut self, dir: &Path) {
    if !self.modules_dirs.iter().any(|d| d == dir) {
      self.modules_dirs.push(dir.to_path_buf());
    }
  }
}
