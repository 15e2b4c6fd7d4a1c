//! Specifier resolution.
//!
//! Turns a module specifier (a package name, an aliased path or a filesystem
//! path) into the ordered list of entry candidates the installer tries, and
//! provides the path helpers used for vendored-directory bookkeeping.
//!
//! The actual specifier-to-file mapping is delegated to a [`PathResolver`].
//! [`FsResolver`] is the default implementation used by project evaluation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::consts::{APP_NAME, MODULE_ENTRY, VENDOR_DIR};

/// Errors returned by a [`PathResolver`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
  #[error("cannot resolve '{specifier}' (tried {})", display_tried(.tried))]
  NotFound { specifier: String, tried: Vec<PathBuf> },

  #[error("invalid specifier '{0}'")]
  InvalidSpecifier(String),
}

fn display_tried(tried: &[PathBuf]) -> String {
  if tried.is_empty() {
    return "nothing".to_string();
  }
  tried
    .iter()
    .map(|p| p.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Maps specifiers to concrete files.
///
/// Implementations are authoritative: whatever path `resolve_path` returns is
/// what the loader attempts.
pub trait PathResolver {
  /// Resolve `specifier` to an existing entry file, searching bare specifiers
  /// in `modules_dirs`.
  fn resolve_path(&self, specifier: &str, modules_dirs: &[PathBuf]) -> Result<PathBuf, ResolveError>;

  /// Apply alias rules to `specifier` without touching the filesystem.
  fn resolve_alias(&self, specifier: &str) -> PathBuf;
}

/// Entry candidates for a string specifier, in the order they are tried.
pub fn candidates(specifier: &str) -> [String; 3] {
  let base = specifier.trim_end_matches('/');
  [
    format!("{}/{}", base, APP_NAME),
    format!("{}/{}", base, MODULE_ENTRY),
    specifier.to_string(),
  ]
}

/// Containing directory of `path` when it is an absolute path to a regular file.
///
/// Any other input is returned unchanged. A failing stat call is not an error
/// here: the path is returned as-is and a missing module surfaces later as a
/// resolution failure.
pub fn get_directory(path: &Path) -> PathBuf {
  if path.is_absolute() {
    match fs::metadata(path) {
      Ok(meta) if meta.is_file() => {
        if let Some(parent) = path.parent() {
          return parent.to_path_buf();
        }
      }
      Ok(_) => {}
      Err(e) => trace!(path = %path.display(), error = %e, "stat failed"),
    }
  }
  path.to_path_buf()
}

/// Transpile-list form of a module path: the directory-normalized path with
/// everything up to and including the last vendored segment removed.
pub fn normalize_module_transpile_path(specifier: &str) -> String {
  let dir = get_directory(Path::new(specifier));
  let components: Vec<Component> = dir.components().collect();

  let last_vendor = components.iter().rposition(|c| c.as_os_str() == VENDOR_DIR);
  match last_vendor {
    Some(idx) if idx + 1 < components.len() => {
      let tail: PathBuf = components[idx + 1..].iter().collect();
      tail.to_string_lossy().replace('\\', "/")
    }
    _ => dir.to_string_lossy().into_owned(),
  }
}

/// Lexically normalize a path, dropping `.` and folding `..`.
///
/// The filesystem is never consulted, so symlinks are not followed.
pub fn normalize_lexically(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::ParentDir => {
        normalized.pop();
      }
      Component::CurDir => {}
      _ => normalized.push(component),
    }
  }
  normalized
}

/// Whether `path` lives under a vendored directory.
pub fn is_vendored(path: &Path) -> bool {
  path.components().any(|c| c.as_os_str() == VENDOR_DIR)
}

/// Filesystem-backed resolver.
///
/// Resolution order for a specifier:
/// 1. Alias prefixes are rewritten (longest alias first)
/// 2. Absolute paths are used directly, `./` and `../` paths are joined to the root,
///    bare specifiers are looked up in each module directory
/// 3. Each base is tried as a file, then with `.lua`, then as `<base>/init.lua`
#[derive(Debug, Clone)]
pub struct FsResolver {
  root: PathBuf,
  aliases: BTreeMap<String, PathBuf>,
}

impl FsResolver {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      aliases: BTreeMap::new(),
    }
  }

  /// Register an alias. Relative targets are taken relative to the root.
  pub fn with_alias(mut self, alias: impl Into<String>, target: impl AsRef<Path>) -> Self {
    let target = target.as_ref();
    let target = if target.is_absolute() {
      target.to_path_buf()
    } else {
      self.root.join(target)
    };
    self.aliases.insert(alias.into(), target);
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Rewrite an aliased specifier. Returns `None` if no alias applies.
  fn expand_alias(&self, specifier: &str) -> Option<PathBuf> {
    let mut aliases: Vec<_> = self.aliases.iter().collect();
    aliases.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));

    for (alias, target) in aliases {
      if specifier == alias {
        return Some(target.clone());
      }
      if let Some(rest) = specifier.strip_prefix(alias.as_str())
        && let Some(rest) = rest.strip_prefix('/')
      {
        return Some(normalize_lexically(&target.join(rest)));
      }
    }
    None
  }

  fn search_bases(&self, specifier: &str, modules_dirs: &[PathBuf]) -> Vec<PathBuf> {
    if let Some(expanded) = self.expand_alias(specifier) {
      return vec![expanded];
    }

    let path = Path::new(specifier);
    if path.is_absolute() {
      vec![path.to_path_buf()]
    } else if specifier.starts_with("./") || specifier.starts_with("../") {
      vec![normalize_lexically(&self.root.join(path))]
    } else {
      modules_dirs.iter().map(|dir| dir.join(path)).collect()
    }
  }
}

impl PathResolver for FsResolver {
  fn resolve_path(&self, specifier: &str, modules_dirs: &[PathBuf]) -> Result<PathBuf, ResolveError> {
    if specifier.is_empty() {
      return Err(ResolveError::InvalidSpecifier(specifier.to_string()));
    }

    let mut tried = Vec::new();
    for base in self.search_bases(specifier, modules_dirs) {
      let mut with_ext = base.clone().into_os_string();
      with_ext.push(".lua");

      for candidate in [base.clone(), PathBuf::from(with_ext), base.join("init.lua")] {
        if candidate.is_file() {
          trace!(specifier, path = %candidate.display(), "resolved");
          return Ok(candidate);
        }
        tried.push(candidate);
      }
    }

    Err(ResolveError::NotFound {
      specifier: specifier.to_string(),
      tried,
    })
  }

  fn resolve_alias(&self, specifier: &str) -> PathBuf {
    if let Some(expanded) = self.expand_alias(specifier) {
      return expanded;
    }
    if specifier.starts_with("./") || specifier.starts_with("../") {
      return normalize_lexically(&self.root.join(specifier));
    }
    PathBuf::from(specifier)
  }
}
