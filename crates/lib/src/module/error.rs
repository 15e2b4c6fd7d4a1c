use std::path::PathBuf;

use mlua::prelude::*;

use crate::resolve::ResolveError;

/// Why a single entry candidate could not be used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
  #[error("candidate '{candidate}' did not resolve: {source}")]
  Resolve {
    candidate: String,
    #[source]
    source: ResolveError,
  },

  #[error("candidate '{candidate}' failed to load from {}: {source}", path.display())]
  Load {
    candidate: String,
    path: PathBuf,
    #[source]
    source: LuaError,
  },
}

impl LoadError {
  pub fn candidate(&self) -> &str {
    match self {
      LoadError::Resolve { candidate, .. } | LoadError::Load { candidate, .. } => candidate,
    }
  }
}

/// Errors surfaced by an install call.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
  /// None of the specifier's candidates produced a module.
  #[error("error while requiring module '{specifier}': {}", last_attempt(.attempts))]
  ResolutionExhausted {
    specifier: String,
    /// One entry per candidate, in the order they were tried.
    attempts: Vec<LoadError>,
    #[source]
    source: Option<Box<LoadError>>,
  },

  /// The module resolved to something that cannot be called.
  #[error("module should be a function, got {found}")]
  InvalidModuleContract { found: String },

  #[error("cannot read module metadata {}: {source}", path.display())]
  MetadataRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The sidecar descriptor exists but is not a JSON object.
  #[error("invalid module metadata {}: {source}", path.display())]
  MetadataParse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// The module itself raised an error.
  #[error("module '{module}' failed: {source}")]
  CallableExecution {
    module: String,
    #[source]
    source: LuaError,
  },

  #[error("lua error: {0}")]
  Lua(#[from] LuaError),
}

fn last_attempt(attempts: &[LoadError]) -> String {
  attempts
    .last()
    .map(ToString::to_string)
    .unwrap_or_else(|| "no candidates".to_string())
}
