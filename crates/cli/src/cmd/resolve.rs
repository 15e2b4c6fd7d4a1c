//! Implementation of the `modkit resolve` command.

use std::path::Path;

use anyhow::{Context, Result, bail};

use modkit_lib::eval::load_project;
use modkit_lib::resolve::{PathResolver, candidates};

use crate::output::{print_info, print_stat, print_success, print_warning};

pub fn cmd_resolve(specifier: &str, config: &Path) -> Result<()> {
  let project = load_project(config).with_context(|| format!("Failed to load project: {}", config.display()))?;

  print_info(&format!("Resolving '{}'", specifier));
  print_stat("Alias", &project.resolver.resolve_alias(specifier).display().to_string());

  let mut resolved = None;
  for candidate in candidates(specifier) {
    match project.resolver.resolve_path(&candidate, &project.ctx.modules_dirs) {
      Ok(path) => {
        print_success(&format!("{} -> {}", candidate, path.display()));
        if resolved.is_none() {
          resolved = Some(path);
        }
      }
      Err(err) => print_warning(&err.to_string()),
    }
  }

  match resolved {
    Some(path) => {
      print_stat("Entry", &path.display().to_string());
      Ok(())
    }
    None => bail!("no candidate of '{}' resolved", specifier),
  }
}
