//! Implementation of the `modkit install` command.
//!
//! Evaluates a project file, installs every module it lists and reports the
//! resulting ledger along with the transpile list and module directories.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use modkit_lib::context::InstalledModuleRecord;
use modkit_lib::eval::evaluate_project;

use crate::output::{OutputFormat, format_millis, print_info, print_json, print_stat, print_success, symbols};

fn record_label(record: &InstalledModuleRecord) -> String {
  if let Some(name) = record.meta.get("name").and_then(|v| v.as_str()) {
    return name.to_string();
  }
  match &record.entry_path {
    Some(path) => path.display().to_string(),
    None => "<inline module>".to_string(),
  }
}

fn setup_timing(record: &InstalledModuleRecord) -> Option<f64> {
  record.timings.as_ref()?.get("setup")?.as_f64()
}

pub fn cmd_install(config: &Path, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  debug!(config = %config.display(), "evaluating project");

  let ctx = evaluate_project(config).with_context(|| format!("Failed to evaluate project: {}", config.display()))?;

  if output.is_json() {
    return print_json(&ctx);
  }

  if ctx.installed_modules.is_empty() {
    print_info("No modules installed");
  } else {
    for record in &ctx.installed_modules {
      let label = record_label(record);
      match setup_timing(record) {
        Some(ms) => println!("  {} {} ({})", symbols::ARROW, label, format_millis(ms)),
        None => println!("  {} {}", symbols::ARROW, label),
      }
    }
    println!();
    print_success(&format!("Installed {} module(s)", ctx.installed_modules.len()));
  }

  print_stat("Compat", ctx.compat.as_str());
  print_stat("Transpile", &ctx.transpile.join(", "));
  let dirs: Vec<String> = ctx.modules_dirs.iter().map(|d| d.display().to_string()).collect();
  print_stat("Module dirs", &dirs.join(", "));
  print_stat("Duration", &format_millis(start.elapsed().as_secs_f64() * 1000.0));

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use modkit_lib::module::ModuleMeta;
  use serde_json::json;
  use std::path::PathBuf;

  #[test]
  fn label_prefers_meta_name() {
    let mut meta = ModuleMeta::new();
    meta.insert("name", json!("greeter"));
    let record = InstalledModuleRecord {
      meta,
      timings: None,
      entry_path: Some(PathBuf::from("greeter")),
    };
    assert_eq!(record_label(&record), "greeter");
  }

  #[test]
  fn label_falls_back_to_entry_then_inline() {
    let mut record = InstalledModuleRecord {
      entry_path: Some(PathBuf::from("my-mod")),
      ..Default::default()
    };
    assert_eq!(record_label(&record), "my-mod");

    record.entry_path = None;
    assert_eq!(record_label(&record), "<inline module>");
  }

  #[test]
  fn setup_timing_reads_number() {
    let record = InstalledModuleRecord {
      timings: Some(json!({ "setup": 5 })),
      ..Default::default()
    };
    assert_eq!(setup_timing(&record), Some(5.0));
  }
}
