//! Tests for evaluating `modkit.lua` project files.

use std::path::Path;

use modkit_lib::context::Compat;
use modkit_lib::eval::{EvalError, evaluate_project, load_project};
use modkit_lib::module::InstallError;
use serde_json::json;
use tempfile::TempDir;

use super::common::write_file;

fn project_root(temp: &TempDir) -> std::path::PathBuf {
  dunce::canonicalize(temp.path()).unwrap()
}

#[test]
fn layered_project_installs_in_order() -> Result<(), EvalError> {
  let temp = TempDir::new().unwrap();
  let root = project_root(&temp);
  let config = write_file(
    &root,
    "modkit.lua",
    r#"
      return {
        src_dir = "src",
        aliases = { ["~"] = "src" },
        layers = { { cwd = "lua_modules/base-layer" } },
        modules = {
          "~/modules/local-mod/init.lua",
          { "base", { level = 2 } },
        },
      }
    "#,
  );
  write_file(
    &root,
    "src/modules/local-mod/init.lua",
    r#"return function(_, ctx) ctx:set("order", { "local" }) end"#,
  );
  write_file(
    &root,
    "lua_modules/base/modkit.lua",
    r#"
      return modkit.define_module({
        meta = { name = "base" },
        defaults = { level = 1 },
        setup = function(options, ctx)
          local order = ctx:get("order")
          table.insert(order, "base")
          ctx:set("order", order)
          ctx:set("level", options.level)
        end,
      })
    "#,
  );

  let ctx = evaluate_project(&config)?;

  assert_eq!(ctx.options.get("order"), Some(&json!(["local", "base"])));
  assert_eq!(ctx.options.get("level"), Some(&json!(2)));
  assert_eq!(ctx.installed_modules.len(), 2);
  assert_eq!(
    ctx.installed_modules[0].entry_path,
    Some(root.join("src").join("modules/local-mod/init.lua"))
  );
  assert_eq!(ctx.installed_modules[1].meta.get("name"), Some(&json!("base")));
  assert_eq!(ctx.transpile.last(), Some(&"base".to_string()));
  Ok(())
}

#[test]
fn legacy_project_uses_container_convention() -> Result<(), EvalError> {
  let temp = TempDir::new().unwrap();
  let root = project_root(&temp);
  let config = write_file(
    &root,
    "modkit.lua",
    r#"
      return {
        compat = "legacy",
        modules = {
          function(container, options, ctx)
            container:add_transpile("inline-legacy")
          end,
        },
      }
    "#,
  );

  let ctx = evaluate_project(&config)?;
  assert_eq!(ctx.compat, Compat::Legacy);
  assert_eq!(ctx.transpile, vec!["inline-legacy".to_string()]);
  Ok(())
}

#[test]
fn failing_module_stops_evaluation() {
  let temp = TempDir::new().unwrap();
  let root = project_root(&temp);
  let config = write_file(
    &root,
    "modkit.lua",
    r#"return { modules = { "exploding" } }"#,
  );
  write_file(&root, "lua_modules/exploding/init.lua", "return function() error('kaboom') end");

  let err = evaluate_project(&config).unwrap_err();
  match err {
    EvalError::Install(InstallError::CallableExecution { module, source }) => {
      assert_eq!(module, "exploding");
      assert!(source.to_string().contains("kaboom"));
    }
    other => panic!("unexpected error: {}", other),
  }
}

#[test]
fn load_project_does_not_install() -> Result<(), EvalError> {
  let temp = TempDir::new().unwrap();
  let root = project_root(&temp);
  let config = write_file(
    &root,
    "modkit.lua",
    r#"return { modules_dirs = { "vendor" }, modules = { "never-installed" } }"#,
  );

  let project = load_project(&config)?;
  assert!(project.ctx.installed_modules.is_empty());
  assert_eq!(
    project.ctx.modules_dirs,
    vec![root.join("lua_modules"), root.join("vendor")]
  );
  Ok(())
}

#[test]
fn project_file_dir_helpers_are_available() -> Result<(), EvalError> {
  let temp = TempDir::new().unwrap();
  let root = project_root(&temp);
  let config = write_file(
    &root,
    "modkit.lua",
    r#"
      local settings = dofile("./settings.lua")
      return {
        modules = {
          function(_, ctx)
            ctx:set("name", settings.name)
            ctx:set("file", modkit.path.basename(__file))
          end,
        },
      }
    "#,
  );
  write_file(&root, "settings.lua", r#"return { name = "demo" }"#);

  let ctx = evaluate_project(&config)?;
  assert_eq!(ctx.options.get("name"), Some(&json!("demo")));
  assert_eq!(ctx.options.get("file"), Some(&json!("modkit.lua")));
  Ok(())
}

#[test]
fn missing_config_reports_path() {
  let err = evaluate_project(Path::new("/nonexistent/project/modkit.lua")).unwrap_err();
  assert!(err.to_string().contains("/nonexistent/project/modkit.lua"), "got: {}", err);
}
