//! Tests for installing modules into a shared context.

use std::error::Error;
use std::path::PathBuf;

use mlua::prelude::*;
use modkit_lib::context::Compat;
use modkit_lib::module::{InstallError, LoadError};
use serde_json::json;

use super::common::TestProject;

mod resolution {
  use super::*;

  #[test]
  fn module_candidate_with_sidecar() -> Result<(), Box<dyn Error>> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor("my-mod/module.lua", "return function() return { timings = { setup = 5 } } end");
    project.vendor("my-mod/module.json", r#"{ "version": "1.0" }"#);

    project.install("my-mod", LuaValue::Nil)?;

    let ctx = project.ctx.borrow();
    let record = serde_json::to_value(&ctx.installed_modules[0])?;
    assert_eq!(
      record,
      json!({ "meta": { "version": "1.0" }, "timings": { "setup": 5 }, "entry_path": "my-mod" })
    );
    Ok(())
  }

  #[test]
  fn exhausted_error_chains_candidate_failures() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;

    let err = project.install("ghost", LuaValue::Nil).unwrap_err();
    assert!(err.to_string().contains("error while requiring module 'ghost'"), "got: {}", err);

    let cause = err.source().expect("exhausted error carries its last attempt");
    assert!(cause.to_string().starts_with("candidate 'ghost'"), "got: {}", cause);
    assert!(cause.source().is_some(), "per-candidate error is chained");

    match err {
      InstallError::ResolutionExhausted { attempts, .. } => {
        let tried: Vec<&str> = attempts.iter().map(LoadError::candidate).collect();
        assert_eq!(tried, vec!["ghost/modkit", "ghost/module", "ghost"]);
      }
      other => panic!("unexpected error: {}", other),
    }
    Ok(())
  }

  #[test]
  fn relative_specifier_resolves_from_root() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.write_file("mods/local.lua", "return function(_, ctx) ctx:set('local', true) end");

    project.install("./mods/local", LuaValue::Nil).unwrap();

    let ctx = project.ctx.borrow();
    assert_eq!(ctx.options.get("local"), Some(&json!(true)));
    assert_eq!(
      ctx.installed_modules[0].entry_path,
      Some(project.root().join("mods/local"))
    );
    Ok(())
  }

  #[test]
  fn added_module_dir_serves_later_installs() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    let entry = project.write_file("extra/bundle/init.lua", "return function() end");
    project.write_file("extra/bundle/sibling.lua", "return function(_, ctx) ctx:set('sibling', 1) end");

    project.install(entry.to_string_lossy().into_owned(), LuaValue::Nil).unwrap();
    assert_eq!(
      project.ctx.borrow().modules_dirs.last(),
      Some(&project.root().join("extra").join("bundle"))
    );

    project.install("sibling", LuaValue::Nil).unwrap();
    assert_eq!(project.ctx.borrow().options.get("sibling"), Some(&json!(1)));
    Ok(())
  }
}

mod conventions {
  use super::*;

  #[test]
  fn default_export_is_unwrapped() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor(
      "wrapped/init.lua",
      "return { default = function(_, ctx) ctx:set('via', 'default') end }",
    );

    project.install("wrapped", LuaValue::Nil).unwrap();
    assert_eq!(project.ctx.borrow().options.get("via"), Some(&json!("default")));
    Ok(())
  }

  #[test]
  fn legacy_exports_are_loaded() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor(
      "cjs/init.lua",
      r#"
        module.exports = function(_, ctx) ctx:set("via", "exports") end
      "#,
    );

    project.install("cjs", LuaValue::Nil).unwrap();
    assert_eq!(project.ctx.borrow().options.get("via"), Some(&json!("exports")));
    Ok(())
  }

  #[test]
  fn legacy_module_body_runs_once_per_install() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor(
      "old/init.lua",
      r#"
        load_count = (load_count or 0) + 1
        module.exports = function() end
      "#,
    );

    project.install("old", LuaValue::Nil).unwrap();

    assert_eq!(project.eval::<i64>("return load_count")?, 1);
    assert_eq!(project.ctx.borrow().installed_modules.len(), 1);
    Ok(())
  }

  #[test]
  fn legacy_compat_passes_container_first() -> LuaResult<()> {
    let project = TestProject::new(Compat::Legacy)?;
    project.vendor(
      "old/init.lua",
      r#"
        return function(container, options, ctx)
          container:add_modules_dir("/opt/shared")
          container.options:set("from", options.from)
        end
      "#,
    );

    let options: LuaValue = project.eval("return { from = 'legacy' }")?;
    project.install("old", options).unwrap();

    let ctx = project.ctx.borrow();
    assert_eq!(ctx.options.get("from"), Some(&json!("legacy")));
    assert!(ctx.modules_dirs.contains(&PathBuf::from("/opt/shared")));
    Ok(())
  }

  #[test]
  fn non_callable_module_is_rejected() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor("config-only/init.lua", "return { enabled = true }");

    let err = project.install("config-only", LuaValue::Nil).unwrap_err();
    assert!(matches!(err, InstallError::InvalidModuleContract { .. }), "got: {}", err);
    assert!(project.ctx.borrow().installed_modules.is_empty());
    Ok(())
  }
}

mod define_module {
  use super::*;

  #[test]
  fn meta_defaults_and_timings() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor(
      "greeter/modkit.lua",
      r#"
        return modkit.define_module({
          meta = { name = "greeter", version = "2.0" },
          defaults = { greeting = "hello" },
          setup = function(options, ctx)
            ctx:set("greeting", options.greeting)
          end,
        })
      "#,
    );
    project.vendor("greeter/module.json", r#"{ "version": "1.0", "license": "MIT" }"#);

    project.install("greeter", LuaValue::Nil).unwrap();

    let ctx = project.ctx.borrow();
    let record = &ctx.installed_modules[0];
    assert_eq!(
      serde_json::to_value(&record.meta).unwrap(),
      json!({ "name": "greeter", "version": "2.0", "license": "MIT" })
    );
    assert!(record.timings.as_ref().is_some_and(|t| t["setup"].is_number()));
    assert_eq!(ctx.options.get("greeting"), Some(&json!("hello")));
    Ok(())
  }

  #[test]
  fn inline_defined_module_skips_filesystem() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    let module: LuaValue = project.eval(
      r#"
        return modkit.define_module({
          meta = { name = "inline" },
          setup = function() end,
        })
      "#,
    )?;
    let callable = modkit_lib::module::ModuleCallable::from_value(module).unwrap();

    project.install(callable, LuaValue::Nil).unwrap();

    let ctx = project.ctx.borrow();
    assert_eq!(ctx.installed_modules[0].meta.get("name"), Some(&json!("inline")));
    assert_eq!(ctx.installed_modules[0].entry_path, None);
    assert!(ctx.transpile.is_empty());
    Ok(())
  }

  #[test]
  fn setup_false_aborts_install() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor(
      "disabled/modkit.lua",
      "return modkit.define_module({ setup = function() return false end })",
    );
    let dirs_before = project.ctx.borrow().modules_dirs.clone();

    project.install("disabled", LuaValue::Nil).unwrap();

    let ctx = project.ctx.borrow();
    assert!(ctx.installed_modules.is_empty());
    assert!(ctx.transpile.is_empty());
    assert_eq!(ctx.modules_dirs, dirs_before);
    Ok(())
  }

  #[test]
  fn module_sees_earlier_installs() -> LuaResult<()> {
    let project = TestProject::new(Compat::Current)?;
    project.vendor("first/init.lua", "return function() end");
    project.vendor(
      "second/init.lua",
      r#"
        return function(_, ctx)
          ctx:set("seen", #ctx:installed_modules())
        end
      "#,
    );

    project.install("first", LuaValue::Nil).unwrap();
    project.install("second", LuaValue::Nil).unwrap();

    assert_eq!(project.ctx.borrow().options.get("seen"), Some(&json!(1)));
    Ok(())
  }
}
