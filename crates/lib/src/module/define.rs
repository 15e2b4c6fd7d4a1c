//! Lua bindings for `modkit.define_module{}`.
//!
//! `define_module` wraps a `setup(options, ctx)` function into a callable
//! module table that:
//! - reports its `meta` through `get_meta()`
//! - fills missing options from `defaults` (nested tables merged recursively)
//! - measures the setup call and returns `{ timings = { setup = <ms> } }`
//! - propagates an explicit `false` from setup so the install is skipped
//!
//! The wrapper works under both calling conventions: it always takes the last
//! two call arguments as `(options, ctx)`.

use std::time::Instant;

use mlua::prelude::*;
use tracing::warn;

/// Setups slower than this are reported.
const SLOW_SETUP_MS: u128 = 5000;

/// Copy every key of `defaults` missing from `target` into `target`.
fn fill_defaults(target: &LuaTable, defaults: &LuaTable) -> LuaResult<()> {
  for pair in defaults.pairs::<LuaValue, LuaValue>() {
    let (key, default) = pair?;
    let current: LuaValue = target.raw_get(key.clone())?;
    match (current, default) {
      (LuaValue::Nil, default) => target.raw_set(key, default)?,
      (LuaValue::Table(current), LuaValue::Table(default)) => fill_defaults(&current, &default)?,
      _ => {}
    }
  }
  Ok(())
}

fn module_name(meta: &LuaTable) -> String {
  meta
    .get::<Option<String>>("name")
    .ok()
    .flatten()
    .unwrap_or_else(|| "<anonymous>".to_string())
}

/// Create the `define_module` function.
pub fn create_define_module(lua: &Lua) -> LuaResult<LuaFunction> {
  lua.create_function(|lua, def: LuaTable| {
    let setup: LuaFunction = def
      .get("setup")
      .map_err(|_| LuaError::external("define_module requires a 'setup' function"))?;

    let meta = match def.get::<LuaValue>("meta")? {
      LuaValue::Table(t) => t,
      LuaValue::Nil => lua.create_table()?,
      other => {
        return Err(LuaError::external(format!(
          "define_module 'meta' must be a table, got {}",
          other.type_name()
        )));
      }
    };

    let defaults: Option<LuaTable> = def
      .get("defaults")
      .map_err(|_| LuaError::external("define_module 'defaults' must be a table"))?;

    let module = lua.create_table()?;
    module.set("meta", meta.clone())?;

    let meta_for_get = meta.clone();
    module.set(
      "get_meta",
      lua.create_function(move |_, _: LuaMultiValue| Ok(meta_for_get.clone()))?,
    )?;

    let call = lua.create_function(move |lua, args: LuaMultiValue| {
      let mut args: Vec<LuaValue> = args.into_iter().collect();
      let ctx = args.pop().unwrap_or(LuaValue::Nil);
      let options = match args.pop() {
        Some(LuaValue::Table(t)) => t,
        _ => lua.create_table()?,
      };

      if let Some(defaults) = &defaults {
        fill_defaults(&options, defaults)?;
      }

      let start = Instant::now();
      let result: LuaValue = setup.call((options, ctx))?;
      let elapsed = start.elapsed().as_millis();

      if elapsed > SLOW_SETUP_MS {
        warn!(module = %module_name(&meta), elapsed_ms = elapsed as u64, "slow module setup");
      }

      let result = match result {
        LuaValue::Boolean(false) => return Ok(LuaValue::Boolean(false)),
        LuaValue::Table(t) => t,
        _ => lua.create_table()?,
      };

      let timings = match result.get::<LuaValue>("timings")? {
        LuaValue::Table(t) => t,
        _ => {
          let t = lua.create_table()?;
          result.set("timings", t.clone())?;
          t
        }
      };
      if timings.get::<LuaValue>("setup")?.is_nil() {
        timings.set("setup", elapsed as i64)?;
      }

      Ok(LuaValue::Table(result))
    })?;

    let mt = lua.create_table()?;
    mt.set("__call", call)?;
    module.set_metatable(Some(mt))?;

    Ok(module)
  })
}
