//! Lua views of the build context.
//!
//! Modules never see [`BuildContext`](super::BuildContext) directly. They receive
//! a `ctx` userdata wrapping the shared context and, under the legacy calling
//! convention, a module container as their receiver.

use std::path::Path;

use mlua::prelude::*;

use super::types::SharedContext;

/// The `ctx` argument passed to every module.
#[derive(Clone)]
pub struct ContextHandle(pub SharedContext);

impl LuaUserData for ContextHandle {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("root_dir", |_, this| {
      Ok(this.0.borrow().root_dir.to_string_lossy().into_owned())
    });
    fields.add_field_method_get("compat", |_, this| Ok(this.0.borrow().compat.as_str()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("add_transpile", |_, this, path: String| {
      this.0.borrow_mut().transpile.push(path);
      Ok(())
    });

    methods.add_method("add_modules_dir", |_, this, path: String| {
      this.0.borrow_mut().add_modules_dir(Path::new(&path));
      Ok(())
    });

    methods.add_method("transpile", |_, this, ()| Ok(this.0.borrow().transpile.clone()));

    methods.add_method("modules_dirs", |_, this, ()| {
      let dirs: Vec<String> = this
        .0
        .borrow()
        .modules_dirs
        .iter()
        .map(|d| d.to_string_lossy().into_owned())
        .collect();
      Ok(dirs)
    });

    methods.add_method("installed_modules", |lua, this, ()| {
      lua.to_value(&this.0.borrow().installed_modules)
    });

    methods.add_method("get", |lua, this, key: String| {
      match this.0.borrow().options.get(&key) {
        Some(value) => lua.to_value(value),
        None => Ok(LuaValue::Nil),
      }
    });

    methods.add_method("set", |lua, this, (key, value): (String, LuaValue)| {
      let value: serde_json::Value = lua.from_value(value)?;
      this.0.borrow_mut().options.insert(key, value);
      Ok(())
    });
  }
}

/// Receiver of legacy-convention modules.
#[derive(Clone)]
pub struct ModuleContainer(pub SharedContext);

impl LuaUserData for ModuleContainer {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("options", |_, this| Ok(ContextHandle(this.0.clone())));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("add_transpile", |_, this, path: String| {
      this.0.borrow_mut().transpile.push(path);
      Ok(())
    });

    methods.add_method("add_modules_dir", |_, this, path: String| {
      this.0.borrow_mut().add_modules_dir(Path::new(&path));
      Ok(())
    });
  }
}
