use std::fmt;

use mlua::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::InstallError;
use crate::context::{Compat, ContextHandle, ModuleContainer, SharedContext};

/// Metadata describing a module: name, version, config key and anything else
/// the module ships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleMeta(pub serde_json::Map<String, serde_json::Value>);

impl ModuleMeta {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
    self.0.get(key)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
    self.0.insert(key.into(), value);
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Merge `self` over `defaults`.
  ///
  /// Keys present in `self` win, nested objects are merged recursively and
  /// `null` values in `self` fall back to the default.
  pub fn merged_over(self, defaults: ModuleMeta) -> ModuleMeta {
    ModuleMeta(merge_maps(self.0, defaults.0))
  }
}

fn merge_maps(
  preferred: serde_json::Map<String, serde_json::Value>,
  defaults: serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
  let mut merged = defaults;
  for (key, value) in preferred {
    if value.is_null() {
      continue;
    }
    let combined = match (value, merged.remove(&key)) {
      (serde_json::Value::Object(ours), Some(serde_json::Value::Object(theirs))) => {
        serde_json::Value::Object(merge_maps(ours, theirs))
      }
      (ours, _) => ours,
    };
    merged.insert(key, combined);
  }
  merged
}

impl From<serde_json::Map<String, serde_json::Value>> for ModuleMeta {
  fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
    Self(map)
  }
}

/// What to install: a specifier to resolve, or a module already at hand.
#[derive(Debug, Clone)]
pub enum ModuleReference {
  Named(String),
  Callable(ModuleCallable),
}

impl ModuleReference {
  /// The specifier of a named reference.
  pub fn specifier(&self) -> Option<&str> {
    match self {
      ModuleReference::Named(s) => Some(s),
      ModuleReference::Callable(_) => None,
    }
  }
}

impl fmt::Display for ModuleReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ModuleReference::Named(s) => f.write_str(s),
      ModuleReference::Callable(_) => f.write_str("<inline module>"),
    }
  }
}

impl From<&str> for ModuleReference {
  fn from(s: &str) -> Self {
    ModuleReference::Named(s.to_string())
  }
}

impl From<String> for ModuleReference {
  fn from(s: String) -> Self {
    ModuleReference::Named(s)
  }
}

impl From<ModuleCallable> for ModuleReference {
  fn from(c: ModuleCallable) -> Self {
    ModuleReference::Callable(c)
  }
}

impl From<LuaFunction> for ModuleReference {
  fn from(f: LuaFunction) -> Self {
    ModuleReference::Callable(ModuleCallable::from_function(f))
  }
}

#[derive(Debug, Clone)]
enum Target {
  Function(LuaFunction),
  /// A table with a `__call` metamethod. The table is passed as the first argument.
  Table { table: LuaTable, call: LuaFunction },
  /// A userdata with a `__call` metamethod, passed as the first argument.
  UserData { data: LuaAnyUserData, call: LuaFunction },
}

/// `__call` metamethod of a userdata, if it has one.
fn userdata_call(data: &LuaAnyUserData) -> Option<LuaFunction> {
  data.metatable().ok()?.get::<Option<LuaFunction>>("__call").ok()?
}

/// `get_meta` of a userdata. Userdata without `__index` have no fields to look in.
fn userdata_get_meta(data: &LuaAnyUserData) -> LuaResult<Option<LuaFunction>> {
  if data.metatable()?.get::<LuaValue>("__index")?.is_nil() {
    return Ok(None);
  }
  data.get("get_meta")
}

/// An invocable module.
///
/// Either a plain Lua function or a table or userdata with `__call`. Callable
/// tables and userdata may also provide `get_meta()`, which contributes to the
/// installed module's metadata.
#[derive(Debug, Clone)]
pub struct ModuleCallable {
  target: Target,
}

impl ModuleCallable {
  pub fn from_function(function: LuaFunction) -> Self {
    Self {
      target: Target::Function(function),
    }
  }

  /// Wrap `value`, failing if it cannot be called.
  pub fn from_value(value: LuaValue) -> Result<Self, InstallError> {
    match value {
      LuaValue::Function(function) => Ok(Self::from_function(function)),
      LuaValue::Table(table) => {
        let call = table
          .metatable()
          .map(|mt| mt.raw_get::<LuaValue>("__call"))
          .transpose()?;
        match call {
          Some(LuaValue::Function(call)) => Ok(Self {
            target: Target::Table { table, call },
          }),
          _ => Err(InstallError::InvalidModuleContract {
            found: "table without __call".to_string(),
          }),
        }
      }
      LuaValue::UserData(data) => match userdata_call(&data) {
        Some(call) => Ok(Self {
          target: Target::UserData { data, call },
        }),
        None => Err(InstallError::InvalidModuleContract {
          found: "userdata without __call".to_string(),
        }),
      },
      other => Err(InstallError::InvalidModuleContract {
        found: other.type_name().to_string(),
      }),
    }
  }

  /// Whether `value` could be turned into a [`ModuleCallable`].
  pub fn is_callable(value: &LuaValue) -> bool {
    match value {
      LuaValue::Function(_) => true,
      LuaValue::Table(table) => table
        .metatable()
        .and_then(|mt| mt.raw_get::<LuaValue>("__call").ok())
        .is_some_and(|call| call.is_function()),
      LuaValue::UserData(data) => userdata_call(data).is_some(),
      _ => false,
    }
  }

  /// Call the module under the given convention.
  ///
  /// `Compat::Legacy` prepends a [`ModuleContainer`] to the arguments;
  /// `Compat::Current` passes only `(options, ctx)`.
  pub fn invoke(&self, lua: &Lua, compat: Compat, ctx: &SharedContext, options: LuaValue) -> LuaResult<LuaValue> {
    let mut args = Vec::with_capacity(4);

    let function = match &self.target {
      Target::Function(function) => function,
      Target::Table { table, call } => {
        args.push(LuaValue::Table(table.clone()));
        call
      }
      Target::UserData { data, call } => {
        args.push(LuaValue::UserData(data.clone()));
        call
      }
    };

    if compat == Compat::Legacy {
      let container = lua.create_userdata(ModuleContainer(ctx.clone()))?;
      args.push(LuaValue::UserData(container));
    }

    args.push(options);
    args.push(LuaValue::UserData(lua.create_userdata(ContextHandle(ctx.clone()))?));

    function.call::<LuaValue>(LuaMultiValue::from_vec(args))
  }

  /// Metadata declared by the module itself through `get_meta()`.
  ///
  /// Modules without the capability contribute nothing.
  pub fn get_meta(&self, lua: &Lua) -> LuaResult<ModuleMeta> {
    let (receiver, get_meta) = match &self.target {
      Target::Function(_) => return Ok(ModuleMeta::default()),
      Target::Table { table, .. } => (LuaValue::Table(table.clone()), table.get::<Option<LuaFunction>>("get_meta")?),
      Target::UserData { data, .. } => (LuaValue::UserData(data.clone()), userdata_get_meta(data)?),
    };
    let Some(get_meta) = get_meta else {
      return Ok(ModuleMeta::default());
    };

    match get_meta.call::<LuaValue>(receiver)? {
      LuaValue::Nil => Ok(ModuleMeta::default()),
      value @ LuaValue::Table(_) => lua.from_value(value),
      other => Err(LuaError::external(format!(
        "get_meta() must return a table, got {}",
        other.type_name()
      ))),
    }
  }
}

/// Interpreted return value of a module call.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallResult {
  /// The module returned exactly `false`.
  Aborted,
  Completed { timings: Option<serde_json::Value> },
}

impl InstallResult {
  pub fn from_lua(lua: &Lua, value: LuaValue) -> LuaResult<Self> {
    match value {
      LuaValue::Boolean(false) => Ok(InstallResult::Aborted),
      LuaValue::Table(table) => {
        let timings = match table.get::<LuaValue>("timings")? {
          LuaValue::Nil => None,
          value => Some(lua.from_value(value)?),
        };
        Ok(InstallResult::Completed { timings })
      }
      _ => Ok(InstallResult::Completed { timings: None }),
    }
  }
}
