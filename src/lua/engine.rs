//! Lua interpreter session.
//!
//! `LuaEngine` is the only type that talks to the interpreter directly. Every
//! interpreter fault is turned into a [`ScriptError`] here.

use std::collections::HashSet;
use std::ffi::c_void;

use mlua::{Lua, LuaOptions, MultiValue, StdLib, Table, Value};

use super::value::DynamicValue;
use super::vec3::Vec3;
use crate::error::{ScriptError, ScriptResult};

/// Tables nested deeper than this are snapshotted as opaque values.
const MAX_TABLE_DEPTH: usize = 16;

/// An exclusively owned Lua interpreter session.
///
/// The interpreter is released when the engine is dropped.
pub struct LuaEngine {
    lua: Lua,
}

impl LuaEngine {
    /// Create a new interpreter with the safe standard libraries loaded.
    ///
    /// Errors raised by scripts and panics inside native callbacks both
    /// surface as catchable errors rather than aborting the process.
    pub fn new() -> ScriptResult<Self> {
        let options = LuaOptions::new().catch_rust_panics(true);
        let lua = Lua::new_with(StdLib::ALL_SAFE, options)
            .map_err(|err| ScriptError::execution("creating Lua state", err))?;
        Ok(Self { lua })
    }

    /// Execute a chunk of Lua source. `chunk_name` shows up in diagnostics.
    pub fn exec(&self, chunk_name: &str, source: &str) -> ScriptResult<()> {
        self.lua
            .load(source)
            .set_name(chunk_name)
            .exec()
            .map_err(|err| {
                let script = chunk_name.trim_start_matches(|c| c == '@' || c == '=');
                ScriptError::execution(format!("loading Lua script {script}"), err)
            })
    }

    /// Read a global. Absent globals read as [`DynamicValue::Nil`].
    pub fn get_global(&self, name: &str) -> ScriptResult<DynamicValue> {
        self.read_global(name, true)
    }

    /// Read a global, copying table contents only if `copy_tables` is set.
    ///
    /// Without it a table reads as `Opaque("table")`, which is enough for
    /// converting to scalars and vectors.
    pub fn read_global(&self, name: &str, copy_tables: bool) -> ScriptResult<DynamicValue> {
        let value = self.raw_global(name)?;
        Ok(Snapshot::new(copy_tables).value(value, 0))
    }

    /// Assign a global, shadowing whatever was bound to `name` before.
    pub fn set_global(&self, name: &str, value: DynamicValue) -> ScriptResult<()> {
        let value = self.to_lua(name, value)?;
        self.lua
            .globals()
            .set(name, value)
            .map_err(|err| ScriptError::execution(format!("setting Lua variable \"{name}\""), err))
    }

    /// Call a global function and return everything it returned.
    pub fn call_global(&self, name: &str, args: Vec<DynamicValue>) -> ScriptResult<Vec<DynamicValue>> {
        self.call_global_with(name, args, true)
    }

    /// Like [`call_global`](Self::call_global), with table copying as in
    /// [`read_global`](Self::read_global).
    pub fn call_global_with(
        &self,
        name: &str,
        args: Vec<DynamicValue>,
        copy_tables: bool,
    ) -> ScriptResult<Vec<DynamicValue>> {
        let func = match self.raw_global(name)? {
            Value::Function(func) => func,
            Value::Nil => return Err(ScriptError::NotFound(name.to_string())),
            other => {
                return Err(ScriptError::NotCallable {
                    name: name.to_string(),
                    found: other.type_name(),
                })
            }
        };

        let args = args
            .into_iter()
            .map(|arg| self.to_lua(name, arg))
            .collect::<ScriptResult<MultiValue>>()?;

        let results = func
            .call::<MultiValue>(args)
            .map_err(|err| ScriptError::execution(format!("calling Lua function \"{name}\""), err))?;

        Ok(results
            .into_iter()
            .map(|value| Snapshot::new(copy_tables).value(value, 0))
            .collect())
    }

    /// Get access to the underlying Lua state (for API registration).
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    fn raw_global(&self, name: &str) -> ScriptResult<Value> {
        self.lua
            .globals()
            .get::<Value>(name)
            .map_err(|err| ScriptError::execution(format!("getting Lua variable \"{name}\""), err))
    }

    fn to_lua(&self, name: &str, value: DynamicValue) -> ScriptResult<Value> {
        let marshal_err = |err: mlua::Error| ScriptError::execution(format!("passing value to \"{name}\""), err);

        let value = match value {
            DynamicValue::Nil => Value::Nil,
            DynamicValue::Boolean(b) => Value::Boolean(b),
            DynamicValue::Integer(i) => Value::Integer(i),
            DynamicValue::Number(n) => Value::Number(n),
            DynamicValue::String(s) => Value::String(self.lua.create_string(&s).map_err(marshal_err)?),
            DynamicValue::Table(entries) => {
                let table = self.lua.create_table().map_err(marshal_err)?;
                for (key, item) in entries {
                    let key = self.to_lua(name, key)?;
                    let item = self.to_lua(name, item)?;
                    table.raw_set(key, item).map_err(marshal_err)?;
                }
                Value::Table(table)
            }
            DynamicValue::Vec3(v) => Value::UserData(self.lua.create_userdata(v).map_err(marshal_err)?),
            other @ (DynamicValue::Function | DynamicValue::Opaque(_)) => {
                return Err(ScriptError::TypeMismatch {
                    name: name.to_string(),
                    expected: "a value that can be passed to Lua",
                    found: other.type_name(),
                })
            }
        };
        Ok(value)
    }
}

/// Copies Lua values into [`DynamicValue`]s.
///
/// Each table is walked at most once per value; a table reached again
/// (a cycle or a shared subtable) reads as `Opaque("table")`.
struct Snapshot {
    copy_tables: bool,
    visited: HashSet<*const c_void>,
}

impl Snapshot {
    fn new(copy_tables: bool) -> Self {
        Self {
            copy_tables,
            visited: HashSet::new(),
        }
    }

    fn value(&mut self, value: Value, depth: usize) -> DynamicValue {
        match value {
            Value::Nil => DynamicValue::Nil,
            Value::Boolean(b) => DynamicValue::Boolean(b),
            Value::Integer(i) => DynamicValue::Integer(i),
            Value::Number(n) => DynamicValue::Number(n),
            Value::String(s) => DynamicValue::String(s.to_string_lossy()),
            Value::Table(table) => self.table(&table, depth),
            Value::Function(_) => DynamicValue::Function,
            Value::UserData(ud) => match ud.borrow::<Vec3>() {
                Ok(v) => DynamicValue::Vec3(*v),
                Err(_) => DynamicValue::Opaque("userdata"),
            },
            other => DynamicValue::Opaque(other.type_name()),
        }
    }

    fn table(&mut self, table: &Table, depth: usize) -> DynamicValue {
        if !self.copy_tables
            || depth >= MAX_TABLE_DEPTH
            || !self.visited.insert(table.to_pointer())
        {
            return DynamicValue::Opaque("table");
        }

        let mut entries = Vec::new();
        for pair in table.clone().pairs::<Value, Value>() {
            // Keys and values are plain Values, so conversion cannot fail.
            if let Ok((key, item)) = pair {
                let key = self.value(key, depth + 1);
                let item = self.value(item, depth + 1);
                entries.push((key, item));
            }
        }
        DynamicValue::Table(entries)
    }
}
