//! A Lua script file managed as a resource.
//!
//! Lifecycle: [`LuaScript::new`] creates an uninitialized resource,
//! [`LuaScript::init`] reads the file, creates the interpreter, registers the
//! native helpers and makes a first load attempt. A script that fails to
//! load leaves the resource initialized but invalid; fix the source and call
//! [`LuaScript::load`] or [`LuaScript::reload`] again.
//!
//! Each read/call operation comes in two shapes: a strict one returning
//! [`ScriptResult`], and an `_or_default`/`_or_log` one that logs the error
//! and falls back to a default value.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::api::register_api;
use super::engine::LuaEngine;
use super::value::{DynamicValue, FromDynamic, IntoArgs, IntoDynamic};
use crate::error::{ScriptError, ScriptResult};

/// A resource that manages a single Lua script file.
pub struct LuaScript {
    path: PathBuf,
    source: Option<String>,
    engine: Option<LuaEngine>,
    valid: bool,
}

impl LuaScript {
    /// Create an uninitialized resource for the script at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: None,
            engine: None,
            valid: false,
        }
    }

    /// Create and initialize a resource in one step.
    pub fn open(path: impl Into<PathBuf>) -> ScriptResult<Self> {
        let mut script = Self::new(path);
        script.init()?;
        Ok(script)
    }

    /// Read the script, create a fresh interpreter and attempt a first load.
    ///
    /// Only an unreadable file or a failure to create the interpreter is an
    /// error. An invalid script is logged and reported through
    /// [`is_valid`](Self::is_valid).
    pub fn init(&mut self) -> ScriptResult<()> {
        let source = read_script(&self.path)?;

        let engine = LuaEngine::new()?;
        register_api(engine.lua())
            .map_err(|err| ScriptError::execution("registering native helpers", err))?;

        self.source = Some(source);
        self.engine = Some(engine);
        self.valid = false;
        debug!(path = %self.path.display(), "Lua script initialized");

        // Already logged by load(); an invalid script keeps the resource usable.
        let _ = self.load();
        Ok(())
    }

    /// Execute the cached script text in the interpreter.
    ///
    /// Updates the validity flag either way.
    pub fn load(&mut self) -> ScriptResult<()> {
        let result = match (&self.engine, &self.source) {
            (Some(engine), Some(source)) => engine.exec(&self.chunk_name(), source),
            _ => return Err(ScriptError::Uninitialized),
        };

        self.valid = result.is_ok();
        match &result {
            Ok(()) => debug!(path = %self.path.display(), "Lua script loaded"),
            Err(err) => warn!("Lua script invalid: {err}"),
        }
        result
    }

    /// Re-read the script file and load it into the existing interpreter.
    ///
    /// If the file cannot be read the previous text and validity are kept.
    pub fn reload(&mut self) -> ScriptResult<()> {
        if self.engine.is_none() {
            return Err(ScriptError::Uninitialized);
        }
        self.source = Some(read_script(&self.path)?);
        self.load()
    }

    /// Replace the cached script text. Takes effect on the next [`load`](Self::load).
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    /// Read a global variable.
    pub fn get_variable<T: FromDynamic>(&self, name: &str) -> ScriptResult<T> {
        let value = self.engine()?.read_global(name, T::NEEDS_TABLE_CONTENTS)?;
        if value.is_nil() {
            return Err(ScriptError::NotFound(name.to_string()));
        }
        convert(name, value)
    }

    /// Read a global variable, logging failures and returning `T::default()`.
    pub fn get_variable_or_default<T: FromDynamic + Default>(&self, name: &str) -> T {
        self.get_variable(name).unwrap_or_else(|err| {
            log_failure(&err);
            T::default()
        })
    }

    /// Assign a global variable.
    pub fn set_variable(&self, name: &str, value: impl IntoDynamic) -> ScriptResult<()> {
        self.engine()?.set_global(name, value.into_dynamic())
    }

    /// Call a global function and convert its first return value.
    pub fn call<R: FromDynamic>(&self, name: &str, args: impl IntoArgs) -> ScriptResult<R> {
        let mut results =
            self.engine()?
                .call_global_with(name, args.into_args(), R::NEEDS_TABLE_CONTENTS)?;
        if results.is_empty() {
            return Err(ScriptError::NoReturnValue(name.to_string()));
        }
        convert(name, results.swap_remove(0))
    }

    /// Call a global function, logging failures and returning `R::default()`.
    pub fn call_or_default<R: FromDynamic + Default>(&self, name: &str, args: impl IntoArgs) -> R {
        self.call(name, args).unwrap_or_else(|err| {
            log_failure(&err);
            R::default()
        })
    }

    /// Call a global function, ignoring anything it returns.
    pub fn call_void(&self, name: &str, args: impl IntoArgs) -> ScriptResult<()> {
        self.engine()?
            .call_global_with(name, args.into_args(), false)?;
        Ok(())
    }

    /// Call a global function, logging failures.
    pub fn call_void_or_log(&self, name: &str, args: impl IntoArgs) {
        if let Err(err) = self.call_void(name, args) {
            log_failure(&err);
        }
    }

    /// Whether the most recent load attempt succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached script text, once initialized.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The interpreter session, for registering additional native functions.
    pub fn engine(&self) -> ScriptResult<&LuaEngine> {
        self.engine.as_ref().ok_or(ScriptError::Uninitialized)
    }

    fn chunk_name(&self) -> String {
        format!("@{}", self.path.display())
    }
}

fn read_script(path: &Path) -> ScriptResult<String> {
    std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn convert<T: FromDynamic>(name: &str, value: DynamicValue) -> ScriptResult<T> {
    T::from_dynamic(value).map_err(|err| ScriptError::TypeMismatch {
        name: name.to_string(),
        expected: err.expected,
        found: err.found,
    })
}

/// Log a failure that is not propagated to the caller.
pub(crate) fn log_failure(err: &ScriptError) {
    info!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua::Vec3;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a subscriber that records formatted events.
    fn capture_logs<R>(f: impl FnOnce() -> R) -> (String, R) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (output, result)
    }

    fn script_file(source: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".lua").tempfile().unwrap();
        file.write_all(source.as_bytes()).unwrap();
        file
    }

    fn open(source: &str) -> (NamedTempFile, LuaScript) {
        let file = script_file(source);
        let script = LuaScript::open(file.path()).unwrap();
        (file, script)
    }

    #[test]
    fn test_valid_script_loads() {
        let (_file, mut script) = open("timePassed = 1.5");
        assert!(script.is_valid());
        script.load().unwrap();
        assert!(script.is_valid());
        assert_eq!(script.get_variable::<f32>("timePassed").unwrap(), 1.5);
    }

    #[test]
    fn test_missing_file_fails_init() {
        let mut script = LuaScript::new("/definitely/not/here.lua");
        let err = script.init().unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
        assert!(!script.is_initialized());
    }

    #[test]
    fn test_uninitialized_operations_fail() {
        let mut script = LuaScript::new("never_initialized.lua");
        assert!(matches!(script.load(), Err(ScriptError::Uninitialized)));
        assert!(matches!(
            script.get_variable::<f32>("x"),
            Err(ScriptError::Uninitialized)
        ));
        assert!(matches!(script.reload(), Err(ScriptError::Uninitialized)));
        assert_eq!(script.get_variable_or_default::<f32>("x"), 0.0);
    }

    #[test]
    fn test_syntax_error_is_recoverable() {
        let (_file, mut script) = open("function broken(");
        assert!(script.is_initialized());
        assert!(!script.is_valid());

        let err = script.load().unwrap_err();
        assert!(matches!(err, ScriptError::Execution { .. }));
        assert!(!script.is_valid());

        script.set_source("function fixed() return 7 end");
        script.load().unwrap();
        assert!(script.is_valid());
        assert_eq!(script.call::<i32>("fixed", ()).unwrap(), 7);
    }

    #[test]
    fn test_reload_reads_file_again() {
        let (file, mut script) = open("value = 1");
        std::fs::write(file.path(), "value = 2").unwrap();
        script.reload().unwrap();
        assert_eq!(script.get_variable::<i64>("value").unwrap(), 2);
        assert_eq!(script.source(), Some("value = 2"));
    }

    #[test]
    fn test_undefined_variable_not_found() {
        let (_file, script) = open("x = 1");
        assert!(matches!(
            script.get_variable::<f32>("undefinedName"),
            Err(ScriptError::NotFound(name)) if name == "undefinedName"
        ));
        assert!(matches!(
            script.get_variable::<String>("undefinedName"),
            Err(ScriptError::NotFound(_))
        ));
        assert!(matches!(
            script.get_variable::<Vec3>("undefinedName"),
            Err(ScriptError::NotFound(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let (_file, script) = open("aStringGlobal = 'hello'");
        let err = script.get_variable::<i32>("aStringGlobal").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::TypeMismatch { expected: "i32", found: "string", .. }
        ));
        assert_eq!(script.get_variable_or_default::<i32>("aStringGlobal"), 0);
    }

    #[test]
    fn test_call_returns_value() {
        let (_file, script) = open("function add(a, b) return a + b end");
        assert_eq!(script.call::<f32>("add", (2.0, 3.0)).unwrap(), 5.0);
        assert_eq!(script.call_or_default::<f32>("add", (2.0, 3.0)), 5.0);
    }

    #[test]
    fn test_call_without_return_value() {
        let (_file, script) = open("function nothing() end");
        assert!(matches!(
            script.call::<f32>("nothing", ()),
            Err(ScriptError::NoReturnValue(_))
        ));
        script.call_void("nothing", ()).unwrap();
    }

    #[test]
    fn test_call_missing_and_not_callable() {
        let (_file, script) = open("notAFunction = 3");
        assert!(matches!(
            script.call_void("missingFunction", ()),
            Err(ScriptError::NotFound(_))
        ));
        assert!(matches!(
            script.call::<f32>("notAFunction", ()),
            Err(ScriptError::NotCallable { found: "integer", .. })
        ));

        script.call_void_or_log("missingFunction", ());
        assert_eq!(script.call_or_default::<f32>("missingFunction", ()), 0.0);
    }

    #[test]
    fn test_runtime_error_in_call() {
        let (_file, script) = open("function fail() error('bad things') end");
        let err = script.call_void("fail", ()).unwrap_err();
        assert!(err.to_string().contains("bad things"));
        assert!(err.to_string().contains("\"fail\""));
    }

    #[test]
    fn test_vec3_round_trip() {
        let (_file, script) = open("position = vec3(1, 2, 3)");
        let position: Vec3 = script.get_variable("position").unwrap();
        assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));

        let (_file, script) = open("function offset(v) return v + vec3(1, 1, 1) end");
        let moved: Vec3 = script
            .call("offset", (Vec3::new(1.0, 2.0, 3.0),))
            .unwrap();
        assert_eq!(moved, Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_set_variable_visible_to_script() {
        let (_file, script) = open("function speed() return baseSpeed * 2 end");
        script.set_variable("baseSpeed", 4).unwrap();
        assert_eq!(script.call::<i64>("speed", ()).unwrap(), 8);
    }

    const GLOBALS_SCRIPT: &str = r#"
counter = 10
title = "demo"
origin = vec3(1, 2, 3)
settings = {speed = 2.5, names = {"a", "b"}}
function get() return counter end
"#;

    /// Sorted global names plus the values this script defines.
    fn globals_snapshot(script: &LuaScript) -> (Vec<String>, Vec<DynamicValue>) {
        let mut names = Vec::new();
        for pair in script.engine().unwrap().lua().globals().pairs::<String, mlua::Value>() {
            names.push(pair.unwrap().0);
        }
        names.sort();

        let values = ["counter", "title", "origin", "get"]
            .iter()
            .map(|name| script.get_variable::<DynamicValue>(name).unwrap())
            .collect();
        (names, values)
    }

    #[test]
    fn test_load_is_idempotent() {
        let (_file, mut script) = open(GLOBALS_SCRIPT);
        script.load().unwrap();
        let first = globals_snapshot(&script);
        let first_settings: HashMap<String, DynamicValue> =
            script.get_variable("settings").unwrap();

        script.load().unwrap();
        let second = globals_snapshot(&script);
        let second_settings: HashMap<String, DynamicValue> =
            script.get_variable("settings").unwrap();

        assert!(script.is_valid());
        assert_eq!(first, second);
        assert_eq!(first.1[3], DynamicValue::Function);
        assert_eq!(first_settings, second_settings);
        assert_eq!(first_settings["speed"], DynamicValue::Number(2.5));
        assert_eq!(script.call::<i64>("get", ()).unwrap(), 10);
    }

    #[test]
    fn test_multiply_linked_cycle_reports_type_mismatch() {
        let (_file, script) = open("t = {}; for i = 1, 4 do t[i] = t end");
        assert!(matches!(
            script.get_variable::<i32>("t"),
            Err(ScriptError::TypeMismatch { found: "table", .. })
        ));
        assert!(matches!(
            script.get_variable::<i32>("_G"),
            Err(ScriptError::TypeMismatch { found: "table", .. })
        ));

        let items: Vec<DynamicValue> = script.get_variable("t").unwrap();
        assert_eq!(items, vec![DynamicValue::Opaque("table"); 4]);
    }

    #[test]
    fn test_swallowed_failures_log_at_info() {
        let (_file, script) = open("x = 1");
        let (output, value) =
            capture_logs(|| script.get_variable_or_default::<i32>("undefinedName"));
        assert_eq!(value, 0);
        assert!(output.contains("INFO"), "{output}");
        assert!(!output.contains("WARN"), "{output}");
        assert!(output.contains("undefinedName"), "{output}");

        let (output, ()) = capture_logs(|| script.call_void_or_log("missingFunction", ()));
        assert!(output.contains("INFO"), "{output}");
        assert!(output.contains("missingFunction"), "{output}");
    }
}
