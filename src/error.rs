//! Error types for the Lua script resource.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by [`LuaScript`](crate::lua::LuaScript) and [`LuaEngine`](crate::lua::LuaEngine).
///
/// Interpreter faults never unwind past the binding; they arrive here as
/// [`ScriptError::Execution`] carrying the interpreter's diagnostic text.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script source file could not be read.
    #[error("Failed to read Lua script {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resource was used before `init()` succeeded.
    #[error("Lua script is not initialized")]
    Uninitialized,

    /// A parse or runtime fault inside the interpreter.
    #[error("Error {context}: {message}")]
    Execution { context: String, message: String },

    /// The requested global is nil.
    #[error("Error getting Lua variable \"{0}\": variable does not exist")]
    NotFound(String),

    /// The requested global exists but cannot be invoked.
    #[error("Error calling Lua function \"{name}\": value is a {found}, not a function")]
    NotCallable { name: String, found: &'static str },

    /// The value exists but has the wrong type for the requested native type.
    #[error("Lua value \"{name}\" is a {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A function was expected to return a value and returned nothing.
    #[error("Error calling Lua function \"{0}\": Function didn't return")]
    NoReturnValue(String),
}

impl ScriptError {
    /// Wrap an interpreter error, keeping its message.
    pub(crate) fn execution(context: impl Into<String>, err: mlua::Error) -> Self {
        ScriptError::Execution {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_keeps_interpreter_message() {
        let err = ScriptError::execution(
            "calling Lua function \"update\"",
            mlua::Error::runtime("attempt to index a nil value"),
        );
        assert_eq!(
            err.to_string(),
            "Error calling Lua function \"update\": attempt to index a nil value"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = ScriptError::NotFound("timePassed".to_string());
        assert!(err.to_string().contains("\"timePassed\""));
    }

    #[test]
    fn test_io_message_names_path() {
        let err = ScriptError::Io {
            path: PathBuf::from("missing.lua"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("missing.lua"));
    }
}
