//! Luascript library - Lua scripts as managed resources.
//!
//! This crate provides a resource that owns a Lua interpreter bound to one
//! script file, with typed variable reads and function calls, and the pieces
//! of the `hellolua` demo host that drives such a script every frame.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod lua;

pub use error::{ScriptError, ScriptResult};
pub use lua::{DynamicValue, LuaScript, Vec3};
