//! Lua scripting module.
//!
//! Provides a Lua script resource with typed access to script globals and
//! functions, on top of an embedded Lua runtime.

pub mod api;
pub mod engine;
pub mod script;
pub mod value;
pub mod vec3;

pub use api::register_api;
pub use engine::LuaEngine;
pub use script::LuaScript;
pub use value::{ConversionError, DynamicValue, FromDynamic, IntoArgs, IntoDynamic};
pub use vec3::Vec3;
