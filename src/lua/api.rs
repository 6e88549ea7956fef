//! Native helpers registered into every script's global namespace.
//!
//! - `vec3(x, y, z)` constructs a [`Vec3`]; missing components default to 0.
//! - `log(level, message)` forwards to the host logger under the `lua` target.

use mlua::{Function, Lua};

use super::vec3::Vec3;

/// Register the native helpers in the Lua global namespace.
///
/// Existing globals with the same names are silently replaced.
pub fn register_api(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("vec3", create_vec3(lua)?)?;
    globals.set("log", create_log(lua)?)?;
    Ok(())
}

fn create_vec3(lua: &Lua) -> mlua::Result<Function> {
    lua.create_function(|_, (x, y, z): (Option<f32>, Option<f32>, Option<f32>)| {
        Ok(Vec3::new(
            x.unwrap_or_default(),
            y.unwrap_or_default(),
            z.unwrap_or_default(),
        ))
    })
}

fn create_log(lua: &Lua) -> mlua::Result<Function> {
    lua.create_function(|_, (level, message): (String, String)| {
        log_message(&level, &message);
        Ok(())
    })
}

/// Log a message at the specified level.
fn log_message(level: &str, message: &str) {
    match level.to_lowercase().as_str() {
        "trace" => tracing::trace!(target: "lua", "{message}"),
        "debug" => tracing::debug!(target: "lua", "{message}"),
        "info" => tracing::info!(target: "lua", "{message}"),
        "warn" | "warning" => tracing::warn!(target: "lua", "{message}"),
        "error" => tracing::error!(target: "lua", "{message}"),
        other => tracing::info!(target: "lua", lua_level = other, "{message}"),
    }
}
