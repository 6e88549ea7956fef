//! CLI module for hellolua.
//!
//! Defines command-line argument parsing and turns raw arguments into script values.

pub mod args;

pub use args::{Cli, Command};

use crate::lua::DynamicValue;

/// Interpret a command-line argument as a script value.
pub fn parse_arg(raw: &str) -> DynamicValue {
    match raw {
        "nil" => DynamicValue::Nil,
        "true" => DynamicValue::Boolean(true),
        "false" => DynamicValue::Boolean(false),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                DynamicValue::Integer(i)
            } else if let Ok(n) = raw.parse::<f64>() {
                DynamicValue::Number(n)
            } else {
                DynamicValue::String(raw.to_string())
            }
        }
    }
}
