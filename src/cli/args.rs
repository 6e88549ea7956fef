//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive a Lua script from a small frame-based host application.
#[derive(Parser, Debug)]
#[command(name = "hellolua")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Script to load, overriding the config file.
    #[arg(long, global = true)]
    pub script: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `luascript=trace`. `RUST_LOG` wins if set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the frame loop (default).
    Run(RunArgs),

    /// Load the script and report whether it is valid.
    Check,

    /// Print a global variable as JSON.
    Get(GetArgs),

    /// Call a global function and print its return values as JSON.
    Call(CallArgs),
}

/// Arguments for the run command.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Number of frames to run, overriding the config file.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Run frames back to back instead of holding the framerate.
    #[arg(long)]
    pub uncapped: bool,
}

/// Arguments for the get command.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Name of the global variable.
    pub name: String,
}

/// Arguments for the call command.
#[derive(Parser, Debug)]
pub struct CallArgs {
    /// Name of the global function.
    pub name: String,

    /// Arguments: numbers, `true`/`false`, `nil`, anything else is a string.
    #[arg(allow_hyphen_values = true, allow_negative_numbers = true)]
    pub args: Vec<String>,
}
