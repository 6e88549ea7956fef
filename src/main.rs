//! hellolua - demo host for a Lua script resource.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use luascript::app::HelloLuaApp;
use luascript::cli::args::{CallArgs, GetArgs, RunArgs};
use luascript::cli::{parse_arg, Cli, Command};
use luascript::config::AppConfig;
use luascript::lua::{DynamicValue, LuaScript};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::locate(cli.config.as_deref())?;
    if let Some(script) = cli.script {
        config.script.path = script;
    }

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run_app(config, args),
        Command::Check => run_check(config),
        Command::Get(args) => run_get(config, args),
        Command::Call(args) => run_call(config, args),
    }
}

fn run_app(mut config: AppConfig, args: RunArgs) -> Result<ExitCode> {
    if args.frames.is_some() {
        config.frames = args.frames;
    }
    if args.uncapped {
        config.cap_framerate = false;
    }

    let mut app = HelloLuaApp::init(config)?;
    let mut stdout = std::io::stdout().lock();
    app.run(&mut stdout)?;
    Ok(ExitCode::SUCCESS)
}

fn run_check(config: AppConfig) -> Result<ExitCode> {
    let script = open_script(&config)?;
    if script.is_valid() {
        println!("{}: valid", script.path().display());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}: invalid", script.path().display());
        Ok(ExitCode::FAILURE)
    }
}

fn run_get(config: AppConfig, args: GetArgs) -> Result<ExitCode> {
    let script = open_script(&config)?;
    let value: DynamicValue = script.get_variable(&args.name)?;
    print_json(&value)?;
    Ok(ExitCode::SUCCESS)
}

fn run_call(config: AppConfig, args: CallArgs) -> Result<ExitCode> {
    let script = open_script(&config)?;
    let call_args: Vec<DynamicValue> = args.args.iter().map(|raw| parse_arg(raw)).collect();
    let results = script
        .engine()?
        .call_global(&args.name, call_args)?;
    print_json(&results)?;
    Ok(ExitCode::SUCCESS)
}

fn open_script(config: &AppConfig) -> Result<LuaScript> {
    LuaScript::open(&config.script.path)
        .with_context(|| format!("Failed to initialize resource '{}'", config.script.id))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).context("Failed to encode JSON")?;
    writeln!(stdout)?;
    Ok(())
}
