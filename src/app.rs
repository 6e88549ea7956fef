//! The `hellolua` demo host.
//!
//! Drives one [`LuaScript`] once per frame: reads the `timePassed` global,
//! calls `update(deltaTime)` and moves the world along x by the returned
//! amount. Each frame is rendered as a text panel.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::lua::script::log_failure;
use crate::lua::{LuaScript, Vec3};

/// Position of the world entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub translate: Vec3,
}

/// What a single frame read from and got back from the script.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Value returned by `update`.
    pub output: f32,
    /// Value of the `timePassed` global.
    pub time_passed: f32,
    /// Errors raised this frame, already logged.
    pub errors: Vec<String>,
}

/// Demo application that consumes one Lua script.
pub struct HelloLuaApp {
    config: AppConfig,
    script: LuaScript,
    world: Transform,
    frame: u64,
}

impl HelloLuaApp {
    /// Initialize the script resource declared in `config`.
    ///
    /// Fails only if the script cannot be read; an invalid script is reported
    /// every frame instead.
    pub fn init(config: AppConfig) -> Result<Self> {
        let script = LuaScript::open(&config.script.path)
            .with_context(|| format!("Failed to initialize resource '{}'", config.script.id))?;

        if script.is_valid() {
            info!(id = %config.script.id, path = %script.path().display(), "Lua script loaded");
        }

        Ok(Self {
            config,
            script,
            world: Transform::default(),
            frame: 0,
        })
    }

    /// Run the script logic for one frame.
    pub fn update(&mut self, delta_time: f64) -> FrameReport {
        self.frame += 1;
        let mut errors = Vec::new();

        let time_passed = match self.script.get_variable::<f32>("timePassed") {
            Ok(value) => value,
            Err(err) => {
                log_failure(&err);
                errors.push(err.to_string());
                0.0
            }
        };

        let output = match self.script.call::<f32>("update", (delta_time,)) {
            Ok(value) => value,
            Err(err) => {
                log_failure(&err);
                errors.push(err.to_string());
                0.0
            }
        };

        self.world.translate = Vec3::new(output, 0.0, 0.0);

        FrameReport {
            frame: self.frame,
            output,
            time_passed,
            errors,
        }
    }

    /// Write the "From Lua" panel for a frame.
    pub fn render(&self, report: &FrameReport, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            out,
            "[frame {}] function output: {:.3}  variable value: {:.3}  world x: {:.3}",
            report.frame, report.output, report.time_passed, self.world.translate.x
        )?;
        for error in &report.errors {
            writeln!(out, "  {error}")?;
        }
        Ok(())
    }

    /// Run the frame loop until the configured frame count is reached.
    ///
    /// Returns the number of frames run.
    pub fn run(&mut self, out: &mut impl Write) -> Result<u64> {
        let frame_time = Duration::try_from_secs_f64(1.0 / self.config.framerate)
            .with_context(|| format!("Invalid framerate: {}", self.config.framerate))?;
        writeln!(
            out,
            "{} ({}): {}",
            self.config.script.id,
            self.script.path().display(),
            if self.script.is_valid() { "valid" } else { "invalid" }
        )?;

        let mut last = Instant::now();
        let mut delta_time = frame_time.as_secs_f64();
        let mut frames = 0;

        while self.config.frames.map_or(true, |limit| frames < limit) {
            let start = Instant::now();

            let report = self.update(delta_time);
            self.render(&report, out)?;
            frames += 1;

            if self.config.cap_framerate {
                if let Some(remaining) = frame_time.checked_sub(start.elapsed()) {
                    std::thread::sleep(remaining);
                }
            }

            let now = Instant::now();
            delta_time = now.duration_since(last).as_secs_f64();
            last = now;
        }

        debug!(frames, "Frame loop finished");
        Ok(frames)
    }

    pub fn script(&self) -> &LuaScript {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut LuaScript {
        &mut self.script
    }

    pub fn world(&self) -> &Transform {
        &self.world
    }
}
