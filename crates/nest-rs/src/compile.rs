//! Compilation of extension modules from source directories.

use crate::{NestError, Result};
use multiscale_core::ExtensionConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lines of the build log kept in error messages
const LOG_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Builds `<build_dir>/<module>/lib<module>.so` for a module
pub trait ModuleCompiler {
    /// Compile `module`, providing `model`; returns the module build directory
    fn compile(&self, module: &str, model: &str, extensions: &ExtensionConfig, force: bool) -> Result<PathBuf>;
}

/// Copies the model sources into the build directory and runs the configured
/// compile command there
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandCompiler;

impl CommandCompiler {
    fn prepare(module: &str, model: &str, extensions: &ExtensionConfig, force: bool) -> Result<PathBuf> {
        let sources = extensions
            .modules_dir
            .as_ref()
            .map(|dir| dir.join(model))
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| NestError::CompileFailed {
                module: module.to_string(),
                log: format!("no sources for model {} in {:?}", model, extensions.modules_dir),
            })?;

        let build = extensions.build_dir.join(module);
        if force && build.exists() {
            debug!(target: "multiscale::nest", "Removing previous build of {} at {:?}", module, build);
            fs::remove_dir_all(&build)?;
        }
        copy_dir(&sources, &build)?;
        Ok(build)
    }

    fn command(module: &str, extensions: &ExtensionConfig) -> Result<Command> {
        let build_dir = extensions.build_dir.to_string_lossy();
        let mut args = extensions
            .compile_command
            .iter()
            .map(|arg| arg.replace("{module}", module).replace("{build_dir}", &build_dir));
        let program = args.next().ok_or_else(|| NestError::CompileFailed {
            module: module.to_string(),
            log: "empty compile command".into(),
        })?;
        let mut command = Command::new(program);
        command.args(args);
        Ok(command)
    }
}

impl ModuleCompiler for CommandCompiler {
    fn compile(&self, module: &str, model: &str, extensions: &ExtensionConfig, force: bool) -> Result<PathBuf> {
        let build = Self::prepare(module, model, extensions, force)?;
        let log_path = build.join("build.log");
        let log = fs::File::create(&log_path)?;

        info!(target: "multiscale::nest", "Compiling module {} in {:?}", module, build);
        let mut child = Self::command(module, extensions)?
            .current_dir(&build)
            .stdin(Stdio::null())
            .stdout(log.try_clone()?)
            .stderr(log)
            .spawn()?;

        let timeout = Duration::from_secs(extensions.compile_timeout_secs);
        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                warn!(target: "multiscale::nest", "Compilation of {} timed out, killing it", module);
                // the child may exit between the poll and the kill
                let _ = child.kill();
                let _ = child.wait();
                return Err(NestError::CompileTimeout {
                    module: module.to_string(),
                    secs: extensions.compile_timeout_secs,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            return Err(NestError::CompileFailed {
                module: module.to_string(),
                log: log_tail(&log_path),
            });
        }
        info!(target: "multiscale::nest", "Compiled module {}", module);
        Ok(build)
    }
}

fn log_tail(path: &Path) -> String {
    let text = fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(LOG_TAIL_LINES)..].join("\n")
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}
