// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running the external tool in a recipe directory.
//!
//! Commands are configured as shell-words strings such as `ruchy test`. They are parsed into a
//! [`RecipeCommand`], resolved once against `PATH` into a [`ResolvedCommand`], and then run in each
//! recipe directory by a [`RecipeCommandRunner`].

use crate::{
    errors::{CommandParseError, ToolResolveError},
    locator::RecipeRef,
    runner::SweepMode,
    time::stopwatch,
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use std::{
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    time::Duration,
};
use tracing::debug;

/// A command parsed from its configured string form, not yet resolved to a program on disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecipeCommand {
    command: String,
    program: String,
    args: Vec<String>,
}

impl RecipeCommand {
    /// Parses a command from shell-words syntax.
    pub fn parse(command: &str) -> Result<Self, CommandParseError> {
        let mut words =
            shell_words::split(command).map_err(|error| CommandParseError::InvalidSyntax {
                command: command.to_owned(),
                error,
            })?;
        if words.is_empty() {
            return Err(CommandParseError::Empty);
        }
        let program = words.remove(0);
        Ok(Self {
            command: command.to_owned(),
            program,
            args: words,
        })
    }

    /// The program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Resolves the program on `PATH`.
    ///
    /// Programs given as a relative path with a directory component (e.g. `./bin/tool`) are
    /// resolved against `root` instead, so every recipe runs the same executable.
    pub fn resolve(&self, root: &Utf8Path) -> Result<ResolvedCommand, ToolResolveError> {
        let program = Path::new(&self.program);
        let lookup = if program.is_relative() && program.components().count() > 1 {
            root.as_std_path().join(program)
        } else {
            program.to_path_buf()
        };
        let program = which::which(&lookup)
            .map_err(|error| ToolResolveError::new(&self.program, &self.command, error))?;
        debug!("resolved `{}` to {}", self.program, program.display());

        Ok(ResolvedCommand {
            display: self.command.clone(),
            program,
            args: self.args.clone(),
        })
    }
}

impl fmt::Display for RecipeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// A command whose program was found before the sweep started.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedCommand {
    display: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ResolvedCommand {
    /// Creates a command for tests. Bare program names are looked up on `PATH`.
    #[cfg(test)]
    pub(crate) fn new_for_test(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        let program = program.into();
        let program = which::which(&program).unwrap_or(program);
        let args: Vec<String> = args.iter().map(|arg| (*arg).to_owned()).collect();
        Self {
            display: std::iter::once(program.display().to_string())
                .chain(args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" "),
            program,
            args,
        }
    }

    /// The resolved program.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Runs a command in a recipe directory.
///
/// Implementations record failures in the returned [`Invocation`] rather than returning errors:
/// one recipe failing to run never stops the sweep.
pub trait RecipeCommandRunner {
    /// Runs `command` for `recipe` and captures its combined output.
    fn run(&self, recipe: &RecipeRef, command: &ResolvedCommand) -> Invocation;
}

/// The result of running a command once.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// How the command ended.
    pub exit: InvocationExit,

    /// Standard output and standard error, interleaved in the order they were written, decoded
    /// lossily as UTF-8.
    pub output: String,

    /// When the command was started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the command took.
    pub time_taken: Duration,
}

/// How an invocation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InvocationExit {
    /// The command ran to completion. The code is `None` if it was terminated by a signal.
    Exited(Option<i32>),

    /// The command was killed after running for this long.
    TimedOut(Duration),

    /// The command could not be started in this recipe.
    SpawnFailed(String),
}

impl InvocationExit {
    /// Returns true if the command exited with code 0.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(Some(0)))
    }
}

/// Runs commands as child processes.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    mode: SweepMode,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Creates a new runner. Commands are killed after `timeout`, if set.
    pub fn new(mode: SweepMode, timeout: Option<Duration>) -> Self {
        Self { mode, timeout }
    }

    fn run_inner(
        &self,
        recipe: &RecipeRef,
        command: &ResolvedCommand,
    ) -> io::Result<(InvocationExit, String)> {
        let args: Vec<OsString> = command.args.iter().map(OsString::from).collect();
        let handle = duct::cmd(&command.program, args)
            .dir(recipe.path().as_std_path())
            .env("SWEEP_CHAPTER", recipe.chapter())
            .env("SWEEP_RECIPE", recipe.recipe())
            .env("SWEEP_MODE", self.mode.env_value())
            // Merge stderr into stdout so the two are captured in the order they were written.
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .before_spawn(|cmd| {
                os::set_process_group(cmd);
                Ok(())
            })
            .start()?;

        let timed_out = match self.timeout {
            Some(timeout) => wait_with_timeout(&handle, timeout)?.then_some(timeout),
            None => None,
        };

        let output = handle.into_output()?;
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        let exit = match timed_out {
            Some(timeout) => InvocationExit::TimedOut(timeout),
            None => InvocationExit::Exited(output.status.code()),
        };
        Ok((exit, text))
    }
}

impl RecipeCommandRunner for ProcessRunner {
    fn run(&self, recipe: &RecipeRef, command: &ResolvedCommand) -> Invocation {
        let stopwatch = stopwatch();
        let (exit, output) = match self.run_inner(recipe, command) {
            Ok(result) => result,
            Err(error) => {
                debug!("failed to run `{command}` in {}: {error}", recipe.path());
                (InvocationExit::SpawnFailed(error.to_string()), String::new())
            }
        };
        let snapshot = stopwatch.snapshot();

        Invocation {
            exit,
            output,
            start_time: snapshot.start_time.fixed_offset(),
            time_taken: snapshot.duration,
        }
    }
}

/// Waits for the child to exit, killing its process group if it runs longer than `timeout`.
///
/// Processes the child spawned hold the captured output pipe open, so they are killed along with
/// it. Returns true if the child was killed.
fn wait_with_timeout(handle: &duct::Handle, timeout: Duration) -> io::Result<bool> {
    std::thread::scope(|s| {
        let (sender, receiver) = mpsc::sync_channel::<()>(1);

        // This thread only waits for the child to exit. The output is collected on the sweep
        // thread once it does.
        s.spawn(move || {
            let _ = handle.wait();
            // The receiver may have stopped listening after a timeout.
            let _ = sender.send(());
        });

        match receiver.recv_timeout(timeout) {
            Ok(()) => Ok(false),
            Err(RecvTimeoutError::Timeout) => {
                os::kill_process_group(handle)?;
                Ok(true)
            }
            Err(RecvTimeoutError::Disconnected) => {
                unreachable!("the waiting thread always sends before exiting")
            }
        }
    })
}

#[cfg(unix)]
mod os {
    use std::{io, os::unix::process::CommandExt};

    pub(super) fn set_process_group(cmd: &mut std::process::Command) {
        cmd.process_group(0);
    }

    pub(super) fn kill_process_group(handle: &duct::Handle) -> io::Result<()> {
        for pid in handle.pids() {
            let pid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;
            // A negative pid signals every process in the group.
            if unsafe { libc::kill(-pid, libc::SIGKILL) } == -1 {
                let error = io::Error::last_os_error();
                // The group is already gone.
                if error.raw_os_error() != Some(libc::ESRCH) {
                    return Err(error);
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod os {
    use std::io;

    pub(super) fn set_process_group(_cmd: &mut std::process::Command) {}

    pub(super) fn kill_process_group(handle: &duct::Handle) -> io::Result<()> {
        handle.kill()
    }
}
