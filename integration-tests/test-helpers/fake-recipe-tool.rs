// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A stand-in for the cookbook's language tool.
//!
//! Invoked as `fake-recipe-tool <MODE>` from within a recipe directory. Its behavior is scripted by
//! files in that directory:
//!
//! * `<MODE>.out`: printed to stdout
//! * `<MODE>.exit`: the exit code (default 0)
//! * `<MODE>.sleep-ms`: milliseconds to sleep before printing anything
//!
//! A line describing the invocation is always printed to stderr first.

use color_eyre::{Result, eyre::WrapErr};
use std::{io::Write, time::Duration};

fn main() -> Result<()> {
    color_eyre::install()?;

    let mode = std::env::args().nth(1).unwrap_or_else(|| "test".to_owned());
    eprintln!(
        "fake-recipe-tool: {mode} {}/{} (SWEEP_MODE={})",
        env_or_unset("SWEEP_CHAPTER"),
        env_or_unset("SWEEP_RECIPE"),
        env_or_unset("SWEEP_MODE"),
    );

    if let Some(sleep_ms) = read_script(&format!("{mode}.sleep-ms"))? {
        let sleep_ms: u64 = sleep_ms.trim().parse().wrap_err("invalid sleep-ms")?;
        std::thread::sleep(Duration::from_millis(sleep_ms));
    }

    if let Some(output) = read_script(&format!("{mode}.out"))? {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(output.as_bytes())?;
        stdout.flush()?;
    }

    let exit_code = match read_script(&format!("{mode}.exit"))? {
        Some(code) => code.trim().parse().wrap_err("invalid exit code")?,
        None => 0,
    };
    std::process::exit(exit_code)
}

fn env_or_unset(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| "<unset>".to_owned())
}

fn read_script(file_name: &str) -> Result<Option<String>> {
    match fs_err::read_to_string(file_name) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}
