// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::{fmt, process::Command};
use sweep_metadata::SweepRunSummary;

/// Environment variables that would change the binary's behavior if inherited from the caller.
const SCRUBBED_ENV: &[&str] = &[
    "SWEEP_PROFILE",
    "SWEEP_ROOT",
    "SWEEP_LOG",
    "SWEEP_VERBOSE",
];

#[derive(Clone, Debug)]
pub struct SweepCli {
    bin: Utf8PathBuf,
    args: Vec<String>,
}

impl SweepCli {
    pub fn new() -> Self {
        Self {
            bin: env!("CARGO_BIN_EXE_recipe-sweep-dup").into(),
            args: vec!["--color".to_owned(), "never".to_owned()],
        }
    }

    pub fn args(&mut self, args: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output(&self) -> SweepOutput {
        let mut command = Command::new(&self.bin);
        command.args(&self.args);
        for var in SCRUBBED_ENV {
            command.env_remove(var);
        }
        let output = command.output().expect("failed to execute recipe-sweep-dup");

        SweepOutput {
            args: self.args.clone(),
            exit_code: output.status.code(),
            stdout: String::from_utf8(output.stdout).expect("stdout is valid UTF-8"),
            stderr: String::from_utf8(output.stderr).expect("stderr is valid UTF-8"),
        }
    }
}

pub struct SweepOutput {
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl SweepOutput {
    #[track_caller]
    pub fn assert_exit_code(&self, expected: i32) -> &Self {
        assert_eq!(self.exit_code, Some(expected), "unexpected exit code:\n{self}");
        self
    }

    #[track_caller]
    pub fn summary(&self) -> SweepRunSummary {
        SweepRunSummary::parse_json(&self.stdout)
            .unwrap_or_else(|error| panic!("stdout is not a sweep summary ({error}):\n{self}"))
    }

    #[track_caller]
    pub fn assert_stderr_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stderr.contains(needle),
            "stderr does not contain {needle:?}:\n{self}"
        );
        self
    }
}

impl fmt::Display for SweepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- args: {} ---", shell_words::join(&self.args))?;
        writeln!(f, "--- exit code: {:?} ---", self.exit_code)?;
        writeln!(f, "--- stdout ---\n{}", self.stdout)?;
        write!(f, "--- stderr ---\n{}", self.stderr)
    }
}
