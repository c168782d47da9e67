// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use sweep_metadata::SweepExitCode;
use sweep_runner::errors::*;
use thiserror::Error;
use tracing::{error, info};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected failure: bad input, a missing tool, or a sweep that didn't meet its criteria.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("cookbook root could not be resolved")]
    RootResolveError {
        root: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("sweep setup error")]
    SweepSetupError {
        #[from]
        err: SweepSetupError,
    },
    #[error("invalid recipe glob")]
    PatternError {
        #[from]
        err: PatternError,
    },
    #[error("recipe discovery failed")]
    LocateError {
        #[from]
        err: LocateError,
    },
    #[error("scaffold failed")]
    ScaffoldError {
        #[from]
        err: ScaffoldError,
    },
    #[error("error writing sweep output")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("error writing to stdout")]
    WriteError {
        #[source]
        err: std::io::Error,
    },
    #[error("recipes failed")]
    RecipesFailed { failed: usize, total: usize },
    #[error("coverage below threshold")]
    CoverageBelowThreshold { average: f64, min_average: f64 },
    #[error("no coverage data")]
    NoCoverageData { recipes: usize },
}

impl ExpectedError {
    pub(crate) fn root_resolve_error(root: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::RootResolveError {
            root: root.into(),
            err,
        }
    }

    pub(crate) fn write_error(err: std::io::Error) -> Self {
        Self::WriteError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::RootResolveError { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::PatternError { .. }
            | Self::LocateError { .. } => SweepExitCode::SETUP_ERROR,
            Self::SweepSetupError { err } => match err {
                SweepSetupError::ToolMissing(_) => SweepExitCode::TOOL_MISSING,
                _ => SweepExitCode::SETUP_ERROR,
            },
            Self::ScaffoldError { .. } => SweepExitCode::SCAFFOLD_FAILED,
            Self::WriteEventError { .. } | Self::WriteError { .. } => {
                SweepExitCode::WRITE_OUTPUT_ERROR
            }
            Self::RecipesFailed { .. } => SweepExitCode::RECIPES_FAILED,
            Self::CoverageBelowThreshold { .. } | Self::NoCoverageData { .. } => {
                SweepExitCode::COVERAGE_BELOW_THRESHOLD
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::RootResolveError { root, err } => {
                error!("failed to resolve cookbook root `{}`", root.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse sweep config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::SweepSetupError { err } => match err {
                SweepSetupError::ToolMissing(err) => {
                    error!("{err}");
                    info!(
                        target: NO_HEADING,
                        "(is `{}` installed and on PATH? the command is set in .config/sweep.toml)",
                        err.program().style(styles.bold),
                    );
                    err.source()
                }
                other => {
                    error!("{other}");
                    other.source()
                }
            },
            Self::PatternError { err } => {
                error!("{err}");
                err.source()
            }
            Self::LocateError { err } => {
                error!(
                    "failed to read recipe directory `{}`",
                    err.dir().style(styles.bold)
                );
                err.source()
            }
            Self::ScaffoldError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteEventError { err } => {
                error!("failed to write sweep output");
                Some(err as &dyn Error)
            }
            Self::WriteError { err } => {
                error!("failed to write to stdout");
                Some(err as &dyn Error)
            }
            Self::RecipesFailed { failed, total } => {
                error!(
                    "sweep failed: {} of {} recipes failed",
                    failed.style(styles.bold),
                    total.style(styles.bold),
                );
                None
            }
            Self::CoverageBelowThreshold {
                average,
                min_average,
            } => {
                error!(
                    "sweep failed: average coverage {} is below the minimum of {}",
                    format!("{average:.2}%").style(styles.bold),
                    format!("{min_average:.2}%").style(styles.bold),
                );
                None
            }
            Self::NoCoverageData { recipes } => {
                error!(
                    "sweep failed: none of the {} recipes run reported coverage",
                    recipes.style(styles.bold),
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
