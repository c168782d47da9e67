// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sweep runner.
//!
//! The main structure in this module is [`SweepRunner`]. It runs one recipe at a time and
//! threads a single [`SweepSummary`] through the sweep, producing [`SweepEvent`]s as it goes.

use crate::{
    classifier::{
        Classification, Classifier, CoverageExtractor, CoverageOutcome, FailureReason, Outcome,
        SuccessMarker,
    },
    config::SweepProfile,
    errors::SweepSetupError,
    locator::RecipeRef,
    recipe_command::{
        Invocation, ProcessRunner, RecipeCommand, RecipeCommandRunner, ResolvedCommand,
    },
    reporter::SweepEvent,
    summary::{CoverageContribution, CoverageSweepStats, SweepSummary, TestSweepStats},
    time::stopwatch,
};
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use std::{convert::Infallible, fmt, time::Duration};
use tracing::{debug, warn};

/// The kind of sweep to run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SweepMode {
    /// Run each recipe's tests and look for the success marker.
    Tests,

    /// Run each recipe's coverage command and average the percentages.
    Coverage,
}

impl SweepMode {
    /// The value of `SWEEP_MODE` passed to the tool.
    pub fn env_value(self) -> &'static str {
        match self {
            Self::Tests => "test",
            Self::Coverage => "coverage",
        }
    }
}

impl fmt::Display for SweepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_value())
    }
}

/// The result of running and classifying a single recipe.
#[derive(Clone, Debug)]
pub struct InvocationResult {
    /// The recipe.
    pub recipe: RecipeRef,

    /// The captured invocation.
    pub invocation: Invocation,

    /// The classified outcome.
    pub outcome: Outcome,

    /// Why the recipe failed, if it did.
    pub failure_reason: Option<FailureReason>,
}

impl InvocationResult {
    /// Returns true if the recipe passed, or had its coverage measured.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Sweep runner builder.
#[derive(Debug, Default)]
pub struct SweepRunnerBuilder {
    timeout: Option<Duration>,
    min_average: Option<f64>,
}

impl SweepRunnerBuilder {
    /// Overrides the profile's per-recipe timeout. A zero duration disables the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the profile's minimum average coverage.
    pub fn set_min_average(&mut self, min_average: f64) -> &mut Self {
        self.min_average = Some(min_average);
        self
    }

    /// Creates a new sweep runner that runs child processes.
    ///
    /// The command's program is looked up here, so a missing tool is reported before any recipe
    /// runs.
    pub fn build(
        &self,
        mode: SweepMode,
        profile: &SweepProfile<'_>,
    ) -> Result<SweepRunner<ProcessRunner>, SweepSetupError> {
        let command = match mode {
            SweepMode::Tests => profile.test_command(),
            SweepMode::Coverage => profile.coverage_command(),
        };
        let command = RecipeCommand::parse(command).map_err(|error| SweepSetupError::Command {
            mode: mode.env_value(),
            error,
        })?;
        let command = command
            .resolve(profile.root())
            .map_err(SweepSetupError::ToolMissing)?;

        let timeout = match self.timeout {
            Some(timeout) => (!timeout.is_zero()).then_some(timeout),
            None => profile.timeout(),
        };
        self.build_with_runner(
            mode,
            profile,
            command,
            ProcessRunner::new(mode, timeout),
        )
    }

    /// Creates a new sweep runner with a custom command runner and an already-resolved command.
    pub fn build_with_runner<R: RecipeCommandRunner>(
        &self,
        mode: SweepMode,
        profile: &SweepProfile<'_>,
        command: ResolvedCommand,
        runner: R,
    ) -> Result<SweepRunner<R>, SweepSetupError> {
        let (classifier, summary) = match mode {
            SweepMode::Tests => (
                Classifier::Test(
                    SuccessMarker::new(profile.success_marker())
                        .map_err(SweepSetupError::Pattern)?,
                ),
                SweepSummary::Tests(TestSweepStats::default()),
            ),
            SweepMode::Coverage => (
                Classifier::Coverage(
                    CoverageExtractor::new(profile.coverage_pattern())
                        .map_err(SweepSetupError::Pattern)?,
                ),
                SweepSummary::Coverage {
                    stats: CoverageSweepStats::default(),
                    min_average: self.min_average.unwrap_or_else(|| profile.min_average()),
                    policy: profile.coverage_policy(),
                },
            ),
        };

        Ok(SweepRunner {
            mode,
            root: profile.root().to_owned(),
            profile_name: profile.name().to_owned(),
            command,
            classifier,
            initial_summary: summary,
            runner,
        })
    }
}

/// Runs a sweep over a list of recipes.
#[derive(Debug)]
pub struct SweepRunner<R = ProcessRunner> {
    mode: SweepMode,
    root: Utf8PathBuf,
    profile_name: String,
    command: ResolvedCommand,
    classifier: Classifier,
    initial_summary: SweepSummary,
    runner: R,
}

impl<R: RecipeCommandRunner> SweepRunner<R> {
    /// The kind of sweep this runner performs.
    pub fn mode(&self) -> SweepMode {
        self.mode
    }

    /// The command run in each recipe.
    pub fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    /// Runs every recipe in order, calling `callback` with each event.
    pub fn execute<F>(&self, recipes: &[RecipeRef], mut callback: F) -> SweepOutcome
    where
        F: FnMut(SweepEvent<'_>),
    {
        let res: Result<_, Infallible> = self.try_execute(recipes, |event| {
            callback(event);
            Ok(())
        });
        match res {
            Ok(outcome) => outcome,
        }
    }

    /// Runs every recipe in order, calling `callback` with each event.
    ///
    /// If the callback returns an error, the sweep stops and the error is returned.
    pub fn try_execute<E, F>(
        &self,
        recipes: &[RecipeRef],
        mut callback: F,
    ) -> Result<SweepOutcome, E>
    where
        F: FnMut(SweepEvent<'_>) -> Result<(), E>,
    {
        let stopwatch = stopwatch();
        callback(SweepEvent::SweepStarted {
            mode: self.mode,
            root: &self.root,
            profile_name: &self.profile_name,
            recipe_count: recipes.len(),
        })?;

        if recipes.is_empty() {
            warn!("no recipes found under {}", self.root);
        }

        let mut summary = self.initial_summary;
        let mut results = Vec::with_capacity(recipes.len());
        for (index, recipe) in recipes.iter().enumerate() {
            debug!("running `{}` for {recipe}", self.command);
            let invocation = self.runner.run(recipe, &self.command);
            let Classification {
                outcome,
                failure_reason,
            } = self.classifier.classify(&invocation);

            if outcome == Outcome::Coverage(CoverageOutcome::Missing) {
                self.warn_missing_coverage(recipe, &summary);
            }

            summary.record(&outcome);
            let result = InvocationResult {
                recipe: recipe.clone(),
                invocation,
                outcome,
                failure_reason,
            };
            callback(SweepEvent::RecipeFinished {
                result: &result,
                index,
                total: recipes.len(),
            })?;
            results.push(result);
        }

        let snapshot = stopwatch.snapshot();
        let start_time = snapshot.start_time.fixed_offset();
        callback(SweepEvent::SweepFinished {
            start_time,
            elapsed: snapshot.duration,
            summary: &summary,
        })?;

        Ok(SweepOutcome {
            summary,
            results,
            start_time,
            elapsed: snapshot.duration,
        })
    }

    fn warn_missing_coverage(&self, recipe: &RecipeRef, summary: &SweepSummary) {
        let SweepSummary::Coverage { policy, .. } = summary else {
            return;
        };
        match policy.missing {
            CoverageContribution::Zero => {
                warn!("no coverage percentage in output of {recipe}, counting it as 0%")
            }
            CoverageContribution::Skip => {
                warn!("no coverage percentage in output of {recipe}, leaving it out of the average")
            }
        }
    }
}

/// The outcome of a complete sweep.
#[derive(Clone, Debug)]
pub struct SweepOutcome {
    /// Aggregate statistics.
    pub summary: SweepSummary,

    /// Per-recipe results, in the order the recipes ran.
    pub results: Vec<InvocationResult>,

    /// When the sweep started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the sweep took.
    pub elapsed: Duration,
}

impl SweepOutcome {
    /// Returns true if the sweep met its success criteria.
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}
