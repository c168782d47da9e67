// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Machine-readable sweep summaries.
//!
//! The types are defined in `sweep-metadata`. This module converts a [`SweepOutcome`] into them.

use crate::{
    classifier::{CoverageOutcome, Outcome},
    errors::WriteEventError,
    recipe_command::InvocationExit,
    runner::{InvocationResult, SweepOutcome},
    summary::SweepSummary,
};
use camino::Utf8Path;
use std::io::Write;
use sweep_metadata::{RecipeRunSummary, RecipeStatusSummary, SweepRunSummary, SweepTotalsSummary};

/// The JSON flavor to print a summary in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SummaryFormat {
    /// A single line of JSON.
    Json,

    /// Indented JSON.
    JsonPretty,
}

/// Converts a finished sweep into its serializable form.
pub fn run_summary(outcome: &SweepOutcome, root: &Utf8Path, profile_name: &str) -> SweepRunSummary {
    SweepRunSummary {
        root: root.to_owned(),
        profile: profile_name.to_owned(),
        duration_secs: outcome.elapsed.as_secs_f64(),
        success: outcome.is_success(),
        totals: totals_summary(&outcome.summary),
        recipes: outcome.results.iter().map(recipe_summary).collect(),
    }
}

/// Writes `summary` to `writer`, followed by a newline.
pub fn write_summary(
    summary: &SweepRunSummary,
    format: SummaryFormat,
    mut writer: impl Write,
) -> Result<(), WriteEventError> {
    let res = match format {
        SummaryFormat::Json => serde_json::to_writer(&mut writer, summary),
        SummaryFormat::JsonPretty => serde_json::to_writer_pretty(&mut writer, summary),
    };
    res.map_err(|error| WriteEventError::Io(error.into()))?;
    writeln!(writer).map_err(WriteEventError::Io)
}

fn totals_summary(summary: &SweepSummary) -> SweepTotalsSummary {
    match summary {
        SweepSummary::Tests(stats) => SweepTotalsSummary::Tests {
            total: stats.total(),
            passed: stats.passed(),
            failed: stats.failed(),
        },
        SweepSummary::Coverage {
            stats, min_average, ..
        } => SweepTotalsSummary::Coverage {
            recipes: stats.recipes(),
            count: stats.count(),
            measured: stats.measured(),
            missing: stats.missing(),
            failed: stats.failed(),
            average: stats.average().as_option(),
            min_average: *min_average,
        },
    }
}

fn recipe_summary(result: &InvocationResult) -> RecipeRunSummary {
    let (status, coverage) = match result.outcome {
        Outcome::Test { passed: true } => (RecipeStatusSummary::Pass, None),
        Outcome::Test { passed: false } => (RecipeStatusSummary::Fail, None),
        Outcome::Coverage(CoverageOutcome::Measured(percent)) => {
            (RecipeStatusSummary::Covered, Some(percent))
        }
        Outcome::Coverage(CoverageOutcome::Missing) => (RecipeStatusSummary::NoData, None),
        Outcome::Coverage(CoverageOutcome::Failed) => (RecipeStatusSummary::Fail, None),
    };
    let exit_code = match result.invocation.exit {
        InvocationExit::Exited(code) => code,
        InvocationExit::TimedOut(_) | InvocationExit::SpawnFailed(_) => None,
    };

    RecipeRunSummary {
        chapter: result.recipe.chapter().to_owned(),
        recipe: result.recipe.recipe().to_owned(),
        path: result.recipe.path().to_owned(),
        status,
        duration_secs: result.invocation.time_taken.as_secs_f64(),
        exit_code,
        coverage,
        reason: result.failure_reason.as_ref().map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier::FailureReason,
        locator::RecipeRef,
        recipe_command::Invocation,
        summary::{CoverageContribution, CoveragePolicy, CoverageSweepStats},
    };
    use chrono::Local;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn result(
        recipe: &str,
        exit: InvocationExit,
        outcome: Outcome,
        failure_reason: Option<FailureReason>,
    ) -> InvocationResult {
        InvocationResult {
            recipe: RecipeRef::new("chapter-01", recipe, format!("/book/chapter-01/{recipe}")),
            invocation: Invocation {
                exit,
                output: String::new(),
                start_time: Local::now().fixed_offset(),
                time_taken: Duration::from_millis(500),
            },
            outcome,
            failure_reason,
        }
    }

    #[test]
    fn coverage_summary() {
        let policy = CoveragePolicy {
            missing: CoverageContribution::Zero,
            failed: CoverageContribution::Skip,
        };
        let outcomes = [
            CoverageOutcome::Measured(90.0),
            CoverageOutcome::Missing,
            CoverageOutcome::Failed,
        ];
        let mut stats = CoverageSweepStats::default();
        for outcome in &outcomes {
            stats.record(outcome, &policy);
        }
        let outcome = SweepOutcome {
            summary: SweepSummary::Coverage {
                stats,
                min_average: 40.0,
                policy,
            },
            results: vec![
                result(
                    "hello",
                    InvocationExit::Exited(Some(0)),
                    Outcome::Coverage(outcomes[0]),
                    None,
                ),
                result(
                    "loops",
                    InvocationExit::Exited(Some(0)),
                    Outcome::Coverage(outcomes[1]),
                    None,
                ),
                result(
                    "io",
                    InvocationExit::TimedOut(Duration::from_secs(5)),
                    Outcome::Coverage(outcomes[2]),
                    Some(FailureReason::TimedOut {
                        after: Duration::from_secs(5),
                    }),
                ),
            ],
            start_time: Local::now().fixed_offset(),
            elapsed: Duration::from_millis(1500),
        };

        let summary = run_summary(&outcome, Utf8Path::new("/book"), "ci");
        assert!(summary.success);
        assert_eq!(summary.duration_secs, 1.5);
        assert_eq!(
            summary.totals,
            SweepTotalsSummary::Coverage {
                recipes: 3,
                count: 2,
                measured: 1,
                missing: 1,
                failed: 1,
                average: Some(45.0),
                min_average: 40.0,
            }
        );
        let statuses: Vec<_> = summary
            .recipes
            .iter()
            .map(|recipe| (recipe.status, recipe.coverage, recipe.exit_code))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (RecipeStatusSummary::Covered, Some(90.0), Some(0)),
                (RecipeStatusSummary::NoData, None, Some(0)),
                (RecipeStatusSummary::Fail, None, None),
            ]
        );
        assert_eq!(
            summary.recipes[2].reason.as_deref(),
            Some("timed out after 5s")
        );
    }

    #[test]
    fn json_round_trips_through_metadata() {
        let outcome = SweepOutcome {
            summary: SweepSummary::Tests(Default::default()),
            results: vec![],
            start_time: Local::now().fixed_offset(),
            elapsed: Duration::ZERO,
        };
        let summary = run_summary(&outcome, Utf8Path::new("/book"), "default");

        let mut buf = Vec::new();
        write_summary(&summary, SummaryFormat::Json, &mut buf).expect("summary written");
        let json = String::from_utf8(buf).expect("JSON is UTF-8");
        assert_eq!(json.lines().count(), 1, "single-line JSON: {json}");
        assert!(json.contains(r#""mode":"tests""#), "{json}");

        let parsed = SweepRunSummary::parse_json(&json).expect("JSON parses");
        assert_eq!(parsed, summary);
    }
}
