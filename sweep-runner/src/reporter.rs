// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out and aggregates sweep results.
//!
//! The main structure in this module is [`SweepReporter`].

mod aggregator;
pub mod structured;

use crate::{
    classifier::{CoverageOutcome, FailureReason, Outcome},
    config::SweepProfile,
    errors::{OutputDisplayParseError, WriteEventError},
    helpers::{plural, write_recipe_name},
    reporter::aggregator::EventAggregator,
    runner::{InvocationResult, SweepMode},
    summary::{CoverageAverage, SweepSummary},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset};
use debug_ignore::DebugIgnore;
use owo_colors::{OwoColorize, Style};
use serde::Deserialize;
use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
    time::Duration,
};

/// When to display the captured output of failing recipes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDisplay {
    /// Show output immediately after the recipe's status line.
    Immediate,

    /// Show output immediately, and again at the end of the sweep.
    ImmediateFinal,

    /// Show output at the end of the sweep.
    Final,

    /// Never show output.
    Never,
}

impl OutputDisplay {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["immediate", "immediate-final", "final", "never"]
    }

    /// Returns true if output is shown immediately.
    pub fn is_immediate(self) -> bool {
        match self {
            OutputDisplay::Immediate | OutputDisplay::ImmediateFinal => true,
            OutputDisplay::Final | OutputDisplay::Never => false,
        }
    }

    /// Returns true if output is shown at the end of the sweep.
    pub fn is_final(self) -> bool {
        match self {
            OutputDisplay::Final | OutputDisplay::ImmediateFinal => true,
            OutputDisplay::Immediate | OutputDisplay::Never => false,
        }
    }
}

impl FromStr for OutputDisplay {
    type Err = OutputDisplayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "immediate" => OutputDisplay::Immediate,
            "immediate-final" => OutputDisplay::ImmediateFinal,
            "final" => OutputDisplay::Final,
            "never" => OutputDisplay::Never,
            other => return Err(OutputDisplayParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for OutputDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputDisplay::Immediate => write!(f, "immediate"),
            OutputDisplay::ImmediateFinal => write!(f, "immediate-final"),
            OutputDisplay::Final => write!(f, "final"),
            OutputDisplay::Never => write!(f, "never"),
        }
    }
}

/// Sweep reporter builder.
#[derive(Debug, Default)]
pub struct SweepReporterBuilder {
    failure_output: Option<OutputDisplay>,
    verbose: bool,
    report_dir: Option<Utf8PathBuf>,
}

impl SweepReporterBuilder {
    /// Sets the conditions under which the output of failing recipes is displayed.
    pub fn set_failure_output(&mut self, failure_output: OutputDisplay) -> &mut Self {
        self.failure_output = Some(failure_output);
        self
    }

    /// Sets verbose mode.
    ///
    /// In verbose mode, a failure output setting of `never` is treated as `immediate`.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Sets the directory raw recipe output is written to, overriding the profile.
    pub fn set_report_dir(&mut self, report_dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.report_dir = Some(report_dir.into());
        self
    }
}

impl SweepReporterBuilder {
    /// Creates a new sweep reporter.
    pub fn build<'cfg>(&self, profile: &SweepProfile<'cfg>) -> SweepReporter<'cfg> {
        let failure_output = self
            .failure_output
            .unwrap_or_else(|| profile.failure_output());
        let failure_output = match (failure_output, self.verbose) {
            (OutputDisplay::Never, true) => OutputDisplay::Immediate,
            (other, _) => other,
        };
        let report_dir = self.report_dir.clone().or_else(|| profile.report_dir());

        SweepReporter {
            failure_output,
            styles: Box::default(),
            failures: DebugIgnore(vec![]),
            aggregator: EventAggregator::new(report_dir, profile.junit()),
        }
    }
}

/// Functionality to report sweep results to stderr, JUnit and raw output files.
#[derive(Debug)]
pub struct SweepReporter<'cfg> {
    failure_output: OutputDisplay,
    styles: Box<Styles>,
    failures: DebugIgnore<Vec<InvocationResult>>,
    aggregator: EventAggregator<'cfg>,
}

impl SweepReporter<'_> {
    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Report a sweep event.
    pub fn report_event(
        &mut self,
        event: SweepEvent<'_>,
        writer: impl Write,
    ) -> Result<(), WriteEventError> {
        self.write_event_impl(event, writer)
            .map_err(WriteEventError::Io)?;
        self.aggregator.write_event(event)
    }

    // ---
    // Helper methods
    // ---

    fn write_event_impl(&mut self, event: SweepEvent<'_>, mut writer: impl Write) -> io::Result<()> {
        match event {
            SweepEvent::SweepStarted {
                mode,
                root,
                profile_name,
                recipe_count,
            } => {
                write!(writer, "{:>12} ", "Sweeping".style(self.styles.pass))?;
                let count = recipe_count.style(self.styles.count);
                let recipes = plural::recipes_str(recipe_count);
                match mode {
                    SweepMode::Tests => write!(writer, "{count} {recipes}")?,
                    SweepMode::Coverage => write!(writer, "{count} {recipes} for coverage")?,
                }
                writeln!(
                    writer,
                    " under {} (profile: {})",
                    root,
                    profile_name.style(self.styles.count)
                )?;
            }
            SweepEvent::RecipeFinished { result, .. } => {
                self.write_status_line(result, false, &mut writer)?;

                if !result.is_success() {
                    if self.failure_output.is_immediate() {
                        self.write_output(result, &mut writer)?;
                    }
                    self.failures.push(result.clone());
                }
            }
            SweepEvent::SweepFinished {
                elapsed, summary, ..
            } => {
                let summary_style = if summary.is_success() {
                    self.styles.pass
                } else {
                    self.styles.fail
                };
                write!(writer, "{:>12} ", "Summary".style(summary_style))?;
                self.write_duration(elapsed, &mut writer)?;
                self.write_summary(summary, &mut writer)?;
                writeln!(writer)?;

                for result in self.failures.iter() {
                    self.write_status_line(result, true, &mut writer)?;
                }
                if self.failure_output.is_final() {
                    for result in self.failures.iter() {
                        self.write_output(result, &mut writer)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn write_status_line(
        &self,
        result: &InvocationResult,
        with_reason: bool,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let (status, style) = match &result.outcome {
            Outcome::Test { passed: true } => ("PASS", self.styles.pass),
            Outcome::Coverage(CoverageOutcome::Measured(_)) => ("COVER", self.styles.pass),
            Outcome::Coverage(CoverageOutcome::Missing) => ("NO DATA", self.styles.skip),
            Outcome::Test { passed: false } | Outcome::Coverage(CoverageOutcome::Failed) => {
                match &result.failure_reason {
                    Some(FailureReason::TimedOut { .. }) => ("TIMEOUT", self.styles.fail),
                    Some(FailureReason::SpawnFailed { .. }) => ("XFAIL", self.styles.fail),
                    _ => ("FAIL", self.styles.fail),
                }
            }
        };
        write!(writer, "{:>12} ", status.style(style))?;
        self.write_duration(result.invocation.time_taken, &mut writer)?;

        if let Outcome::Coverage(outcome) = &result.outcome {
            let percent = match outcome {
                CoverageOutcome::Measured(percent) => format!("{percent:.2}%"),
                CoverageOutcome::Missing | CoverageOutcome::Failed => "-".to_owned(),
            };
            // "100.00%" is the widest value.
            write!(writer, "{:>7} ", percent.style(self.styles.count))?;
        }

        write_recipe_name(&result.recipe, &self.styles, &mut writer)?;

        if with_reason {
            match (&result.failure_reason, &result.outcome) {
                (Some(reason), _) => write!(writer, ": {reason}")?,
                (None, Outcome::Coverage(CoverageOutcome::Missing)) => {
                    write!(writer, ": no coverage percentage in output")?
                }
                (None, _) => {}
            }
        }
        writeln!(writer)
    }

    fn write_duration(&self, duration: Duration, mut writer: impl Write) -> io::Result<()> {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(writer, "[{:>8.3?}s] ", duration.as_secs_f64())
    }

    fn write_summary(&self, summary: &SweepSummary, mut writer: impl Write) -> io::Result<()> {
        match summary {
            SweepSummary::Tests(stats) => {
                write!(
                    writer,
                    "{} {} run: {} passed",
                    stats.total().style(self.styles.count),
                    plural::recipes_str(stats.total()),
                    stats.passed().style(self.styles.pass),
                )?;
                if stats.failed() > 0 {
                    write!(
                        writer,
                        ", {} {}",
                        stats.failed().style(self.styles.count),
                        "failed".style(self.styles.fail),
                    )?;
                } else {
                    write!(writer, ", {} failed", stats.failed())?;
                }
            }
            SweepSummary::Coverage {
                stats, min_average, ..
            } => {
                match stats.average() {
                    CoverageAverage::Average(average) => {
                        let style = if average >= *min_average {
                            self.styles.pass
                        } else {
                            self.styles.fail
                        };
                        write!(writer, "average {}", format!("{average:.2}%").style(style))?;
                    }
                    CoverageAverage::NoData => {
                        let style = if stats.recipes() == 0 {
                            self.styles.skip
                        } else {
                            self.styles.fail
                        };
                        write!(writer, "average {}", "no data".style(style))?
                    }
                }
                write!(
                    writer,
                    " (minimum {min_average:.2}%) across {} of {} {}: {} measured",
                    stats.count().style(self.styles.count),
                    stats.recipes().style(self.styles.count),
                    plural::recipes_str(stats.recipes()),
                    stats.measured().style(self.styles.pass),
                )?;
                if stats.missing() > 0 {
                    write!(
                        writer,
                        ", {} {}",
                        stats.missing().style(self.styles.count),
                        "missing".style(self.styles.skip),
                    )?;
                }
                if stats.failed() > 0 {
                    write!(
                        writer,
                        ", {} {}",
                        stats.failed().style(self.styles.count),
                        "failed".style(self.styles.fail),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn write_output(&self, result: &InvocationResult, mut writer: impl Write) -> io::Result<()> {
        let header_style = self.styles.fail;
        write!(writer, "\n{}", "--- OUTPUT: ".style(header_style))?;
        write_recipe_name(&result.recipe, &self.styles, &mut writer)?;
        writeln!(writer, "{}", " ---".style(header_style))?;

        {
            // Strip ANSI escapes from the output in case the tool doesn't check for ttys before
            // producing color output.
            let mut no_color = strip_ansi_escapes::Writer::new(&mut writer);
            no_color.write_all(result.invocation.output.as_bytes())?;
        }
        if !result.invocation.output.is_empty() && !result.invocation.output.ends_with('\n') {
            writeln!(writer)?;
        }

        writeln!(writer)
    }
}

/// A sweep event.
///
/// Events are produced by a [`SweepRunner`](crate::runner::SweepRunner) and consumed by a
/// [`SweepReporter`].
#[derive(Copy, Clone, Debug)]
pub enum SweepEvent<'a> {
    /// The sweep started.
    SweepStarted {
        /// The kind of sweep.
        mode: SweepMode,

        /// The cookbook root.
        root: &'a Utf8Path,

        /// The configuration profile in use.
        profile_name: &'a str,

        /// The number of recipes that will be run.
        recipe_count: usize,
    },

    /// A recipe finished running and was classified.
    RecipeFinished {
        /// The result.
        result: &'a InvocationResult,

        /// The zero-based position of this recipe in the sweep.
        index: usize,

        /// The number of recipes in the sweep.
        total: usize,
    },

    /// The sweep finished.
    SweepFinished {
        /// The time at which the sweep was started.
        start_time: DateTime<FixedOffset>,

        /// The amount of time it took for the sweep to run.
        elapsed: Duration,

        /// Aggregate statistics.
        summary: &'a SweepSummary,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    pub(crate) chapter: Style,
    pub(crate) recipe: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.chapter = Style::new().magenta();
        self.recipe = Style::new().blue().bold();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SweepConfig,
        locator::RecipeRef,
        recipe_command::{Invocation, InvocationExit},
        summary::{CoverageContribution, CoveragePolicy, CoverageSweepStats, TestSweepStats},
    };
    use chrono::Local;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn result(
        name: &str,
        millis: u64,
        outcome: Outcome,
        failure_reason: Option<FailureReason>,
        output: &str,
    ) -> InvocationResult {
        let (chapter, recipe) = name.split_once('/').expect("name is chapter/recipe");
        InvocationResult {
            recipe: RecipeRef::new(chapter, recipe, format!("/book/{name}")),
            invocation: Invocation {
                exit: InvocationExit::Exited(Some(0)),
                output: output.to_owned(),
                start_time: Local::now().fixed_offset(),
                time_taken: Duration::from_millis(millis),
            },
            outcome,
            failure_reason,
        }
    }

    fn render(builder: &SweepReporterBuilder, events: &[SweepEvent<'_>]) -> String {
        let config = SweepConfig::default_config("/book");
        let profile = config.profile("default").expect("default profile exists");
        let mut reporter = builder.build(&profile);
        let mut buf = Vec::new();
        for event in events {
            reporter
                .report_event(*event, &mut buf)
                .expect("writing to a buffer succeeds");
        }
        String::from_utf8(buf).expect("output is valid UTF-8")
    }

    #[test_case("immediate", OutputDisplay::Immediate ; "immediate")]
    #[test_case("immediate-final", OutputDisplay::ImmediateFinal ; "immediate final")]
    #[test_case("final", OutputDisplay::Final ; "final")]
    #[test_case("never", OutputDisplay::Never ; "never")]
    fn output_display_from_str(input: &str, expected: OutputDisplay) {
        let parsed: OutputDisplay = input.parse().expect("known value");
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), input);
    }

    #[test]
    fn unknown_output_display() {
        let error = "sometimes"
            .parse::<OutputDisplay>()
            .expect_err("unknown value");
        assert_eq!(
            error.to_string(),
            "unrecognized value for failure output: sometimes\n\
             (known values: immediate, immediate-final, final, never)"
        );
    }

    #[test]
    fn test_sweep_lines() {
        let pass = result("chapter-01/hello", 34, Outcome::Test { passed: true }, None, "");
        let fail = result(
            "chapter-01/loops",
            102,
            Outcome::Test { passed: false },
            Some(FailureReason::MarkerAbsent),
            "1 test failed\n",
        );
        let timeout = result(
            "chapter-02/io",
            10_000,
            Outcome::Test { passed: false },
            Some(FailureReason::TimedOut {
                after: Duration::from_secs(10),
            }),
            "",
        );
        let mut stats = TestSweepStats::default();
        stats.record(true);
        stats.record(false);
        stats.record(false);
        let summary = SweepSummary::Tests(stats);

        let output = render(
            &SweepReporterBuilder::default(),
            &[
                SweepEvent::SweepStarted {
                    mode: SweepMode::Tests,
                    root: Utf8Path::new("/book"),
                    profile_name: "default",
                    recipe_count: 3,
                },
                SweepEvent::RecipeFinished {
                    result: &pass,
                    index: 0,
                    total: 3,
                },
                SweepEvent::RecipeFinished {
                    result: &fail,
                    index: 1,
                    total: 3,
                },
                SweepEvent::RecipeFinished {
                    result: &timeout,
                    index: 2,
                    total: 3,
                },
                SweepEvent::SweepFinished {
                    start_time: Local::now().fixed_offset(),
                    elapsed: Duration::from_millis(10_240),
                    summary: &summary,
                },
            ],
        );

        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            vec![
                "    Sweeping 3 recipes under /book (profile: default)",
                "        PASS [   0.034s] chapter-01/hello",
                "        FAIL [   0.102s] chapter-01/loops",
                "     TIMEOUT [  10.000s] chapter-02/io",
                "     Summary [  10.240s] 3 recipes run: 1 passed, 2 failed",
                "        FAIL [   0.102s] chapter-01/loops: success marker not found in output",
                "     TIMEOUT [  10.000s] chapter-02/io: timed out after 10s",
            ]
        );
    }

    #[test]
    fn coverage_sweep_lines() {
        let measured = result(
            "chapter-01/hello",
            50,
            Outcome::Coverage(CoverageOutcome::Measured(86.5)),
            None,
            "Coverage: 86.5%\n",
        );
        let missing = result(
            "chapter-01/loops",
            20,
            Outcome::Coverage(CoverageOutcome::Missing),
            None,
            "done\n",
        );
        let policy = CoveragePolicy {
            missing: CoverageContribution::Zero,
            failed: CoverageContribution::Skip,
        };
        let mut stats = CoverageSweepStats::default();
        stats.record(&CoverageOutcome::Measured(86.5), &policy);
        stats.record(&CoverageOutcome::Missing, &policy);
        let summary = SweepSummary::Coverage {
            stats,
            min_average: 80.0,
            policy,
        };

        let output = render(
            &SweepReporterBuilder::default(),
            &[
                SweepEvent::SweepStarted {
                    mode: SweepMode::Coverage,
                    root: Utf8Path::new("/book"),
                    profile_name: "ci",
                    recipe_count: 2,
                },
                SweepEvent::RecipeFinished {
                    result: &measured,
                    index: 0,
                    total: 2,
                },
                SweepEvent::RecipeFinished {
                    result: &missing,
                    index: 1,
                    total: 2,
                },
                SweepEvent::SweepFinished {
                    start_time: Local::now().fixed_offset(),
                    elapsed: Duration::from_millis(70),
                    summary: &summary,
                },
            ],
        );

        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            vec![
                "    Sweeping 2 recipes for coverage under /book (profile: ci)",
                "       COVER [   0.050s]  86.50% chapter-01/hello",
                "     NO DATA [   0.020s]       - chapter-01/loops",
                "     Summary [   0.070s] average 43.25% (minimum 80.00%) across 2 of 2 recipes: \
                 1 measured, 1 missing",
                "     NO DATA [   0.020s]       - chapter-01/loops: no coverage percentage in output",
            ]
        );
    }

    #[test_case(OutputDisplay::Never, false, 0 ; "never")]
    #[test_case(OutputDisplay::Never, true, 1 ; "verbose upgrades never")]
    #[test_case(OutputDisplay::Immediate, false, 1 ; "immediate")]
    #[test_case(OutputDisplay::Final, false, 1 ; "final")]
    #[test_case(OutputDisplay::ImmediateFinal, false, 2 ; "immediate final")]
    fn failure_output_display(display: OutputDisplay, verbose: bool, expected_blocks: usize) {
        let fail = result(
            "chapter-01/loops",
            10,
            Outcome::Test { passed: false },
            Some(FailureReason::NonZeroExit { code: Some(1) }),
            "\x1b[31merror: assertion failed\x1b[0m",
        );
        let mut stats = TestSweepStats::default();
        stats.record(false);
        let summary = SweepSummary::Tests(stats);

        let mut builder = SweepReporterBuilder::default();
        builder.set_failure_output(display).set_verbose(verbose);
        let output = render(
            &builder,
            &[
                SweepEvent::RecipeFinished {
                    result: &fail,
                    index: 0,
                    total: 1,
                },
                SweepEvent::SweepFinished {
                    start_time: Local::now().fixed_offset(),
                    elapsed: Duration::from_millis(10),
                    summary: &summary,
                },
            ],
        );

        assert_eq!(
            output.matches("--- OUTPUT: chapter-01/loops ---").count(),
            expected_blocks,
            "output:\n{output}"
        );
        assert_eq!(
            output.matches("error: assertion failed\n").count(),
            expected_blocks,
            "captured output is printed without escapes:\n{output}"
        );
    }
}
