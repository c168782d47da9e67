// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use sweep_runner::{
    config::SweepConfig,
    errors::WriteEventError,
    locator::RecipeLocator,
    reporter::{
        OutputDisplay, SweepReporterBuilder,
        structured::{self, SummaryFormat},
    },
    runner::{SweepMode, SweepRunnerBuilder},
    scaffold::Scaffolder,
    summary::SweepSummary,
};
use supports_color::Stream;
use tracing::{debug, info};

/// Runs the tests of every recipe in a cookbook, or measures their coverage.
///
/// Recipes are directories laid out as `<root>/<chapter>/<recipe>`. Each recipe is run with the
/// configured tool, one at a time, and its combined output is classified.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "recipe-sweep",
    styles = crate::output::clap_styles::style(),
)]
pub struct RecipeSweepApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl RecipeSweepApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<()> {
        match self.command {
            Command::SweepTests { sweep_opts } => {
                sweep_opts.exec(SweepMode::Tests, None, &self.config_opts, output, output_writer)
            }
            Command::SweepCoverage {
                min_average,
                sweep_opts,
            } => sweep_opts.exec(
                SweepMode::Coverage,
                min_average,
                &self.config_opts,
                output,
                output_writer,
            ),
            Command::Scaffold {
                root_opts,
                chapter,
                title,
            } => {
                let root = root_opts.resolve()?;
                let config = self.config_opts.make_config(&root)?;
                let recipe =
                    Scaffolder::from_config(&root, config.scaffold()).create(&chapter, &title)?;
                info!("created recipe {recipe} at {}", recipe.path());

                let mut stdout = output_writer.stdout_writer();
                writeln!(stdout, "{}", recipe.path()).map_err(ExpectedError::write_error)?;
                stdout.flush().map_err(ExpectedError::write_error)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: <root>/.config/sweep.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Configuration profile to use
    #[arg(
        long,
        short = 'P',
        global = true,
        value_name = "NAME",
        env = "SWEEP_PROFILE",
        default_value = SweepConfig::DEFAULT_PROFILE,
    )]
    profile: String,
}

impl ConfigOpts {
    /// Creates a sweep config with the given options.
    fn make_config(&self, root: &Utf8Path) -> Result<SweepConfig> {
        Ok(SweepConfig::from_sources(root, self.config_file.as_deref())?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every recipe's tests and check for the success marker
    ///
    /// A recipe passes if its output contains the configured success marker, regardless of the
    /// exit code. The sweep fails if any recipe fails.
    SweepTests {
        #[command(flatten)]
        sweep_opts: SweepOpts,
    },

    /// Run every recipe's coverage command and average the reported percentages
    ///
    /// The sweep fails if the average is below the minimum. A sweep with no coverage data passes.
    SweepCoverage {
        /// Minimum average coverage percentage, 0 to 100 [default: from profile]
        #[arg(
            long,
            value_name = "PERCENT",
            value_parser = parse_percent,
            help_heading = "RUNNER OPTIONS"
        )]
        min_average: Option<f64>,

        #[command(flatten)]
        sweep_opts: SweepOpts,
    },

    /// Create a new recipe skeleton
    ///
    /// Creates `<root>/<CHAPTER>/<slug>/` with a README and example and test sources.
    Scaffold {
        #[command(flatten)]
        root_opts: RootOpts,

        /// Chapter directory name, created if missing
        chapter: String,

        /// Recipe title, turned into the directory name
        title: String,
    },
}

#[derive(Debug, Args)]
struct RootOpts {
    /// Cookbook root directory [default: current directory]
    #[arg(long, value_name = "DIR", env = "SWEEP_ROOT")]
    root: Option<Utf8PathBuf>,
}

impl RootOpts {
    /// Returns the absolute cookbook root.
    fn resolve(&self) -> Result<Utf8PathBuf> {
        let root = self.root.clone().unwrap_or_else(|| Utf8PathBuf::from("."));
        let absolute = std::path::absolute(&root)
            .map_err(|err| ExpectedError::root_resolve_error(&root, err))?;
        let absolute = Utf8PathBuf::try_from(absolute)
            .map_err(|err| ExpectedError::root_resolve_error(&root, err.into_io_error()))?;
        debug!("cookbook root: {absolute}");
        Ok(absolute)
    }
}

#[derive(Debug, Args)]
struct SweepOpts {
    #[command(flatten)]
    root_opts: RootOpts,

    /// Per-recipe timeout, e.g. 30s or 5m; 0s disables it [default: from profile]
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "RUNNER OPTIONS",
    )]
    timeout: Option<std::time::Duration>,

    /// Show captured output of failing recipes: immediate, immediate-final, final, never
    #[arg(long, value_name = "WHEN", help_heading = "REPORTER OPTIONS")]
    failure_output: Option<OutputDisplay>,

    /// Write each recipe's captured output to <DIR>/<chapter>/<recipe>.log
    #[arg(long, value_name = "DIR", help_heading = "REPORTER OPTIONS")]
    report_dir: Option<Utf8PathBuf>,

    /// Format of the final summary printed to stdout
    #[arg(
        long,
        value_enum,
        default_value_t,
        value_name = "FMT",
        help_heading = "REPORTER OPTIONS"
    )]
    message_format: MessageFormatOpts,
}

impl SweepOpts {
    fn exec(
        &self,
        mode: SweepMode,
        min_average: Option<f64>,
        config_opts: &ConfigOpts,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let root = self.root_opts.resolve()?;
        let config = config_opts.make_config(&root)?;
        let profile = config.profile(&config_opts.profile)?;

        let mut runner_builder = SweepRunnerBuilder::default();
        if let Some(timeout) = self.timeout {
            runner_builder.set_timeout(timeout);
        }
        if let Some(min_average) = min_average {
            runner_builder.set_min_average(min_average);
        }
        // Resolving the tool happens here, before any recipe is located or run.
        let runner = runner_builder.build(mode, &profile)?;

        let recipes = RecipeLocator::from_config(config.locate())?.locate(&root)?;

        let mut reporter_builder = SweepReporterBuilder::default();
        reporter_builder.set_verbose(output.verbose);
        if let Some(failure_output) = self.failure_output {
            reporter_builder.set_failure_output(failure_output);
        }
        if let Some(report_dir) = &self.report_dir {
            reporter_builder.set_report_dir(report_dir.clone());
        }
        let mut reporter = reporter_builder.build(&profile);
        if output.color.should_colorize(Stream::Stderr) {
            reporter.colorize();
        }

        let outcome = {
            let mut writer = output_writer.stderr_writer();
            runner.try_execute(&recipes, |event| {
                // Write and flush the event.
                reporter.report_event(event, &mut writer)?;
                writer.flush().map_err(WriteEventError::Io)
            })?
        };

        if let Some(format) = self.message_format.to_summary_format() {
            let summary = structured::run_summary(&outcome, &root, profile.name());
            let mut stdout = output_writer.stdout_writer();
            structured::write_summary(&summary, format, &mut stdout)?;
            stdout.flush().map_err(ExpectedError::write_error)?;
        }

        if outcome.is_success() {
            return Ok(());
        }
        match outcome.summary {
            SweepSummary::Tests(stats) => Err(ExpectedError::RecipesFailed {
                failed: stats.failed(),
                total: stats.total(),
            }),
            SweepSummary::Coverage {
                stats, min_average, ..
            } => match stats.average().as_option() {
                Some(average) => Err(ExpectedError::CoverageBelowThreshold {
                    average,
                    min_average,
                }),
                None => Err(ExpectedError::NoCoverageData {
                    recipes: stats.recipes(),
                }),
            },
        }
    }
}

fn parse_percent(input: &str) -> std::result::Result<f64, String> {
    let percent: f64 = input
        .parse()
        .map_err(|err| format!("invalid percentage `{input}`: {err}"))?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(format!("percentage `{input}` is not between 0 and 100"));
    }
    Ok(percent)
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    #[default]
    Human,
    Json,
    JsonPretty,
}

impl MessageFormatOpts {
    fn to_summary_format(self) -> Option<SummaryFormat> {
        match self {
            Self::Human => None,
            Self::Json => Some(SummaryFormat::Json),
            Self::JsonPretty => Some(SummaryFormat::JsonPretty),
        }
    }
}
