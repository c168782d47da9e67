// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Root element for a serializable sweep summary.
///
/// Printed by `recipe-sweep` at the end of a sweep when `--message-format json` or `json-pretty`
/// is passed in.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SweepRunSummary {
    /// The root directory the recipes were discovered under.
    pub root: Utf8PathBuf,

    /// The configuration profile used for this sweep.
    pub profile: String,

    /// Wall-clock duration of the whole sweep, in seconds.
    pub duration_secs: f64,

    /// True if the sweep met its success criteria, i.e. its exit code is
    /// [`SweepExitCode::OK`](crate::SweepExitCode::OK).
    pub success: bool,

    /// Aggregate results for this sweep.
    pub totals: SweepTotalsSummary,

    /// One entry per recipe, in the order they were run.
    pub recipes: Vec<RecipeRunSummary>,
}

impl SweepRunSummary {
    /// Parse JSON output from `recipe-sweep --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }
}

/// Aggregate results for a sweep, depending on the kind of sweep that was run.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum SweepTotalsSummary {
    /// A test sweep. `total == passed + failed`.
    Tests {
        /// The number of recipes run.
        total: usize,

        /// The number of recipes whose output contained the success marker.
        passed: usize,

        /// The number of recipes that failed.
        failed: usize,
    },

    /// A coverage sweep.
    #[serde(rename_all = "kebab-case")]
    Coverage {
        /// The number of recipes run.
        recipes: usize,

        /// The number of recipes that contributed to the average.
        count: usize,

        /// The number of recipes that reported a coverage percentage.
        measured: usize,

        /// The number of recipes whose output had no coverage percentage.
        missing: usize,

        /// The number of recipes whose coverage command failed.
        failed: usize,

        /// The average coverage percentage, or `None` if no recipe contributed to it.
        average: Option<f64>,

        /// The minimum average required for the sweep to succeed.
        min_average: f64,
    },
}

/// The result of running one recipe.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecipeRunSummary {
    /// The chapter directory name.
    pub chapter: String,

    /// The recipe directory name.
    pub recipe: String,

    /// The absolute path to the recipe directory.
    pub path: Utf8PathBuf,

    /// The classification of this recipe's run.
    pub status: RecipeStatusSummary,

    /// How long the external command took, in seconds.
    pub duration_secs: f64,

    /// The exit code of the external command, if it exited normally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// The coverage percentage extracted from the output, for coverage sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,

    /// A short, human-readable description of why this recipe failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The classification of a single recipe run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RecipeStatusSummary {
    /// The captured output contained the success marker.
    Pass,

    /// The recipe failed: the marker was absent, the command failed, or it timed out.
    Fail,

    /// A coverage percentage was extracted.
    Covered,

    /// The coverage command succeeded but printed no percentage.
    NoData,
}
