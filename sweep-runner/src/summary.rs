// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate statistics for a sweep.
//!
//! Every recipe result is folded into exactly one of [`TestSweepStats`] or [`CoverageSweepStats`],
//! depending on the sweep mode. Both reductions are associative and commutative, so partial
//! statistics can be combined with `merge`.

use crate::classifier::{CoverageOutcome, Outcome};
use serde::Deserialize;
use std::fmt;

/// Statistics for a test sweep.
///
/// `total == passed + failed` holds at all times: the only way to change the counts is
/// [`record`](Self::record), which increments `total` and exactly one of the others.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TestSweepStats {
    total: usize,
    passed: usize,
    failed: usize,
}

impl TestSweepStats {
    /// Records the result of a single recipe.
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Adds the counts in `other` to this one.
    pub fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
    }

    /// The number of recipes run.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The number of recipes that passed.
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// The number of recipes that failed.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns true if no recipe failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// How a recipe without a usable coverage percentage counts towards the average.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageContribution {
    /// Counted as 0%.
    Zero,

    /// Left out of the average.
    Skip,
}

impl fmt::Display for CoverageContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// The contribution policy for coverage outcomes that didn't produce a measurement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CoveragePolicy {
    /// The contribution of a recipe whose command succeeded without printing a percentage.
    pub missing: CoverageContribution,

    /// The contribution of a recipe whose command failed, timed out or couldn't be started.
    pub failed: CoverageContribution,
}

/// Statistics for a coverage sweep.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CoverageSweepStats {
    recipes: usize,
    measured: usize,
    missing: usize,
    failed: usize,
    count: usize,
    skipped: usize,
    sum: f64,
}

impl CoverageSweepStats {
    /// Records the coverage outcome of a single recipe under the given policy.
    pub fn record(&mut self, outcome: &CoverageOutcome, policy: &CoveragePolicy) {
        self.recipes += 1;
        let contribution = match outcome {
            CoverageOutcome::Measured(percent) => {
                self.measured += 1;
                Some(*percent)
            }
            CoverageOutcome::Missing => {
                self.missing += 1;
                Self::contribution(policy.missing)
            }
            CoverageOutcome::Failed => {
                self.failed += 1;
                Self::contribution(policy.failed)
            }
        };
        match contribution {
            Some(percent) => {
                self.count += 1;
                self.sum += percent;
            }
            None => self.skipped += 1,
        }
    }

    /// Adds the counts and sums in `other` to this one.
    pub fn merge(&mut self, other: &Self) {
        self.recipes += other.recipes;
        self.measured += other.measured;
        self.missing += other.missing;
        self.failed += other.failed;
        self.count += other.count;
        self.skipped += other.skipped;
        self.sum += other.sum;
    }

    /// Returns the average coverage over the recipes that contributed to it.
    pub fn average(&self) -> CoverageAverage {
        if self.count == 0 {
            CoverageAverage::NoData
        } else {
            CoverageAverage::Average(self.sum / self.count as f64)
        }
    }

    /// Returns true if the average meets `min_average`.
    ///
    /// A sweep with no data meets any minimum only if no recipes were run at all.
    pub fn meets(&self, min_average: f64) -> bool {
        match self.average() {
            CoverageAverage::NoData => self.recipes == 0,
            CoverageAverage::Average(average) => average >= min_average,
        }
    }

    /// The number of recipes run.
    pub fn recipes(&self) -> usize {
        self.recipes
    }

    /// The number of recipes with a measured percentage.
    pub fn measured(&self) -> usize {
        self.measured
    }

    /// The number of recipes whose output had no percentage.
    pub fn missing(&self) -> usize {
        self.missing
    }

    /// The number of recipes whose coverage command failed.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// The number of recipes that contributed to the average.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The number of recipes left out of the average.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The sum of all contributing percentages.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    fn contribution(contribution: CoverageContribution) -> Option<f64> {
        match contribution {
            CoverageContribution::Zero => Some(0.0),
            CoverageContribution::Skip => None,
        }
    }
}

/// The average of a coverage sweep.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CoverageAverage {
    /// No recipe contributed to the average.
    NoData,

    /// The mean percentage across contributing recipes.
    Average(f64),
}

impl CoverageAverage {
    /// Returns the average as an option.
    pub fn as_option(self) -> Option<f64> {
        match self {
            Self::NoData => None,
            Self::Average(average) => Some(average),
        }
    }
}

/// The aggregate result of a sweep.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SweepSummary {
    /// A test sweep.
    Tests(TestSweepStats),

    /// A coverage sweep.
    Coverage {
        /// Coverage statistics.
        stats: CoverageSweepStats,

        /// The minimum average required for success.
        min_average: f64,

        /// The contribution policy the statistics were recorded under.
        policy: CoveragePolicy,
    },
}

impl SweepSummary {
    /// Records a classified outcome.
    ///
    /// The outcome's mode must match the summary's: a sweep classifies every recipe the same way.
    pub fn record(&mut self, outcome: &Outcome) {
        match (self, outcome) {
            (Self::Tests(stats), Outcome::Test { passed }) => stats.record(*passed),
            (Self::Coverage { stats, policy, .. }, Outcome::Coverage(outcome)) => {
                stats.record(outcome, policy)
            }
            (summary, outcome) => {
                unreachable!("outcome {outcome:?} recorded into mismatched summary {summary:?}")
            }
        }
    }

    /// Returns true if the sweep met its success criteria.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Tests(stats) => stats.is_success(),
            Self::Coverage {
                stats, min_average, ..
            } => stats.meets(*min_average),
        }
    }
}
