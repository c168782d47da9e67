// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifying captured recipe output.
//!
//! Test sweeps look for a literal success marker. Coverage sweeps extract the first percentage.
//! In both cases ANSI escapes are stripped first, since tools often colorize their output even
//! when it's not going to a terminal.

use crate::{
    errors::PatternError,
    recipe_command::{Invocation, InvocationExit},
};
use aho_corasick::AhoCorasick;
use regex::Regex;
use std::{borrow::Cow, fmt, time::Duration};

/// The text a passing recipe prints.
#[derive(Clone, Debug)]
pub struct SuccessMarker {
    marker: String,
    searcher: AhoCorasick,
}

impl SuccessMarker {
    /// Creates a new marker. An empty marker would match everything, so it's rejected.
    pub fn new(marker: &str) -> Result<Self, PatternError> {
        if marker.is_empty() {
            return Err(PatternError::EmptyMarker);
        }
        let searcher = AhoCorasick::new([marker]).map_err(|error| PatternError::Marker {
            marker: marker.to_owned(),
            error,
        })?;
        Ok(Self {
            marker: marker.to_owned(),
            searcher,
        })
    }

    /// The literal marker text.
    pub fn as_str(&self) -> &str {
        &self.marker
    }

    /// Returns true if the output contains the marker.
    pub fn is_match(&self, output: &str) -> bool {
        self.searcher.is_match(strip_ansi(output).as_ref())
    }
}

/// Extracts a coverage percentage from captured output.
#[derive(Clone, Debug)]
pub struct CoverageExtractor {
    pattern: Regex,
}

impl CoverageExtractor {
    /// The pattern used if none is configured: the first number followed by `%`.
    pub const DEFAULT_PATTERN: &'static str = r"([0-9]+(?:\.[0-9]*)?)%";

    /// Creates a new extractor from a regex.
    ///
    /// If the regex has a capture group, group 1 is the percentage; otherwise the whole match is.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let pattern = Regex::new(pattern).map_err(|error| PatternError::CoverageRegex {
            pattern: pattern.to_owned(),
            error,
        })?;
        Ok(Self { pattern })
    }

    /// Returns the percentage in the first match, if there is one and it parses.
    ///
    /// Only the first match is considered, even if later ones would parse.
    pub fn extract(&self, output: &str) -> Option<f64> {
        let stripped = strip_ansi(output);
        let captures = self.pattern.captures(&stripped)?;
        let percent = captures.get(1).or_else(|| captures.get(0))?;
        percent
            .as_str()
            .trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .filter(|percent| percent.is_finite())
    }
}

/// Decides the outcome of a recipe from its invocation.
#[derive(Clone, Debug)]
pub enum Classifier {
    /// Test sweeps: a recipe passes iff its output contains the marker.
    Test(SuccessMarker),

    /// Coverage sweeps: a recipe's coverage is the first percentage in its output.
    Coverage(CoverageExtractor),
}

impl Classifier {
    /// Classifies an invocation.
    pub fn classify(&self, invocation: &Invocation) -> Classification {
        match self {
            Self::Test(marker) => classify_test(marker, invocation),
            Self::Coverage(extractor) => classify_coverage(extractor, invocation),
        }
    }
}

fn classify_test(marker: &SuccessMarker, invocation: &Invocation) -> Classification {
    let failure_reason = match &invocation.exit {
        // A timed-out recipe fails even if it printed the marker before it was killed.
        InvocationExit::TimedOut(after) => Some(FailureReason::TimedOut { after: *after }),
        InvocationExit::SpawnFailed(message) => Some(FailureReason::SpawnFailed {
            message: message.clone(),
        }),
        // The exit code doesn't decide the outcome. It only explains a missing marker.
        InvocationExit::Exited(_) if marker.is_match(&invocation.output) => None,
        InvocationExit::Exited(Some(0)) => Some(FailureReason::MarkerAbsent),
        InvocationExit::Exited(code) => Some(FailureReason::NonZeroExit { code: *code }),
    };

    Classification {
        outcome: Outcome::Test {
            passed: failure_reason.is_none(),
        },
        failure_reason,
    }
}

fn classify_coverage(extractor: &CoverageExtractor, invocation: &Invocation) -> Classification {
    let failure_reason = match &invocation.exit {
        InvocationExit::TimedOut(after) => Some(FailureReason::TimedOut { after: *after }),
        InvocationExit::SpawnFailed(message) => Some(FailureReason::SpawnFailed {
            message: message.clone(),
        }),
        InvocationExit::Exited(Some(0)) => None,
        InvocationExit::Exited(code) => Some(FailureReason::NonZeroExit { code: *code }),
    };

    let outcome = match failure_reason {
        // Output from a failed run is never parsed.
        Some(_) => CoverageOutcome::Failed,
        None => match extractor.extract(&invocation.output) {
            Some(percent) => CoverageOutcome::Measured(percent),
            None => CoverageOutcome::Missing,
        },
    };

    Classification {
        outcome: Outcome::Coverage(outcome),
        failure_reason,
    }
}

/// The result of classifying an invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// The outcome.
    pub outcome: Outcome,

    /// Why the recipe failed, if it did.
    pub failure_reason: Option<FailureReason>,
}

/// The classified outcome of a recipe.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A test sweep outcome.
    Test {
        /// True if the output contained the success marker.
        passed: bool,
    },

    /// A coverage sweep outcome.
    Coverage(CoverageOutcome),
}

impl Outcome {
    /// Returns true if this is a pass, or a measured coverage percentage.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Test { passed } => *passed,
            Self::Coverage(outcome) => matches!(outcome, CoverageOutcome::Measured(_)),
        }
    }
}

/// The coverage outcome of a recipe.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CoverageOutcome {
    /// A percentage was found in the output.
    Measured(f64),

    /// The command succeeded but its output contained no percentage.
    Missing,

    /// The command exited non-zero, timed out or couldn't be started.
    Failed,
}

/// Why a recipe failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureReason {
    /// The command exited with code 0, but the output didn't contain the success marker.
    MarkerAbsent,

    /// The command exited with a non-zero code, or was terminated by a signal (`None`).
    NonZeroExit {
        /// The exit code.
        code: Option<i32>,
    },

    /// The command was killed after the timeout.
    TimedOut {
        /// The timeout.
        after: Duration,
    },

    /// The command couldn't be started in the recipe directory.
    SpawnFailed {
        /// The error message.
        message: String,
    },
}

impl FailureReason {
    /// A short, stable string describing the kind of failure.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::MarkerAbsent => "marker absent",
            Self::NonZeroExit { .. } => "non-zero exit",
            Self::TimedOut { .. } => "timeout",
            Self::SpawnFailed { .. } => "spawn failure",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkerAbsent => write!(f, "success marker not found in output"),
            Self::NonZeroExit { code: Some(code) } => write!(f, "exited with code {code}"),
            Self::NonZeroExit { code: None } => write!(f, "terminated by signal"),
            Self::TimedOut { after } => {
                write!(f, "timed out after {}", humantime::format_duration(*after))
            }
            Self::SpawnFailed { message } => write!(f, "failed to start: {message}"),
        }
    }
}

fn strip_ansi(output: &str) -> Cow<'_, str> {
    // Most tool output has no escapes at all.
    if output.contains('\x1b') {
        Cow::Owned(strip_ansi_escapes::strip_str(output))
    } else {
        Cow::Borrowed(output)
    }
}
