// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `recipe-sweep` failures.
///
/// A sweep's exit code is the signal CI gates on. This structure documents the exit codes that may
/// occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum SweepExitCode {}

impl SweepExitCode {
    /// No errors occurred and the sweep met its success criteria.
    ///
    /// This includes sweeps over zero recipes.
    pub const OK: i32 = 0;

    /// One or more recipes failed during a test sweep.
    pub const RECIPES_FAILED: i32 = 1;

    /// The average coverage computed by a coverage sweep is below the configured minimum.
    pub const COVERAGE_BELOW_THRESHOLD: i32 = 1;

    /// The external tool could not be located, so no recipe was run.
    pub const TOOL_MISSING: i32 = 3;

    /// `recipe-sweep scaffold` could not create the recipe skeleton.
    pub const SCAFFOLD_FAILED: i32 = 4;

    /// A user issue happened while setting up a sweep: bad configuration, an unknown profile, an
    /// unreadable root directory, and so on.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout, stderr or a report file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
