// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Documented exit codes and machine-readable summaries for `recipe-sweep`.
//!
//! `recipe-sweep sweep-tests --message-format json` and `recipe-sweep sweep-coverage
//! --message-format json` print a [`SweepRunSummary`] to standard output once the sweep finishes.
//! This crate contains the types for that output, so that CI tooling can consume it without
//! depending on the runner.

mod exit_codes;
mod summary;

pub use exit_codes::*;
pub use summary::*;
