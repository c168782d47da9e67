// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `recipe-sweep`.
//!
//! A sweep has four stages, each in its own module:
//!
//! 1. [`locator`] finds `chapter/recipe` directories under a cookbook root.
//! 2. [`recipe_command`] runs the configured tool in each recipe directory and captures its
//!    combined output.
//! 3. [`classifier`] turns captured output into a pass/fail verdict or a coverage percentage.
//! 4. [`summary`] folds the outcomes into aggregate statistics.
//!
//! [`runner::SweepRunner`] drives the stages in order and hands each result to a
//! [`reporter::SweepReporter`] as it arrives.

pub mod classifier;
pub mod config;
pub mod errors;
mod helpers;
pub mod locator;
pub mod recipe_command;
pub mod reporter;
pub mod runner;
pub mod scaffold;
pub mod summary;
mod time;
