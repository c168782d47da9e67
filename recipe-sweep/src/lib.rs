// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sweeps a cookbook of recipes, running each recipe's tests or measuring its coverage.
//!
//! The library half of this crate exists so that the integration tests can drive the CLI. For
//! machine-readable output, depend on `sweep-metadata` instead.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
