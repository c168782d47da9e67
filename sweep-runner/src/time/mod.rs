// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod stopwatch;

pub(crate) use stopwatch::*;
