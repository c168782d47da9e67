// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A duplicate of recipe-sweep's main.rs, built as part of this package so that tests can find it
//! through `CARGO_BIN_EXE_recipe-sweep-dup`.

use clap::Parser;
use color_eyre::Result;
use recipe_sweep::{OutputWriter, RecipeSweepApp};

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    let opts = RecipeSweepApp::parse();
    let output = opts.init_output();

    match opts.exec(output, &mut OutputWriter::default()) {
        Ok(()) => Ok(()),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
