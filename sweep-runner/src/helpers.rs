// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{locator::RecipeRef, reporter::Styles};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Utilities for pluralizing various words based on count.
pub(crate) mod plural {
    /// Returns "recipe" if `count` is 1, otherwise "recipes".
    pub(crate) fn recipes_str(count: usize) -> &'static str {
        if count == 1 { "recipe" } else { "recipes" }
    }
}

/// Writes the name of a recipe as `chapter/recipe`, with the chapter de-emphasized.
pub(crate) fn write_recipe_name(
    recipe: &RecipeRef,
    styles: &Styles,
    mut writer: impl Write,
) -> io::Result<()> {
    write!(
        writer,
        "{}{}{}",
        recipe.chapter().style(styles.chapter),
        "/".style(styles.chapter),
        recipe.recipe().style(styles.recipe),
    )
}
