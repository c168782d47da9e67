// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipe discovery.
//!
//! A cookbook root contains chapter directories, and each chapter contains recipe directories.
//! [`RecipeLocator`] enumerates the recipes whose `chapter/recipe` names match the configured
//! globs.

use crate::{
    config::LocateConfig,
    errors::{LocateError, PatternError},
};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobMatcher};
use std::fmt;
use tracing::debug;

/// A reference to a single recipe directory.
///
/// Ordered by chapter, then recipe name.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecipeRef {
    chapter: String,
    recipe: String,
    path: Utf8PathBuf,
}

impl RecipeRef {
    /// Creates a new recipe reference.
    pub fn new(
        chapter: impl Into<String>,
        recipe: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            chapter: chapter.into(),
            recipe: recipe.into(),
            path: path.into(),
        }
    }

    /// The chapter directory name.
    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    /// The recipe directory name.
    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    /// The path to the recipe directory.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl fmt::Display for RecipeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chapter, self.recipe)
    }
}

/// Finds recipe directories under a cookbook root.
#[derive(Clone, Debug)]
pub struct RecipeLocator {
    chapter_glob: GlobMatcher,
    recipe_glob: GlobMatcher,
}

impl RecipeLocator {
    /// Creates a new locator matching chapter and recipe directory names against these globs.
    pub fn new(chapter_glob: &str, recipe_glob: &str) -> Result<Self, PatternError> {
        Ok(Self {
            chapter_glob: compile_glob(chapter_glob)?,
            recipe_glob: compile_glob(recipe_glob)?,
        })
    }

    /// Creates a new locator from the `[locate]` configuration.
    pub fn from_config(config: &LocateConfig) -> Result<Self, PatternError> {
        Self::new(config.chapter_glob(), config.recipe_glob())
    }

    /// Returns every matching recipe under `root`, in `chapter/recipe` order.
    ///
    /// Finding no recipes is not an error. A root that can't be read is.
    pub fn locate(&self, root: &Utf8Path) -> Result<Vec<RecipeRef>, LocateError> {
        let mut recipes = Vec::new();
        for chapter in matching_dirs(root, &self.chapter_glob)? {
            let chapter_dir = root.join(&chapter);
            for recipe in matching_dirs(&chapter_dir, &self.recipe_glob)? {
                let path = chapter_dir.join(&recipe);
                recipes.push(RecipeRef::new(chapter.clone(), recipe, path));
            }
        }

        debug!("found {} recipes under {root}", recipes.len());
        Ok(recipes)
    }
}

fn compile_glob(glob: &str) -> Result<GlobMatcher, PatternError> {
    let matcher = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|error| PatternError::Glob {
            glob: glob.to_owned(),
            error,
        })?
        .compile_matcher();
    Ok(matcher)
}

/// Returns the sorted names of the visible subdirectories of `dir` that match `glob`.
fn matching_dirs(dir: &Utf8Path, glob: &GlobMatcher) -> Result<Vec<String>, LocateError> {
    let entries = dir
        .as_std_path()
        .read_dir()
        .map_err(|error| LocateError::new(dir, error))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| LocateError::new(dir, error))?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                debug!("skipping non-UTF-8 entry {name:?} in {dir}");
                continue;
            }
        };
        if name.starts_with('.') || !glob.is_match(&name) {
            continue;
        }
        // Follow symlinks: a symlinked recipe directory is still a recipe.
        if dir.join(&name).is_dir() {
            names.push(name);
        }
    }

    names.sort_unstable();
    Ok(names)
}
