// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Creating new recipe skeletons.

use crate::{config::ScaffoldConfig, errors::ScaffoldError, locator::RecipeRef};
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use tracing::{debug, warn};

/// Creates recipe directories under a cookbook root.
#[derive(Clone, Debug)]
pub struct Scaffolder {
    root: Utf8PathBuf,
    extension: String,
}

impl Scaffolder {
    /// Creates a new scaffolder writing source files with the given extension.
    pub fn new(root: impl Into<Utf8PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Creates a new scaffolder from the `[scaffold]` configuration.
    pub fn from_config(root: impl Into<Utf8PathBuf>, config: &ScaffoldConfig) -> Self {
        Self::new(root, config.extension())
    }

    /// Creates `<root>/<chapter>/<slug(title)>/` and its files, returning the new recipe.
    ///
    /// The chapter directory is created if it doesn't exist. The recipe directory must not.
    pub fn create(&self, chapter: &str, title: &str) -> Result<RecipeRef, ScaffoldError> {
        if !is_valid_chapter(chapter) {
            return Err(ScaffoldError::InvalidChapter {
                chapter: chapter.to_owned(),
            });
        }
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(ScaffoldError::EmptySlug {
                title: title.to_owned(),
            });
        }

        let chapter_dir = self.root.join(chapter);
        std::fs::create_dir_all(&chapter_dir).map_err(|error| ScaffoldError::Create {
            path: chapter_dir.clone(),
            error,
        })?;

        let recipe_dir = chapter_dir.join(&slug);
        match std::fs::create_dir(&recipe_dir) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ScaffoldError::AlreadyExists { path: recipe_dir });
            }
            Err(error) => {
                return Err(ScaffoldError::Create {
                    path: recipe_dir,
                    error,
                });
            }
        }

        if let Err(error) = self.write_files(&recipe_dir, title, &slug) {
            // A partial recipe would make the next attempt fail with AlreadyExists.
            if let Err(remove_error) = std::fs::remove_dir_all(&recipe_dir) {
                warn!("failed to remove partially created recipe {recipe_dir}: {remove_error}");
            }
            return Err(error);
        }

        debug!("scaffolded recipe {chapter}/{slug} at {recipe_dir}");
        Ok(RecipeRef::new(chapter, slug, recipe_dir))
    }

    fn write_files(
        &self,
        recipe_dir: &Utf8Path,
        title: &str,
        slug: &str,
    ) -> Result<(), ScaffoldError> {
        let ext = &self.extension;
        write_file(&recipe_dir.join("README.md"), &format!("# {title}\n"))?;
        write_file(
            &recipe_dir.join(format!("example.{ext}")),
            &format!("// {title}\n\nfun main() {{\n    println(\"{slug}\")\n}}\n"),
        )?;
        write_file(
            &recipe_dir.join(format!("test_example.{ext}")),
            &format!("// Tests for {title}\n\n#[test]\nfun test_example() {{\n    assert(true)\n}}\n"),
        )
    }
}

/// Turns a title into a directory name.
///
/// ASCII letters and digits are lowercased and kept, every other run of characters becomes a
/// single `-`, and leading and trailing dashes are removed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn is_valid_chapter(chapter: &str) -> bool {
    !chapter.is_empty()
        && !chapter.starts_with('.')
        && !chapter.contains(['/', '\\'])
        && Utf8Path::new(chapter).components().count() == 1
}

fn write_file(path: &Utf8Path, contents: &str) -> Result<(), ScaffoldError> {
    std::fs::write(path, contents).map_err(|error| ScaffoldError::Create {
        path: path.to_owned(),
        error,
    })
}
