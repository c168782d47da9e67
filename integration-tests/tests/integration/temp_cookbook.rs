// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use std::time::Duration;

/// A cookbook in a temporary directory, configured to run `fake-recipe-tool`.
pub struct TempCookbook {
    dir: Utf8TempDir,
}

impl TempCookbook {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Creates a cookbook whose config is the fake tool setup followed by `extra_config`.
    pub fn with_config(extra_config: &str) -> Self {
        let dir = camino_tempfile::tempdir().expect("tempdir created");
        let tool = shell_words::quote(env!("CARGO_BIN_EXE_fake-recipe-tool")).into_owned();
        let test_command = toml_string(&format!("{tool} test"));
        let coverage_command = toml_string(&format!("{tool} coverage"));

        let config = format!(
            "[profile.default.test]\n\
             command = {test_command}\n\
             success-marker = \"All tests passed\"\n\
             \n\
             [profile.default.coverage]\n\
             command = {coverage_command}\n\
             \n\
             {extra_config}"
        );
        let config_dir = dir.path().join(".config");
        fs_err::create_dir_all(&config_dir).expect("config dir created");
        fs_err::write(config_dir.join("sweep.toml"), config).expect("config written");

        Self { dir }
    }

    pub fn root(&self) -> &Utf8Path {
        self.dir.path()
    }

    /// Creates the `chapter/recipe` directory.
    pub fn recipe(&self, name: &str) -> FakeRecipe {
        let dir = self.dir.path().join(name);
        fs_err::create_dir_all(&dir).expect("recipe dir created");
        FakeRecipe { dir }
    }
}

pub struct FakeRecipe {
    dir: Utf8PathBuf,
}

impl FakeRecipe {
    pub fn output(&self, mode: &str, output: &str) -> &Self {
        self.write(&format!("{mode}.out"), output)
    }

    pub fn exit_code(&self, mode: &str, code: i32) -> &Self {
        self.write(&format!("{mode}.exit"), &code.to_string())
    }

    pub fn sleep(&self, mode: &str, duration: Duration) -> &Self {
        self.write(&format!("{mode}.sleep-ms"), &duration.as_millis().to_string())
    }

    fn write(&self, file_name: &str, contents: &str) -> &Self {
        fs_err::write(self.dir.join(file_name), contents).expect("script file written");
        self
    }
}

/// Renders `s` as a TOML basic string. JSON string syntax is a subset of it.
fn toml_string(s: &str) -> String {
    serde_json::to_string(s).expect("strings serialize")
}
