// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for recipe-sweep.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound},
    reporter::OutputDisplay,
    summary::{CoverageContribution, CoveragePolicy},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};
use tracing::warn;

/// Overall configuration for recipe-sweep.
///
/// This is the root data structure for configuration. Most sweep-specific configuration is managed
/// through [profiles](SweepProfile), obtained through the [`profile`](Self::profile) method.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    root: Utf8PathBuf,
    inner: SweepConfigImpl,
}

impl SweepConfig {
    /// The default location of the config within the cookbook root: `.config/sweep.toml`.
    pub const CONFIG_PATH: &'static str = ".config/sweep.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/sweep.toml` in the
    /// cookbook root.
    ///
    /// If no config file is specified and the root doesn't have `.config/sweep.toml`, uses the
    /// default config options.
    pub fn from_sources(
        root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(root, config_file, |config_file, unknown| {
            let mut unknown_str = String::new();
            if unknown.len() == 1 {
                // Print this on the same line.
                unknown_str.push(' ');
                unknown_str.extend(unknown.iter().map(String::as_str));
            } else {
                for ignored_key in unknown {
                    unknown_str.push_str("\n  - ");
                    unknown_str.push_str(ignored_key);
                }
            }

            warn!("ignoring unknown configuration keys in config file {config_file}:{unknown_str}")
        })
    }

    // A custom unknown_callback can be passed in while testing.
    fn from_sources_impl(
        root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        mut unknown_callback: impl FnMut(&Utf8Path, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let root = root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            unknown_callback(&config_file, &unknown);
        }

        Ok(Self {
            root,
            inner: deserialized.into_config_impl(),
        })
    }

    /// Returns the default config.
    #[cfg(test)]
    pub(crate) fn default_config(root: impl Into<Utf8PathBuf>) -> Self {
        use itertools::Itertools;

        let (deserialized, unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");

        // The default config is embedded in the binary, so it must not contain unknown keys.
        if !unknown.is_empty() {
            panic!(
                "found unknown keys in default config: {}",
                unknown.iter().join(", ")
            );
        }

        Self {
            root: root.into(),
            inner: deserialized.into_config_impl(),
        }
    }

    /// Returns the cookbook root this config was read for.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the recipe discovery configuration.
    pub fn locate(&self) -> &LocateConfig {
        &self.inner.locate
    }

    /// Returns the scaffold configuration.
    pub fn scaffold(&self) -> &ScaffoldConfig {
        &self.inner.scaffold
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<SweepProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(self.inner.other_profiles.get(other).ok_or_else(|| {
                ProfileNotFound::new(other, self.inner.all_profile_names())
            })?),
        };

        Ok(SweepProfile {
            name: name.to_owned(),
            root: &self.root,
            default_profile: &self.inner.default_profile,
            custom_profile,
        })
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(SweepConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: SweepConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already reports the key, so drop it from the config error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// Recipe discovery configuration, from the `[locate]` table.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocateConfig {
    chapter_glob: String,
    recipe_glob: String,
}

impl LocateConfig {
    /// The glob chapter directory names must match.
    pub fn chapter_glob(&self) -> &str {
        &self.chapter_glob
    }

    /// The glob recipe directory names must match.
    pub fn recipe_glob(&self) -> &str {
        &self.recipe_glob
    }
}

/// Scaffold configuration, from the `[scaffold]` table.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScaffoldConfig {
    extension: String,
}

impl ScaffoldConfig {
    /// The extension used for a new recipe's source files, without the leading dot.
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

/// A configuration profile for recipe-sweep. Contains most configuration used by the sweep runner.
///
/// Returned by [`SweepConfig::profile`].
#[derive(Clone, Debug)]
pub struct SweepProfile<'cfg> {
    name: String,
    root: &'cfg Utf8Path,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl<'cfg> SweepProfile<'cfg> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cookbook root.
    pub fn root(&self) -> &'cfg Utf8Path {
        self.root
    }

    /// Returns the per-recipe timeout, or `None` if timeouts are disabled.
    pub fn timeout(&self) -> Option<Duration> {
        let timeout = self
            .custom_profile
            .and_then(|profile| profile.timeout)
            .unwrap_or(self.default_profile.timeout);
        (!timeout.is_zero()).then_some(timeout)
    }

    /// Returns when to display the captured output of failing recipes.
    pub fn failure_output(&self) -> OutputDisplay {
        self.custom_profile
            .and_then(|profile| profile.failure_output)
            .unwrap_or(self.default_profile.failure_output)
    }

    /// Returns the absolute directory raw recipe output is written to, if configured.
    pub fn report_dir(&self) -> Option<Utf8PathBuf> {
        self.custom_profile
            .and_then(|profile| profile.report_dir.as_deref())
            .or(self.default_profile.report_dir.as_deref())
            .map(|dir| self.root.join(dir))
    }

    /// Returns the command run by test sweeps.
    pub fn test_command(&self) -> &'cfg str {
        self.custom_profile
            .and_then(|profile| profile.test.command.as_deref())
            .unwrap_or(&self.default_profile.test.command)
    }

    /// Returns the literal text a passing recipe prints.
    pub fn success_marker(&self) -> &'cfg str {
        self.custom_profile
            .and_then(|profile| profile.test.success_marker.as_deref())
            .unwrap_or(&self.default_profile.test.success_marker)
    }

    /// Returns the command run by coverage sweeps.
    pub fn coverage_command(&self) -> &'cfg str {
        self.custom_profile
            .and_then(|profile| profile.coverage.command.as_deref())
            .unwrap_or(&self.default_profile.coverage.command)
    }

    /// Returns the regex coverage percentages are extracted with.
    pub fn coverage_pattern(&self) -> &'cfg str {
        self.custom_profile
            .and_then(|profile| profile.coverage.pattern.as_deref())
            .unwrap_or(&self.default_profile.coverage.pattern)
    }

    /// Returns the minimum average coverage percentage.
    pub fn min_average(&self) -> f64 {
        self.custom_profile
            .and_then(|profile| profile.coverage.min_average)
            .unwrap_or(self.default_profile.coverage.min_average)
    }

    /// Returns how missing and failed coverage measurements count towards the average.
    pub fn coverage_policy(&self) -> CoveragePolicy {
        let custom = self.custom_profile.map(|profile| &profile.coverage);
        CoveragePolicy {
            missing: custom
                .and_then(|coverage| coverage.missing)
                .unwrap_or(self.default_profile.coverage.missing),
            failed: custom
                .and_then(|coverage| coverage.failed)
                .unwrap_or(self.default_profile.coverage.failed),
        }
    }

    /// Returns the JUnit configuration for this profile, if a JUnit path is set.
    pub fn junit(&self) -> Option<SweepJunitConfig<'cfg>> {
        let custom = self.custom_profile.map(|profile| &profile.junit);
        let path = custom
            .and_then(|junit| junit.path.as_deref())
            .or(self.default_profile.junit.path.as_deref())?;
        let report_name = custom
            .and_then(|junit| junit.report_name.as_deref())
            .unwrap_or(&self.default_profile.junit.report_name);
        Some(SweepJunitConfig {
            path: self.root.join(path),
            report_name,
        })
    }
}

/// JUnit configuration for a profile.
#[derive(Clone, Debug)]
pub struct SweepJunitConfig<'cfg> {
    path: Utf8PathBuf,
    report_name: &'cfg str,
}

impl<'cfg> SweepJunitConfig<'cfg> {
    /// Returns the absolute path to the JUnit report.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the name of the JUnit report.
    pub fn report_name(&self) -> &'cfg str {
        self.report_name
    }
}

#[derive(Clone, Debug)]
struct SweepConfigImpl {
    locate: LocateConfig,
    scaffold: ScaffoldConfig,
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

impl SweepConfigImpl {
    fn all_profile_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(SweepConfig::DEFAULT_PROFILE)
            .chain(self.other_profiles.keys().map(String::as_str))
    }
}

// This is the form of `SweepConfig` that gets deserialized.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SweepConfigDeserialize {
    locate: LocateConfig,
    scaffold: ScaffoldConfig,
    #[serde(rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl SweepConfigDeserialize {
    fn into_config_impl(mut self) -> SweepConfigImpl {
        let p = self
            .profiles
            .remove(SweepConfig::DEFAULT_PROFILE)
            .expect("default profile should exist");
        SweepConfigImpl {
            locate: self.locate,
            scaffold: self.scaffold,
            default_profile: DefaultProfileImpl::new(p),
            other_profiles: self.profiles,
        }
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    timeout: Duration,
    failure_output: OutputDisplay,
    report_dir: Option<Utf8PathBuf>,
    test: DefaultTestImpl,
    coverage: DefaultCoverageImpl,
    junit: DefaultJunitImpl,
}

impl DefaultProfileImpl {
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            timeout: p.timeout.expect("timeout present in default profile"),
            failure_output: p
                .failure_output
                .expect("failure-output present in default profile"),
            report_dir: p.report_dir,
            test: DefaultTestImpl {
                command: p
                    .test
                    .command
                    .expect("test.command present in default profile"),
                success_marker: p
                    .test
                    .success_marker
                    .expect("test.success-marker present in default profile"),
            },
            coverage: DefaultCoverageImpl {
                command: p
                    .coverage
                    .command
                    .expect("coverage.command present in default profile"),
                pattern: p
                    .coverage
                    .pattern
                    .expect("coverage.pattern present in default profile"),
                min_average: p
                    .coverage
                    .min_average
                    .expect("coverage.min-average present in default profile"),
                missing: p
                    .coverage
                    .missing
                    .expect("coverage.missing present in default profile"),
                failed: p
                    .coverage
                    .failed
                    .expect("coverage.failed present in default profile"),
            },
            junit: DefaultJunitImpl {
                path: p.junit.path,
                report_name: p
                    .junit
                    .report_name
                    .expect("junit.report-name present in default profile"),
            },
        }
    }
}

#[derive(Clone, Debug)]
struct DefaultTestImpl {
    command: String,
    success_marker: String,
}

#[derive(Clone, Debug)]
struct DefaultCoverageImpl {
    command: String,
    pattern: String,
    min_average: f64,
    missing: CoverageContribution,
    failed: CoverageContribution,
}

#[derive(Clone, Debug)]
struct DefaultJunitImpl {
    path: Option<Utf8PathBuf>,
    report_name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default, with = "humantime_serde::option")]
    timeout: Option<Duration>,
    #[serde(default)]
    failure_output: Option<OutputDisplay>,
    #[serde(default)]
    report_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    test: TestImpl,
    #[serde(default)]
    coverage: CoverageImpl,
    #[serde(default)]
    junit: JunitImpl,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TestImpl {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    success_marker: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CoverageImpl {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    min_average: Option<f64>,
    #[serde(default)]
    missing: Option<CoverageContribution>,
    #[serde(default)]
    failed: Option<CoverageContribution>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct JunitImpl {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
    #[serde(default)]
    report_name: Option<String>,
}
