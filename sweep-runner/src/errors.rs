// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by recipe-sweep.

use crate::reporter::OutputDisplay;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse sweep config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known to recipe-sweep.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }

    /// Returns the name of the profile that wasn't found.
    pub fn profile(&self) -> &str {
        &self.profile
    }
}

/// Error returned while parsing an [`OutputDisplay`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for failure output: {input}\n(known values: {})",
    OutputDisplay::variants().join(", "),
)]
pub struct OutputDisplayParseError {
    input: String,
}

impl OutputDisplayParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while parsing a configured command string.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandParseError {
    /// The command isn't valid shell-words syntax.
    #[error("command `{command}` could not be split into words")]
    InvalidSyntax {
        /// The command that failed to parse.
        command: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// The command was empty.
    #[error("command is empty")]
    Empty,
}

/// The external tool could not be found before the sweep started.
#[derive(Debug, Error)]
#[error("tool `{program}` not found (required by command `{command}`)")]
pub struct ToolResolveError {
    program: String,
    command: String,
    #[source]
    error: which::Error,
}

impl ToolResolveError {
    pub(crate) fn new(
        program: impl Into<String>,
        command: impl Into<String>,
        error: which::Error,
    ) -> Self {
        Self {
            program: program.into(),
            command: command.into(),
            error,
        }
    }

    /// Returns the program that could not be found.
    pub fn program(&self) -> &str {
        &self.program
    }
}

/// A configured glob, marker or coverage pattern was invalid.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PatternError {
    /// A chapter or recipe glob was invalid.
    #[error("invalid glob `{glob}`")]
    Glob {
        /// The glob that failed to compile.
        glob: String,

        /// The underlying error.
        #[source]
        error: globset::Error,
    },

    /// The coverage pattern was not a valid regular expression.
    #[error("invalid coverage pattern `{pattern}`")]
    CoverageRegex {
        /// The pattern that failed to compile.
        pattern: String,

        /// The underlying error.
        #[source]
        error: regex::Error,
    },

    /// The success marker could not be compiled into a searcher.
    #[error("invalid success marker `{marker}`")]
    Marker {
        /// The marker that failed to compile.
        marker: String,

        /// The underlying error.
        #[source]
        error: aho_corasick::BuildError,
    },

    /// The success marker was empty, which would match every output.
    #[error("success marker is empty")]
    EmptyMarker,
}

/// An error that occurred while discovering recipes.
#[derive(Debug, Error)]
#[error("failed to read recipe directory `{dir}`")]
pub struct LocateError {
    dir: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl LocateError {
    pub(crate) fn new(dir: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            dir: dir.into(),
            error,
        }
    }

    /// Returns the directory that could not be read.
    pub fn dir(&self) -> &Utf8PathBuf {
        &self.dir
    }
}

/// An error that occurred while setting up a sweep, before any recipe ran.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SweepSetupError {
    /// The configured command could not be parsed.
    #[error("failed to parse the {mode} command")]
    Command {
        /// The sweep mode whose command failed to parse.
        mode: &'static str,

        /// The underlying error.
        #[source]
        error: CommandParseError,
    },

    /// The external tool is not installed.
    #[error(transparent)]
    ToolMissing(ToolResolveError),

    /// A configured pattern was invalid.
    #[error(transparent)]
    Pattern(PatternError),
}

/// An error that occurred while creating a recipe skeleton.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScaffoldError {
    /// The chapter name is not a single, visible directory name.
    #[error("invalid chapter name `{chapter}`: must be a single non-hidden directory name")]
    InvalidChapter {
        /// The chapter name that was rejected.
        chapter: String,
    },

    /// The title produced an empty directory name.
    #[error("title `{title}` has no ASCII letters or digits to build a directory name from")]
    EmptySlug {
        /// The title that was rejected.
        title: String,
    },

    /// The recipe directory already exists.
    #[error("recipe directory `{path}` already exists")]
    AlreadyExists {
        /// The recipe directory.
        path: Utf8PathBuf,
    },

    /// An error occurred while creating a directory or file.
    #[error("failed to create `{path}`")]
    Create {
        /// The path that could not be created.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurs while writing an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: Box<dyn error::Error + Send + Sync>,
    },
}
