// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw output logs and JUnit reports.

use super::SweepEvent;
use crate::{
    classifier::FailureReason,
    config::SweepJunitConfig,
    errors::WriteEventError,
    locator::RecipeRef,
    runner::{InvocationResult, SweepMode},
};
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::{collections::BTreeMap, fs::File};
use tracing::debug;

#[derive(Clone, Debug)]
pub(crate) struct EventAggregator<'cfg> {
    report_dir: Option<Utf8PathBuf>,
    junit: Option<MetadataJunit<'cfg>>,
}

impl<'cfg> EventAggregator<'cfg> {
    pub(crate) fn new(
        report_dir: Option<Utf8PathBuf>,
        junit: Option<SweepJunitConfig<'cfg>>,
    ) -> Self {
        Self {
            report_dir,
            junit: junit.map(MetadataJunit::new),
        }
    }

    pub(crate) fn write_event(&mut self, event: SweepEvent<'_>) -> Result<(), WriteEventError> {
        if let SweepEvent::SweepStarted {
            mode: SweepMode::Coverage,
            ..
        } = event
        {
            // JUnit describes pass/fail runs only.
            if self.junit.take().is_some() {
                debug!("JUnit output is not produced for coverage sweeps");
            }
        }

        if let (Some(report_dir), SweepEvent::RecipeFinished { result, .. }) =
            (&self.report_dir, event)
        {
            write_output_log(report_dir, result)?;
        }
        if let Some(junit) = &mut self.junit {
            junit.write_event(event)?;
        }
        Ok(())
    }
}

fn write_output_log(report_dir: &Utf8Path, result: &InvocationResult) -> Result<(), WriteEventError> {
    let chapter_dir = report_dir.join(result.recipe.chapter());
    std::fs::create_dir_all(&chapter_dir).map_err(|error| WriteEventError::Fs {
        file: chapter_dir.clone(),
        error,
    })?;

    let log_path = chapter_dir.join(format!("{}.log", result.recipe.recipe()));
    std::fs::write(&log_path, &result.invocation.output).map_err(|error| WriteEventError::Fs {
        file: log_path,
        error,
    })
}

#[derive(Clone, Debug)]
struct MetadataJunit<'cfg> {
    config: SweepJunitConfig<'cfg>,
    test_suites: DebugIgnore<BTreeMap<String, TestSuite>>,
}

impl<'cfg> MetadataJunit<'cfg> {
    fn new(config: SweepJunitConfig<'cfg>) -> Self {
        Self {
            config,
            test_suites: DebugIgnore(BTreeMap::new()),
        }
    }

    fn write_event(&mut self, event: SweepEvent<'_>) -> Result<(), WriteEventError> {
        match event {
            SweepEvent::SweepStarted { .. } => {}
            SweepEvent::RecipeFinished { result, .. } => {
                let testcase_status = match &result.failure_reason {
                    None => TestCaseStatus::success(),
                    Some(reason) => {
                        let kind = match reason {
                            FailureReason::SpawnFailed { .. } => NonSuccessKind::Error,
                            FailureReason::MarkerAbsent
                            | FailureReason::NonZeroExit { .. }
                            | FailureReason::TimedOut { .. } => NonSuccessKind::Failure,
                        };
                        let mut status = TestCaseStatus::non_success(kind);
                        status
                            .set_message(reason.to_string())
                            .set_type(reason.kind_str());
                        status
                    }
                };
                let mut testcase = TestCase::new(result.recipe.recipe(), testcase_status);
                testcase
                    .set_classname(result.recipe.chapter())
                    .set_timestamp(result.invocation.start_time)
                    .set_time(result.invocation.time_taken);
                if !result.is_success() {
                    testcase.set_system_out(strip_ansi_escapes::strip_str(
                        &result.invocation.output,
                    ));
                }

                self.testsuite_for(&result.recipe).add_test_case(testcase);
            }
            SweepEvent::SweepFinished {
                start_time,
                elapsed,
                ..
            } => {
                // Write out the report to the given file.
                let mut report = Report::new(self.config.report_name());
                report
                    .set_timestamp(start_time)
                    .set_time(elapsed)
                    .add_test_suites(std::mem::take(&mut *self.test_suites).into_values());

                let junit_path = self.config.path();
                if let Some(junit_dir) = junit_path.parent() {
                    std::fs::create_dir_all(junit_dir).map_err(|error| WriteEventError::Fs {
                        file: junit_dir.to_path_buf(),
                        error,
                    })?;
                }

                let f = File::create(junit_path).map_err(|error| WriteEventError::Fs {
                    file: junit_path.to_path_buf(),
                    error,
                })?;
                report
                    .serialize(f)
                    .map_err(|error| WriteEventError::Junit {
                        file: junit_path.to_path_buf(),
                        error: error.into(),
                    })?;
            }
        }

        Ok(())
    }

    fn testsuite_for(&mut self, recipe: &RecipeRef) -> &mut TestSuite {
        self.test_suites
            .entry(recipe.chapter().to_owned())
            .or_insert_with(|| TestSuite::new(recipe.chapter()))
    }
}
