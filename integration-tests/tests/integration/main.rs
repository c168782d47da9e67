// Copyright (c) The recipe-sweep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the recipe-sweep CLI.
//!
//! These run the `recipe-sweep-dup` binary, which is identical to `recipe-sweep` but built as part
//! of this package, against temporary cookbooks whose recipes are run by `fake-recipe-tool`.

use indoc::indoc;
use pretty_assertions::assert_eq;
use std::time::Duration;
use sweep_metadata::{RecipeStatusSummary, SweepExitCode, SweepTotalsSummary};

mod sweep_cli;
mod temp_cookbook;

use sweep_cli::SweepCli;
use temp_cookbook::TempCookbook;

fn sweep(cookbook: &TempCookbook, args: &[&str]) -> SweepCli {
    let mut cli = SweepCli::new();
    cli.args(args.iter().copied())
        .args(["--root", cookbook.root().as_str()]);
    cli
}

#[test]
fn test_sweep_counts_marker_not_exit_code() {
    let cookbook = TempCookbook::new();
    cookbook
        .recipe("chapter-01/a-hello")
        .output("test", "running 2 tests\nAll tests passed\n");
    cookbook
        .recipe("chapter-01/b-loops")
        .output("test", "running 2 tests\n1 failed\n");
    cookbook
        .recipe("chapter-02/c-io")
        .output("test", "All tests passed\n")
        .exit_code("test", 1);

    let output = sweep(&cookbook, &["sweep-tests", "--message-format", "json"]).output();
    output
        .assert_exit_code(SweepExitCode::RECIPES_FAILED)
        .assert_stderr_contains("Sweeping 3 recipes under")
        .assert_stderr_contains("PASS [")
        .assert_stderr_contains("3 recipes run: 2 passed, 1 failed")
        .assert_stderr_contains("chapter-01/b-loops: success marker not found in output")
        .assert_stderr_contains("error: sweep failed: 1 of 3 recipes failed");

    let summary = output.summary();
    assert!(!summary.success);
    assert_eq!(
        summary.totals,
        SweepTotalsSummary::Tests {
            total: 3,
            passed: 2,
            failed: 1,
        }
    );
    let recipes: Vec<_> = summary
        .recipes
        .iter()
        .map(|recipe| (format!("{}/{}", recipe.chapter, recipe.recipe), recipe.status, recipe.exit_code))
        .collect();
    assert_eq!(
        recipes,
        vec![
            ("chapter-01/a-hello".to_owned(), RecipeStatusSummary::Pass, Some(0)),
            ("chapter-01/b-loops".to_owned(), RecipeStatusSummary::Fail, Some(0)),
            ("chapter-02/c-io".to_owned(), RecipeStatusSummary::Pass, Some(1)),
        ]
    );
}

#[test]
fn coverage_sweep_meets_minimum() {
    let cookbook = TempCookbook::new();
    cookbook
        .recipe("chapter-01/a-hello")
        .output("coverage", "Line coverage: 80.5% (161/200)\n");
    cookbook
        .recipe("chapter-01/b-loops")
        .output("coverage", "Line coverage: 92.0%\nBranch coverage: 10%\n");

    let output = sweep(
        &cookbook,
        &["sweep-coverage", "--min-average", "85", "--message-format", "json"],
    )
    .output();
    output
        .assert_exit_code(SweepExitCode::OK)
        .assert_stderr_contains("80.50% chapter-01/a-hello")
        .assert_stderr_contains("92.00% chapter-01/b-loops")
        .assert_stderr_contains("average 86.25% (minimum 85.00%)");

    let summary = output.summary();
    assert!(summary.success);
    match summary.totals {
        SweepTotalsSummary::Coverage {
            average,
            min_average,
            measured,
            ..
        } => {
            assert_eq!(average, Some(86.25));
            assert_eq!(min_average, 85.0);
            assert_eq!(measured, 2);
        }
        other => panic!("expected coverage totals, found {other:?}"),
    }
}

#[test]
fn coverage_sweep_below_minimum() {
    let cookbook = TempCookbook::new();
    cookbook
        .recipe("chapter-01/a-hello")
        .output("coverage", "coverage 70%\n");
    cookbook
        .recipe("chapter-01/b-silent")
        .output("coverage", "done\n");

    let output = sweep(&cookbook, &["sweep-coverage", "--min-average", "50"]).output();
    output
        .assert_exit_code(SweepExitCode::COVERAGE_BELOW_THRESHOLD)
        .assert_stderr_contains("NO DATA")
        .assert_stderr_contains("warning: no coverage percentage in output of chapter-01/b-silent")
        .assert_stderr_contains("average 35.00% (minimum 50.00%)")
        .assert_stderr_contains("error: sweep failed: average coverage 35.00% is below the minimum of 50.00%");
}

#[test]
fn tool_missing_fails_before_any_recipe() {
    let cookbook = TempCookbook::with_config(indoc! {r#"
        [profile.missing.test]
        command = "recipe-sweep-no-such-tool test"
    "#});
    cookbook
        .recipe("chapter-01/a-hello")
        .output("test", "All tests passed\n");

    let output = sweep(&cookbook, &["sweep-tests", "--profile", "missing"]).output();
    output
        .assert_exit_code(SweepExitCode::TOOL_MISSING)
        .assert_stderr_contains("tool `recipe-sweep-no-such-tool` not found");
    assert!(
        !output.stderr.contains("Sweeping"),
        "no recipe should run:\n{output}"
    );
}

#[test]
fn empty_cookbook_succeeds() {
    let cookbook = TempCookbook::new();

    let output = sweep(&cookbook, &["sweep-tests"]).output();
    output
        .assert_exit_code(SweepExitCode::OK)
        .assert_stderr_contains("warning: no recipes found under");

    let output = sweep(&cookbook, &["sweep-coverage", "--message-format", "json"]).output();
    output
        .assert_exit_code(SweepExitCode::OK)
        .assert_stderr_contains("average no data");
    match output.summary().totals {
        SweepTotalsSummary::Coverage { average, count, .. } => {
            assert_eq!(average, None);
            assert_eq!(count, 0);
        }
        other => panic!("expected coverage totals, found {other:?}"),
    }
}

#[test]
fn coverage_sweep_with_every_command_failing() {
    let cookbook = TempCookbook::new();
    for name in ["chapter-01/a-hello", "chapter-01/b-loops"] {
        cookbook
            .recipe(name)
            .output("coverage", "Line coverage: 95.0%\n")
            .exit_code("coverage", 1);
    }

    let output = sweep(&cookbook, &["sweep-coverage", "--message-format", "json"]).output();
    output
        .assert_exit_code(SweepExitCode::COVERAGE_BELOW_THRESHOLD)
        .assert_stderr_contains("average no data (minimum 80.00%) across 0 of 2 recipes")
        .assert_stderr_contains("error: sweep failed: none of the 2 recipes run reported coverage");
    assert!(!output.summary().success);
}

#[test]
fn timeout_kills_recipe() {
    let cookbook = TempCookbook::new();
    cookbook
        .recipe("chapter-01/a-slow")
        .sleep("test", Duration::from_secs(30))
        .output("test", "All tests passed\n");
    cookbook
        .recipe("chapter-01/b-quick")
        .output("test", "All tests passed\n");

    let output = sweep(&cookbook, &["sweep-tests", "--timeout", "500ms"]).output();
    output
        .assert_exit_code(SweepExitCode::RECIPES_FAILED)
        .assert_stderr_contains("TIMEOUT [")
        .assert_stderr_contains("chapter-01/a-slow: timed out after 500ms")
        .assert_stderr_contains("2 recipes run: 1 passed, 1 failed");
}

#[test]
fn failure_output_and_report_dir() {
    let cookbook = TempCookbook::new();
    cookbook
        .recipe("chapter-01/a-broken")
        .output("test", "assertion failed: left == right\n")
        .exit_code("test", 2);
    let report_dir = cookbook.root().join("target/logs");

    let output = sweep(
        &cookbook,
        &[
            "sweep-tests",
            "--failure-output",
            "immediate",
            "--report-dir",
            report_dir.as_str(),
        ],
    )
    .output();
    output
        .assert_exit_code(SweepExitCode::RECIPES_FAILED)
        .assert_stderr_contains("--- OUTPUT: chapter-01/a-broken ---")
        .assert_stderr_contains("assertion failed: left == right")
        .assert_stderr_contains("chapter-01/a-broken: exited with code 2");

    let log = fs_err::read_to_string(report_dir.join("chapter-01/a-broken.log"))
        .expect("log file written");
    assert_eq!(
        log,
        "fake-recipe-tool: test chapter-01/a-broken (SWEEP_MODE=test)\n\
         assertion failed: left == right\n"
    );
}

#[test]
fn captured_output_hidden_by_default() {
    let cookbook = TempCookbook::new();
    cookbook
        .recipe("chapter-01/a-broken")
        .output("test", "secret details\n");

    let output = sweep(&cookbook, &["sweep-tests"]).output();
    output.assert_exit_code(SweepExitCode::RECIPES_FAILED);
    assert!(
        !output.stderr.contains("secret details"),
        "captured output is not shown:\n{output}"
    );

    let output = sweep(&cookbook, &["--verbose", "sweep-tests"]).output();
    output
        .assert_exit_code(SweepExitCode::RECIPES_FAILED)
        .assert_stderr_contains("secret details");
}

#[test]
fn junit_report() {
    let cookbook = TempCookbook::with_config(indoc! {r#"
        [profile.ci.junit]
        path = "target/sweep/junit.xml"
    "#});
    cookbook
        .recipe("chapter-01/a-hello")
        .output("test", "All tests passed\n");
    cookbook.recipe("chapter-02/b-io").output("test", "nope\n");

    let output = sweep(&cookbook, &["sweep-tests", "--profile", "ci"]).output();
    output
        .assert_exit_code(SweepExitCode::RECIPES_FAILED)
        .assert_stderr_contains("(profile: ci)");

    let xml = fs_err::read_to_string(cookbook.root().join("target/sweep/junit.xml"))
        .expect("JUnit report written");
    for expected in [
        r#"<testsuite name="chapter-01" tests="1""#,
        r#"<testsuite name="chapter-02" tests="1""#,
        r#"<testcase name="b-io" classname="chapter-02""#,
        r#"message="success marker not found in output""#,
    ] {
        assert!(xml.contains(expected), "{expected} not found in:\n{xml}");
    }
}

#[test]
fn unknown_profile() {
    let cookbook = TempCookbook::new();
    let output = sweep(&cookbook, &["sweep-tests", "--profile", "nightly"]).output();
    output
        .assert_exit_code(SweepExitCode::SETUP_ERROR)
        .assert_stderr_contains("profile `nightly` not found (known profiles: default)");
}

#[test]
fn scaffolded_recipe_is_swept() {
    let cookbook = TempCookbook::new();

    let output = SweepCli::new()
        .args(["scaffold", "--root", cookbook.root().as_str(), "chapter-05", "Error Handling!"])
        .output();
    output.assert_exit_code(SweepExitCode::OK);
    let recipe_dir = cookbook.root().join("chapter-05/error-handling");
    assert_eq!(output.stdout.trim_end(), recipe_dir.as_str());
    assert!(recipe_dir.join("README.md").is_file());

    let output = SweepCli::new()
        .args(["scaffold", "--root", cookbook.root().as_str(), "chapter-05", "error handling"])
        .output();
    output
        .assert_exit_code(SweepExitCode::SCAFFOLD_FAILED)
        .assert_stderr_contains("already exists");

    // The new recipe has no scripted output yet, so it's found and fails.
    let output = sweep(&cookbook, &["sweep-tests", "--message-format", "json"]).output();
    output.assert_exit_code(SweepExitCode::RECIPES_FAILED);
    let summary = output.summary();
    assert_eq!(summary.recipes.len(), 1);
    assert_eq!(summary.recipes[0].path, recipe_dir);
}
