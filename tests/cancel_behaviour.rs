// tests/cancel_behaviour.rs

//! Cancellation mid-run: summary error, no hangs, no lost completions.

use std::collections::HashMap;

use tokio::time::{timeout, Duration};

use apkforge::dag::PackageGraph;
use apkforge::sched::{CancelToken, Scheduler};
use apkforge_test_utils::builders::{build_options, workspace, RecipeBuilder};
use apkforge_test_utils::fake_backends::{fake_backends, FakeBuildDriver, FakeIndexGenerator};
use apkforge_test_utils::init_tracing;

#[tokio::test]
async fn cancellation_summarizes_instead_of_enumerating() -> anyhow::Result<()> {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    let names: Vec<String> = (0..10).map(|i| format!("pkg{i}")).collect();
    let builders: Vec<RecipeBuilder> =
        names.iter().map(|n| RecipeBuilder::new(n)).collect();
    let recipes = workspace(tmp.path(), &builders);
    let graph = PackageGraph::build(&recipes)?;

    let cancel = CancelToken::new();
    let driver = FakeBuildDriver::with_delay(Duration::from_millis(100));
    let indexer = FakeIndexGenerator::new();
    let scheduler = Scheduler::new(
        build_options(tmp.path(), 2),
        &recipes,
        &graph,
        HashMap::new(),
        fake_backends(&driver, &indexer),
        cancel.clone(),
    )?;

    // Cancel while the run is in flight: roughly after the first wave of two
    // builds finishes and the second wave has started.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            cancel.cancel("interrupted");
        });
    }

    // The run must still drain every started task and return promptly.
    let err = timeout(Duration::from_secs(5), scheduler.run(&[]))
        .await?
        .unwrap_err();
    let msg = err.to_string();

    assert!(
        msg.contains("failed to build 10 packages: interrupted"),
        "got: {msg}"
    );
    // Individual task errors are suppressed in the summary.
    assert!(!msg.contains("failed to build pkg"), "got: {msg}");

    // Only builds that finished before the cancel got recorded.
    assert!(driver.packages().len() < 10);

    Ok(())
}

#[tokio::test]
async fn cancellation_before_start_builds_nothing() -> anyhow::Result<()> {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    let recipes = workspace(
        tmp.path(),
        &[RecipeBuilder::new("a"), RecipeBuilder::new("b").dep("a")],
    );
    let graph = PackageGraph::build(&recipes)?;

    let cancel = CancelToken::new();
    cancel.cancel("interrupted");

    let driver = FakeBuildDriver::new();
    let indexer = FakeIndexGenerator::new();
    let scheduler = Scheduler::new(
        build_options(tmp.path(), 2),
        &recipes,
        &graph,
        HashMap::new(),
        fake_backends(&driver, &indexer),
        cancel,
    )?;

    let err = timeout(Duration::from_secs(5), scheduler.run(&[]))
        .await?
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("failed to build 2 packages: interrupted"),
        "got: {err}"
    );
    assert!(driver.calls().is_empty());

    Ok(())
}
