// tests/build_graph.rs

//! Dependency-ordered builds across a diamond graph.

use std::collections::HashMap;

use tokio::time::{timeout, Duration};

use apkforge::dag::PackageGraph;
use apkforge::sched::{CancelToken, Scheduler};
use apkforge_test_utils::builders::{build_options, workspace, RecipeBuilder};
use apkforge_test_utils::fake_backends::{fake_backends, FakeBuildDriver, FakeIndexGenerator};
use apkforge_test_utils::init_tracing;

#[tokio::test]
async fn diamond_builds_in_dependency_order() -> anyhow::Result<()> {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    // d depends on b and c, which both depend on a.
    let recipes = workspace(
        tmp.path(),
        &[
            RecipeBuilder::new("a"),
            RecipeBuilder::new("b").dep("a"),
            RecipeBuilder::new("c").dep("a"),
            RecipeBuilder::new("d").dep("b").dep("c"),
        ],
    );
    let graph = PackageGraph::build(&recipes)?;

    let driver = FakeBuildDriver::new();
    let indexer = FakeIndexGenerator::new();
    let scheduler = Scheduler::new(
        build_options(tmp.path(), 2),
        &recipes,
        &graph,
        HashMap::new(),
        fake_backends(&driver, &indexer),
        CancelToken::new(),
    )?;

    timeout(Duration::from_secs(5), scheduler.run(&[])).await??;

    let order = driver.packages();
    assert_eq!(order.len(), 4, "exactly one build per package: {order:?}");

    let pos = |pkg: &str| order.iter().position(|p| p == pkg).unwrap();
    assert!(pos("a") < pos("b"));
    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("d"));
    assert!(pos("c") < pos("d"));

    Ok(())
}

#[tokio::test]
async fn chain_completes_under_single_job_cap() -> anyhow::Result<()> {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    // The permit must be acquired after the dependency wait, or this chain
    // deadlocks at jobs=1.
    let recipes = workspace(
        tmp.path(),
        &[
            RecipeBuilder::new("base"),
            RecipeBuilder::new("mid").dep("base"),
            RecipeBuilder::new("top").dep("mid"),
        ],
    );
    let graph = PackageGraph::build(&recipes)?;

    let driver = FakeBuildDriver::with_delay(Duration::from_millis(10));
    let indexer = FakeIndexGenerator::new();
    let scheduler = Scheduler::new(
        build_options(tmp.path(), 1),
        &recipes,
        &graph,
        HashMap::new(),
        fake_backends(&driver, &indexer),
        CancelToken::new(),
    )?;

    timeout(Duration::from_secs(5), scheduler.run(&[])).await??;

    assert_eq!(
        driver.packages(),
        vec!["base".to_string(), "mid".to_string(), "top".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn empty_workspace_is_an_error() -> anyhow::Result<()> {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    let recipes = workspace(tmp.path(), &[]);
    let graph = PackageGraph::build(&recipes)?;

    let driver = FakeBuildDriver::new();
    let indexer = FakeIndexGenerator::new();
    let scheduler = Scheduler::new(
        build_options(tmp.path(), 1),
        &recipes,
        &graph,
        HashMap::new(),
        fake_backends(&driver, &indexer),
        CancelToken::new(),
    )?;

    let err = scheduler.run(&[]).await.unwrap_err();
    assert!(err.to_string().contains("no packages to build"));

    Ok(())
}
