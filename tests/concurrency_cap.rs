// tests/concurrency_cap.rs

//! The job semaphore bounds how many tasks are inside their build step.

use std::collections::HashMap;

use tokio::time::{timeout, Duration};

use apkforge::dag::PackageGraph;
use apkforge::sched::{CancelToken, Scheduler};
use apkforge_test_utils::builders::{build_options, workspace, RecipeBuilder};
use apkforge_test_utils::fake_backends::{fake_backends, FakeBuildDriver, FakeIndexGenerator};
use apkforge_test_utils::init_tracing;

async fn run_independent(count: usize, jobs: usize) -> anyhow::Result<usize> {
    let tmp = tempfile::tempdir()?;

    let builders: Vec<RecipeBuilder> = (0..count)
        .map(|i| RecipeBuilder::new(&format!("pkg{i}")))
        .collect();
    let recipes = workspace(tmp.path(), &builders);
    let graph = PackageGraph::build(&recipes)?;

    let driver = FakeBuildDriver::with_delay(Duration::from_millis(20));
    let indexer = FakeIndexGenerator::new();
    let scheduler = Scheduler::new(
        build_options(tmp.path(), jobs),
        &recipes,
        &graph,
        HashMap::new(),
        fake_backends(&driver, &indexer),
        CancelToken::new(),
    )?;

    timeout(Duration::from_secs(10), scheduler.run(&[])).await??;

    assert_eq!(driver.packages().len(), count);
    Ok(driver.gauge.max())
}

#[tokio::test]
async fn build_step_concurrency_never_exceeds_two_jobs() -> anyhow::Result<()> {
    init_tracing();
    let max = run_independent(8, 2).await?;
    assert!(max <= 2, "observed concurrency {max} > 2");
    Ok(())
}

#[tokio::test]
async fn single_job_serializes_every_build() -> anyhow::Result<()> {
    init_tracing();
    let max = run_independent(5, 1).await?;
    assert_eq!(max, 1, "observed concurrency {max} != 1");
    Ok(())
}
