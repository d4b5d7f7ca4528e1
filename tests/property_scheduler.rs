// tests/property_scheduler.rs

//! Property tests: random DAGs build every package exactly once, in
//! dependency order, under the job cap.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use tokio::time::{timeout, Duration};

use apkforge::dag::PackageGraph;
use apkforge::sched::{CancelToken, Scheduler};
use apkforge_test_utils::builders::{build_options, workspace, RecipeBuilder};
use apkforge_test_utils::fake_backends::{fake_backends, FakeBuildDriver, FakeIndexGenerator};

// Strategy to generate a valid DAG as dependency index lists.
// Acyclicity is guaranteed by only allowing task N to depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(move |num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..max_tasks),
            num_tasks,
        )
    })
}

/// Sanitize raw dependency indices: task `i` may only depend on `j < i`.
fn sanitize(raw: Vec<Vec<usize>>) -> Vec<HashSet<usize>> {
    raw.into_iter()
        .enumerate()
        .map(|(i, potential)| {
            potential
                .into_iter()
                .filter_map(|raw_idx| if i > 0 { Some(raw_idx % i) } else { None })
                .collect()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_dags_build_each_package_once_in_order(
        raw_deps in dag_strategy(8),
        jobs in 1usize..4,
    ) {
        let deps = sanitize(raw_deps);

        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        rt.block_on(async move {
            let tmp = tempfile::tempdir().expect("tempdir");

            let builders: Vec<RecipeBuilder> = deps
                .iter()
                .enumerate()
                .map(|(i, dep_set)| {
                    let mut builder = RecipeBuilder::new(&format!("task-{i}"));
                    for dep in dep_set {
                        builder = builder.dep(&format!("task-{dep}"));
                    }
                    builder
                })
                .collect();

            let recipes = workspace(tmp.path(), &builders);
            let graph = PackageGraph::build(&recipes).expect("acyclic by construction");

            let driver = FakeBuildDriver::new();
            let indexer = FakeIndexGenerator::new();
            let scheduler = Scheduler::new(
                build_options(tmp.path(), jobs),
                &recipes,
                &graph,
                HashMap::new(),
                fake_backends(&driver, &indexer),
                CancelToken::new(),
            )
            .expect("scheduler construction");

            timeout(Duration::from_secs(10), scheduler.run(&[]))
                .await
                .expect("run did not hang")
                .expect("run succeeded");

            let order = driver.packages();
            assert_eq!(order.len(), deps.len(), "one build per package: {order:?}");

            let pos = |name: &str| {
                order
                    .iter()
                    .position(|p| p == name)
                    .expect("package was built")
            };
            for (i, dep_set) in deps.iter().enumerate() {
                for dep in dep_set {
                    assert!(
                        pos(&format!("task-{dep}")) < pos(&format!("task-{i}")),
                        "task-{dep} must finish before task-{i}: {order:?}"
                    );
                }
            }

            assert!(
                driver.gauge.max() <= jobs,
                "observed concurrency {} > job cap {jobs}",
                driver.gauge.max()
            );
        });
    }
}
