//! Fake build/index backends for scheduler tests.
//!
//! None of these spawn processes; they record requests and emit
//! deterministic results so integration tests can assert exactly what the
//! scheduler asked for.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use apkforge::exec::{Backends, BuildDriver, BuildRequest, SourceEpochResolver};
use apkforge::index::{IndexGenerator, IndexRequest};

/// Tracks how many builds are inside the build-step region, and the
/// high-water mark, to assert the job cap.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// Records build requests; optionally sleeps and fails selected packages.
pub struct FakeBuildDriver {
    calls: Mutex<Vec<(String, String)>>,
    fail: Mutex<HashSet<String>>,
    delay: Duration,
    pub gauge: ConcurrencyGauge,
}

impl FakeBuildDriver {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: Mutex::new(HashSet::new()),
            delay,
            gauge: ConcurrencyGauge::default(),
        })
    }

    /// Make every build of `pkg` fail.
    pub fn fail_package(&self, pkg: &str) {
        self.fail.lock().unwrap().insert(pkg.to_string());
    }

    /// `(package, arch)` pairs in the order the builds finished.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Package names in the order the builds finished.
    pub fn packages(&self) -> Vec<String> {
        self.calls().into_iter().map(|(pkg, _)| pkg).collect()
    }
}

impl BuildDriver for FakeBuildDriver {
    fn build(&self, req: BuildRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.gauge.enter();

            // Leave a log file behind like the real driver would.
            if let Some(parent) = req.log_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = std::fs::write(
                &req.log_path,
                format!("fake build log for {}/{}\n", req.package, req.arch),
            );

            if !self.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = req.cancel.cancelled() => {
                        self.gauge.exit();
                        return Err(req.cancel.error());
                    }
                }
            }

            let failed = self.fail.lock().unwrap().contains(&req.package);
            self.calls
                .lock()
                .unwrap()
                .push((req.package.clone(), req.arch.clone()));
            self.gauge.exit();

            if failed {
                return Err(anyhow!("exit status 1"));
            }
            Ok(())
        })
    }
}

/// Records index requests and always succeeds.
#[derive(Default)]
pub struct FakeIndexGenerator {
    requests: Mutex<Vec<IndexRequest>>,
}

impl FakeIndexGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<IndexRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl IndexGenerator for FakeIndexGenerator {
    fn generate(&self, req: IndexRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(req);
            Ok(())
        })
    }
}

/// Returns a fixed timestamp for every path.
pub struct FixedSourceEpoch(pub &'static str);

impl SourceEpochResolver for FixedSourceEpoch {
    fn commit_timestamp<'a>(
        &'a self,
        _path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move { Ok(self.0.to_string()) })
    }
}

/// Backends wired to the fakes.
pub fn fake_backends(driver: &Arc<FakeBuildDriver>, indexer: &Arc<FakeIndexGenerator>) -> Backends {
    Backends {
        driver: driver.clone(),
        indexer: indexer.clone(),
        source_epoch: Arc::new(FixedSourceEpoch("2024-01-01T00:00:00Z")),
    }
}
