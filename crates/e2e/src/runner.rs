//! Main test runner that orchestrates the server, the browser session and
//! data-store cleanup around each case

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserConfig, BrowserSession};
use crate::cases::{Group, TestCase};
use crate::error::{E2eError, E2eResult};
use crate::page::{Account, Bookreader};
use crate::server::{ServerConfig, ServerHandle};
use crate::store::{CleanupScope, FluidinfoClient, StoreConfig, ValueStore};
use crate::wait::WaitPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub group: Group,
    pub outcome: CaseOutcome,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
}

impl TestResult {
    fn skipped(case: &TestCase) -> Self {
        Self {
            name: case.name.to_string(),
            group: case.group,
            outcome: CaseOutcome::Skipped,
            duration_ms: 0,
            error: None,
            screenshot: None,
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    /// Why the run stopped early, if it did
    pub aborted: Option<String>,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(
        started_at: DateTime<Utc>,
        duration_ms: u64,
        aborted: Option<String>,
        results: Vec<TestResult>,
    ) -> Self {
        let count = |o| results.iter().filter(|r| r.outcome == o).count();
        Self {
            started_at,
            total: results.len(),
            passed: count(CaseOutcome::Passed),
            failed: count(CaseOutcome::Failed),
            skipped: count(CaseOutcome::Skipped),
            duration_ms,
            aborted,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.aborted.is_none() && self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Spawn the static server before the run; `None` uses `base_url` as is
    pub server: Option<ServerConfig>,
    pub base_url: String,
    pub browser: BrowserConfig,
    /// Data store account, also used to log in through the UI
    pub store: StoreConfig,
    pub wait: WaitPolicy,
    pub output_dir: PathBuf,
    pub screenshots_on_failure: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: None,
            base_url: "http://localhost:8080/".to_string(),
            browser: BrowserConfig::default(),
            store: StoreConfig::default(),
            wait: WaitPolicy::default(),
            output_dir: PathBuf::from("test-results"),
            screenshots_on_failure: true,
        }
    }
}

/// The page operations the runner drives around each case
#[async_trait(?Send)]
pub trait CasePage {
    /// First load of the application
    async fn open(&self) -> E2eResult<()>;

    async fn reset_baseline(&self) -> E2eResult<()>;

    async fn run_case(&self, case: &TestCase) -> E2eResult<()>;

    async fn save_screenshot(&self, path: &Path) -> E2eResult<()>;

    /// End the browser session
    async fn close(self) -> E2eResult<()>;
}

#[async_trait(?Send)]
impl CasePage for Bookreader {
    async fn open(&self) -> E2eResult<()> {
        Bookreader::open(self).await
    }

    async fn reset_baseline(&self) -> E2eResult<()> {
        Bookreader::reset_baseline(self).await
    }

    async fn run_case(&self, case: &TestCase) -> E2eResult<()> {
        (case.run)(self).await
    }

    async fn save_screenshot(&self, path: &Path) -> E2eResult<()> {
        self.session().save_screenshot(path).await
    }

    async fn close(self) -> E2eResult<()> {
        self.into_session().close().await
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
    store: Arc<dyn ValueStore>,
    cleanup: CleanupScope,
    cancel: CancellationToken,
    server: Option<ServerHandle>,
}

impl TestRunner {
    /// Runner that cleans up through the configured Fluidinfo account
    pub fn new(config: RunnerConfig) -> E2eResult<Self> {
        let store = FluidinfoClient::login(&config.store)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Runner with a caller-supplied data store
    pub fn with_store(config: RunnerConfig, store: Arc<dyn ValueStore>) -> Self {
        let cleanup = CleanupScope::comments_by(&config.store.username);
        Self {
            config,
            store,
            cleanup,
            cancel: CancellationToken::new(),
            server: None,
        }
    }

    /// Cancelling this token aborts the run at the next wait or case boundary
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the static server if one is configured
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(());
        }
        let Some(server_config) = self.config.server.clone() else {
            return Ok(());
        };

        let server = ServerHandle::spawn(server_config).await?;
        self.config.base_url = format!("{}/", server.base_url());
        self.server = Some(server);
        Ok(())
    }

    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Run `cases` against one browser session.
    ///
    /// The session is closed whether the run completes, a case fails, or a
    /// fatal error aborts it. A fatal error is reported in
    /// [`TestSuiteResult::aborted`] with the remaining cases skipped.
    pub async fn run(&mut self, cases: &[TestCase]) -> E2eResult<TestSuiteResult> {
        self.start_server().await?;

        let session = BrowserSession::launch(&self.config.browser).await?;
        let account = Account {
            username: self.config.store.username.clone(),
            password: self.config.store.password.clone(),
        };
        let page = Bookreader::new(
            session,
            self.config.base_url.clone(),
            account,
            self.config.wait,
            self.cancel.clone(),
        );

        let suite = self.run_on(page, cases).await;
        self.stop_server()?;
        Ok(suite)
    }

    /// Run `cases` on an already launched page, closing it afterwards
    pub async fn run_on<P: CasePage>(&self, page: P, cases: &[TestCase]) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();

        let (results, aborted) = match page.open().await {
            Ok(()) => self.run_cases(&page, cases).await,
            Err(e) => {
                error!("Could not load the application: {}", e);
                let skipped = cases.iter().map(TestResult::skipped).collect();
                (skipped, Some(e.to_string()))
            }
        };

        if let Err(e) = page.close().await {
            warn!("Browser session did not close cleanly: {}", e);
        }

        let suite = TestSuiteResult::from_results(
            started_at,
            start.elapsed().as_millis() as u64,
            aborted,
            results,
        );

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        if let Some(reason) = &suite.aborted {
            error!("Run aborted: {}", reason);
        }

        suite
    }

    async fn run_cases<P: CasePage>(
        &self,
        page: &P,
        cases: &[TestCase],
    ) -> (Vec<TestResult>, Option<String>) {
        let mut results = Vec::with_capacity(cases.len());
        let mut aborted: Option<String> = None;

        info!("Running {} test(s)...", cases.len());

        for case in cases {
            if aborted.is_none() && self.cancel.is_cancelled() {
                aborted = Some("cancelled".to_string());
            }
            if aborted.is_some() {
                results.push(TestResult::skipped(case));
                continue;
            }

            match self.run_case(page, case).await {
                Ok(result) => {
                    match result.outcome {
                        CaseOutcome::Passed => {
                            info!("✓ {}::{} ({} ms)", case.group, case.name, result.duration_ms)
                        }
                        _ => error!(
                            "✗ {}::{} - {}",
                            case.group,
                            case.name,
                            result.error.as_deref().unwrap_or("unknown error")
                        ),
                    }
                    results.push(result);
                }
                Err(e) => {
                    error!("✗ {}::{} - fatal: {}", case.group, case.name, e);
                    results.push(TestResult {
                        error: Some(e.to_string()),
                        outcome: CaseOutcome::Failed,
                        ..TestResult::skipped(case)
                    });
                    aborted = Some(e.to_string());
                }
            }
        }

        (results, aborted)
    }

    /// Setup, body, teardown. `Err` means the run must stop.
    async fn run_case<P: CasePage>(&self, page: &P, case: &TestCase) -> E2eResult<TestResult> {
        let start = Instant::now();
        debug!("Running test: {}::{}", case.group, case.name);

        if case.mutates_store {
            self.purge().await?;
        }

        let outcome = match page.reset_baseline().await {
            Ok(()) => page.run_case(case).await,
            Err(e) => Err(setup_failure(e)),
        };
        let mut outcome = match outcome {
            Err(e) if e.is_fatal() => {
                // The run stops here, but the store is still left clean.
                if case.mutates_store {
                    self.purge().await?;
                }
                return Err(e);
            }
            other => other,
        };

        let mut screenshot = None;
        if outcome.is_err() && self.config.screenshots_on_failure {
            let path = self.screenshot_path(case);
            match page.save_screenshot(&path).await {
                Ok(()) => screenshot = Some(path),
                Err(e) => warn!("Could not capture screenshot for {}: {}", case.name, e),
            }
        }

        if case.mutates_store {
            self.purge().await?;
        }
        match page.reset_baseline().await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Teardown of {} left the page off baseline: {}", case.name, e);
                if outcome.is_ok() {
                    outcome = Err(E2eError::AssertionFailed(format!("teardown: {e}")));
                }
            }
        }

        Ok(TestResult {
            name: case.name.to_string(),
            group: case.group,
            outcome: if outcome.is_ok() {
                CaseOutcome::Passed
            } else {
                CaseOutcome::Failed
            },
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
            screenshot,
        })
    }

    async fn purge(&self) -> E2eResult<()> {
        self.cleanup.purge(self.store.as_ref()).await
    }

    fn screenshot_path(&self, case: &TestCase) -> PathBuf {
        self.config
            .output_dir
            .join("screenshots")
            .join(format!("{}-{}.png", case.group, case.name))
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

fn setup_failure(e: E2eError) -> E2eError {
    if e.is_fatal() {
        e
    } else {
        E2eError::AssertionFailed(format!("setup: {e}"))
    }
}

/// Write `results` as `test-results.json` under `dir`
pub fn write_results(dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, outcome: CaseOutcome) -> TestResult {
        TestResult {
            name: name.to_string(),
            group: Group::Session,
            outcome,
            duration_ms: 5,
            error: None,
            screenshot: None,
        }
    }

    #[test]
    fn test_suite_tally() {
        let suite = TestSuiteResult::from_results(
            Utc::now(),
            42,
            None,
            vec![
                result("a", CaseOutcome::Passed),
                result("b", CaseOutcome::Failed),
                result("c", CaseOutcome::Passed),
                result("d", CaseOutcome::Skipped),
            ],
        );
        assert_eq!(suite.total, 4);
        assert_eq!(suite.passed, 2);
        assert_eq!(suite.failed, 1);
        assert_eq!(suite.skipped, 1);
        assert!(!suite.success());
    }

    #[test]
    fn test_aborted_suite_is_not_success() {
        let suite = TestSuiteResult::from_results(
            Utc::now(),
            1,
            Some("Data store returned 500: boom".into()),
            vec![result("a", CaseOutcome::Passed)],
        );
        assert!(!suite.success());
    }

    #[test]
    fn test_setup_failure_keeps_fatal_errors() {
        let fatal = setup_failure(E2eError::Cancelled("about pane".into()));
        assert!(matches!(fatal, E2eError::Cancelled(_)));

        let wrapped = setup_failure(E2eError::Timeout {
            what: "about pane visible".into(),
            waited_ms: 10_000,
        });
        assert!(wrapped.to_string().contains("setup: Timeout waiting for"));
    }

    #[test]
    fn test_write_results_json() {
        let dir = tempfile::tempdir().unwrap();
        let suite = TestSuiteResult::from_results(
            Utc::now(),
            3,
            None,
            vec![result("logout", CaseOutcome::Passed)],
        );

        let path = write_results(dir.path(), &suite).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(json["passed"], 1);
        assert_eq!(json["results"][0]["name"], "logout");
        assert_eq!(json["results"][0]["group"], "session");
        assert_eq!(json["results"][0]["outcome"], "passed");
        assert!(json["aborted"].is_null());
    }

    mod page_driving {
        use super::*;
        use futures::future::{FutureExt, LocalBoxFuture};
        use std::sync::Mutex;

        type Log = Arc<Mutex<Vec<String>>>;

        fn record(log: &Log, event: impl Into<String>) {
            log.lock().unwrap().push(event.into());
        }

        /// Page whose case outcome is picked by the case name prefix
        struct ScriptedPage {
            log: Log,
            fail_open: bool,
        }

        #[async_trait(?Send)]
        impl CasePage for ScriptedPage {
            async fn open(&self) -> E2eResult<()> {
                record(&self.log, "open");
                if self.fail_open {
                    return Err(E2eError::Timeout {
                        what: "about pane visible".into(),
                        waited_ms: 10,
                    });
                }
                Ok(())
            }

            async fn reset_baseline(&self) -> E2eResult<()> {
                record(&self.log, "reset");
                Ok(())
            }

            async fn run_case(&self, case: &TestCase) -> E2eResult<()> {
                record(&self.log, format!("run:{}", case.name));
                if case.name.starts_with("fails") {
                    Err(E2eError::AssertionFailed("comment form should be hidden".into()))
                } else if case.name.starts_with("cancelled") {
                    Err(E2eError::Cancelled("comment shown".into()))
                } else {
                    Ok(())
                }
            }

            async fn save_screenshot(&self, _path: &Path) -> E2eResult<()> {
                record(&self.log, "screenshot");
                Ok(())
            }

            async fn close(self) -> E2eResult<()> {
                record(&self.log, "close");
                Ok(())
            }
        }

        /// Store that starts rejecting deletes from the `fail_from`th call
        struct ScriptedStore {
            log: Log,
            calls: Mutex<usize>,
            fail_from: Option<usize>,
        }

        #[async_trait]
        impl ValueStore for ScriptedStore {
            async fn delete_values(&self, _query: &str, _tags: &[String]) -> E2eResult<()> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                record(&self.log, "purge");
                match self.fail_from {
                    Some(n) if *calls >= n => Err(E2eError::Store {
                        status: 500,
                        body: "boom".into(),
                    }),
                    _ => Ok(()),
                }
            }
        }

        fn noop(_page: &Bookreader) -> LocalBoxFuture<'_, E2eResult<()>> {
            async { Ok(()) }.boxed_local()
        }

        fn reading(name: &'static str) -> TestCase {
            TestCase::new(Group::Reader, name, "", noop)
        }

        fn commenting(name: &'static str) -> TestCase {
            TestCase::new(Group::Annotate, name, "", noop).mutating()
        }

        struct Fixture {
            runner: TestRunner,
            log: Log,
            _output: tempfile::TempDir,
        }

        fn fixture(fail_from: Option<usize>) -> Fixture {
            let output = tempfile::tempdir().unwrap();
            let log: Log = Arc::default();
            let store = ScriptedStore {
                log: log.clone(),
                calls: Mutex::new(0),
                fail_from,
            };
            let config = RunnerConfig {
                output_dir: output.path().to_path_buf(),
                ..Default::default()
            };
            Fixture {
                runner: TestRunner::with_store(config, Arc::new(store)),
                log,
                _output: output,
            }
        }

        impl Fixture {
            fn page(&self) -> ScriptedPage {
                ScriptedPage {
                    log: self.log.clone(),
                    fail_open: false,
                }
            }

            fn events(&self) -> Vec<String> {
                self.log.lock().unwrap().clone()
            }
        }

        fn outcomes(suite: &TestSuiteResult) -> Vec<CaseOutcome> {
            suite.results.iter().map(|r| r.outcome).collect()
        }

        #[tokio::test]
        async fn test_purge_wraps_only_mutating_cases() {
            let fx = fixture(None);
            let suite = fx
                .runner
                .run_on(fx.page(), &[commenting("add"), reading("read")])
                .await;

            assert!(suite.success());
            assert_eq!(
                fx.events(),
                vec![
                    "open", "purge", "reset", "run:add", "purge", "reset", "reset",
                    "run:read", "reset", "close",
                ]
            );
        }

        #[tokio::test]
        async fn test_store_failure_aborts_and_skips_rest() {
            let fx = fixture(Some(1));
            let suite = fx
                .runner
                .run_on(
                    fx.page(),
                    &[commenting("add"), reading("read"), commenting("delete")],
                )
                .await;

            assert_eq!(
                outcomes(&suite),
                vec![CaseOutcome::Failed, CaseOutcome::Skipped, CaseOutcome::Skipped]
            );
            assert_eq!((suite.failed, suite.skipped), (1, 2));
            let reason = suite.aborted.as_deref().unwrap();
            assert!(reason.contains("500"), "{reason}");
            assert_eq!(fx.events(), vec!["open", "purge", "close"]);
        }

        #[tokio::test]
        async fn test_store_failure_after_case_aborts() {
            let fx = fixture(Some(2));
            let suite = fx
                .runner
                .run_on(fx.page(), &[commenting("add"), reading("read")])
                .await;

            assert_eq!(outcomes(&suite), vec![CaseOutcome::Failed, CaseOutcome::Skipped]);
            assert!(suite.aborted.is_some());
            assert_eq!(fx.events().last().map(String::as_str), Some("close"));
            assert!(!fx.events().contains(&"run:read".to_string()));
        }

        #[tokio::test]
        async fn test_fatal_case_error_still_purges() {
            let fx = fixture(None);
            let suite = fx
                .runner
                .run_on(fx.page(), &[commenting("cancelled_add"), reading("read")])
                .await;

            assert_eq!(outcomes(&suite), vec![CaseOutcome::Failed, CaseOutcome::Skipped]);
            assert!(suite.aborted.as_deref().unwrap().contains("Cancelled"));
            assert_eq!(
                fx.events(),
                vec!["open", "purge", "reset", "run:cancelled_add", "purge", "close"]
            );
        }

        #[tokio::test]
        async fn test_fatal_error_reports_failed_purge() {
            let fx = fixture(Some(2));
            let suite = fx
                .runner
                .run_on(fx.page(), &[commenting("cancelled_add")])
                .await;

            let reason = suite.aborted.as_deref().unwrap();
            assert!(reason.contains("Data store returned 500"), "{reason}");
            assert_eq!(fx.events().last().map(String::as_str), Some("close"));
        }

        #[tokio::test]
        async fn test_case_failure_continues_run() {
            let fx = fixture(None);
            let suite = fx
                .runner
                .run_on(fx.page(), &[reading("fails_nav"), reading("read")])
                .await;

            assert_eq!(outcomes(&suite), vec![CaseOutcome::Failed, CaseOutcome::Passed]);
            assert!(suite.aborted.is_none());
            assert!(suite.results[0].screenshot.is_some());
            assert!(suite.results[0]
                .error
                .as_deref()
                .unwrap()
                .contains("comment form should be hidden"));
            assert!(fx.events().contains(&"screenshot".to_string()));
        }

        #[tokio::test]
        async fn test_cancelled_before_start_skips_all() {
            let fx = fixture(None);
            fx.runner.cancel_token().cancel();
            let suite = fx
                .runner
                .run_on(fx.page(), &[commenting("add"), reading("read")])
                .await;

            assert_eq!(outcomes(&suite), vec![CaseOutcome::Skipped, CaseOutcome::Skipped]);
            assert_eq!(suite.aborted.as_deref(), Some("cancelled"));
            assert_eq!(fx.events(), vec!["open", "close"]);
        }

        #[tokio::test]
        async fn test_failed_load_still_closes() {
            let fx = fixture(None);
            let page = ScriptedPage {
                log: fx.log.clone(),
                fail_open: true,
            };
            let suite = fx.runner.run_on(page, &[reading("read")]).await;

            assert_eq!(outcomes(&suite), vec![CaseOutcome::Skipped]);
            assert!(suite.aborted.is_some());
            assert_eq!(fx.events(), vec!["open", "close"]);
        }
    }
}
