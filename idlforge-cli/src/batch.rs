//! Sequential batch runs of saved test cases.
//!
//! Cases run one at a time through the same [`Executor`], with a pause
//! between the end of one case and the start of the next. A failing case
//! (including one whose instruction no longer exists) is recorded and the
//! run moves on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use idlforge_core::session::Session;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::suite::TestCase;
use crate::tx::{Endpoint, ExecutionError, Executor, WalletSigner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunResult {
    pub case_id: Uuid,
    pub case_name: String,
    pub status: RunStatus,
    pub signature: Option<String>,
    pub error: Option<ExecutionError>,
    pub duration: Duration,
}

impl TestRunResult {
    fn pending(case: &TestCase) -> Self {
        Self {
            case_id: case.id,
            case_name: case.name.clone(),
            status: RunStatus::Pending,
            signature: None,
            error: None,
            duration: Duration::ZERO,
        }
    }

    fn fail(&mut self, error: ExecutionError) {
        self.status = RunStatus::Failure;
        self.error = Some(error);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<TestRunResult>,
    pub summary: BatchSummary,
}

/// Cooperative early stop, checked between cases.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct BatchRunner<'a> {
    executor: &'a Executor,
    session: &'a Session,
    signer: &'a dyn WalletSigner,
    endpoint: &'a dyn Endpoint,
    delay: Duration,
    fail_fast: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        executor: &'a Executor,
        session: &'a Session,
        signer: &'a dyn WalletSigner,
        endpoint: &'a dyn Endpoint,
    ) -> Self {
        Self {
            executor,
            session,
            signer,
            endpoint,
            delay: executor.config().batch_delay,
            fail_fast: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cancel the remaining cases after the first failure.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run `cases` in order. `on_update` sees every status change.
    ///
    /// Fails only with [`ExecutionError::Busy`] when another execution holds
    /// the executor; case failures are part of the report.
    pub async fn run<F>(&self, cases: &[TestCase], stop: &StopSignal, mut on_update: F) -> Result<BatchReport, ExecutionError>
    where
        F: FnMut(usize, &TestRunResult),
    {
        let _guard = self.executor.gate().try_acquire()?;
        let mut results: Vec<TestRunResult> = cases.iter().map(TestRunResult::pending).collect();
        info!(cases = cases.len(), delay = ?self.delay, "batch run started");

        let mut halted = false;
        for (index, case) in cases.iter().enumerate() {
            if index > 0 && !halted {
                tokio::time::sleep(self.delay).await;
            }
            if halted || stop.is_stopped() {
                halted = true;
                results[index].fail(ExecutionError::Cancelled);
                on_update(index, &results[index]);
                continue;
            }

            results[index].status = RunStatus::Running;
            on_update(index, &results[index]);

            let started = Instant::now();
            let outcome = match self.session.call(&case.instruction) {
                Some(call) => {
                    let state = case.to_state(call);
                    self.executor
                        .run_once(self.session, &state, self.signer, self.endpoint)
                        .await
                }
                None => Err(ExecutionError::UnknownCall {
                    name: case.instruction.clone(),
                }),
            };

            let result = &mut results[index];
            result.duration = started.elapsed();
            match outcome {
                Ok(done) => {
                    info!(case = %case.name, signature = %done.signature, "case passed");
                    result.status = RunStatus::Success;
                    result.signature = Some(done.signature);
                }
                Err(e) => {
                    warn!(case = %case.name, error = %e, "case failed");
                    if let ExecutionError::Timeout { signature } = &e {
                        result.signature = Some(signature.clone());
                    }
                    result.fail(e);
                    if self.fail_fast {
                        halted = true;
                    }
                }
            }
            on_update(index, &results[index]);
        }

        let summary = summarize(&results);
        info!(
            total = summary.total,
            success = summary.success,
            failure = summary.failure,
            "batch run finished"
        );
        Ok(BatchReport { results, summary })
    }
}

pub fn summarize(results: &[TestRunResult]) -> BatchSummary {
    BatchSummary {
        total: results.len(),
        success: results.iter().filter(|r| r.status == RunStatus::Success).count(),
        failure: results.iter().filter(|r| r.status == RunStatus::Failure).count(),
    }
}
