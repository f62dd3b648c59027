//! Submission pipeline
//!
//! **Algorithm:**
//! 1. Prepare the draft locally (required fields, photo limits, coordinate sanitation);
//!    a failure here makes no network call
//! 2. Send the prepared payload, up to `max_attempts` times, with the same
//!    idempotency key on every attempt
//! 3. Timeouts, connection failures and 5xx answers are retried after
//!    `backoff_base * attempt`; any 4xx answer is returned at once
//! 4. Cancellation stops an in-flight attempt or a pending backoff immediately

use futures::future::{BoxFuture, FutureExt};
use raasta_common::{time, Report};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::draft::ReportDraft;
use crate::transport::{Progress, ProgressFn, Transport, UploadProgress};
use crate::SubmitError;

/// Waits between attempts; replaced in tests to avoid real timers
pub type DelayFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// `tokio::time::sleep`
pub fn tokio_delay() -> DelayFn {
    Arc::new(|duration: Duration| tokio::time::sleep(duration).boxed())
}

/// A report the server accepted
#[derive(Debug, Clone)]
pub struct Submitted {
    pub report: Report,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Delivers report drafts to the server
pub struct Submitter {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    max_attempts: u32,
    backoff_base: Duration,
    delay: DelayFn,
    progress: Option<ProgressFn>,
}

impl Submitter {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
            delay: tokio_delay(),
            progress: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: DelayFn) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Submit a draft, retrying transient failures
    pub async fn submit(&self, draft: &ReportDraft) -> Result<Submitted, SubmitError> {
        self.submit_until_cancelled(draft, &CancellationToken::new()).await
    }

    /// Like [`Submitter::submit`], abandoning the submission once `cancel` fires
    pub async fn submit_until_cancelled(
        &self,
        draft: &ReportDraft,
        cancel: &CancellationToken,
    ) -> Result<Submitted, SubmitError> {
        let prepared = draft.prepare()?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(SubmitError::Cancelled);
            }

            let token = self.credentials.bearer_token();
            let progress = UploadProgress::new(attempt, self.progress.clone());

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(attempt, "Submission cancelled during upload");
                    return Err(SubmitError::Cancelled);
                }
                outcome = self.transport.send_report(&prepared, token, progress) => outcome,
            };

            let err = match outcome {
                Ok(report) => {
                    info!(report_id = %report.id(), attempt, "Report submitted");
                    return Ok(Submitted {
                        report,
                        attempts: attempt,
                    });
                }
                Err(err) => err,
            };

            if err == SubmitError::Unauthorized {
                self.credentials.invalidate();
            }

            if !err.is_retryable() || attempt >= self.max_attempts {
                warn!(attempt, error = %err, "Submission failed");
                return Err(err);
            }

            let wait = time::linear_backoff(self.backoff_base, attempt);
            warn!(
                attempt,
                backoff_ms = wait.as_millis() as u64,
                error = %err,
                "Submission attempt failed, will retry after backoff"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(attempt, "Submission cancelled during backoff");
                    return Err(SubmitError::Cancelled);
                }
                _ = (self.delay)(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticToken;
    use crate::draft::PreparedSubmission;
    use async_trait::async_trait;
    use raasta_common::{NewReport, ReportType};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Plays back a fixed sequence of outcomes
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<(), SubmitError>>>,
        keys: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<(), SubmitError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                keys: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> usize {
            self.keys.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send_report(
            &self,
            submission: &PreparedSubmission,
            _bearer_token: Option<String>,
            progress: UploadProgress,
        ) -> Result<Report, SubmitError> {
            self.keys.lock().unwrap().push(submission.idempotency_key.clone());
            progress.report(1, 1);
            let next = self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
            next.map(|()| {
                let new = NewReport::new(ReportType::Pothole, "Pothole near junction", "Ring Road");
                Report::create(new, Uuid::new_v4(), Vec::new()).unwrap()
            })
        }
    }

    /// Records requested waits without sleeping
    fn recording_delay() -> (DelayFn, Arc<Mutex<Vec<Duration>>>) {
        let waits = Arc::new(Mutex::new(Vec::new()));
        let sink = waits.clone();
        let delay: DelayFn = Arc::new(move |d: Duration| {
            sink.lock().unwrap().push(d);
            async {}.boxed()
        });
        (delay, waits)
    }

    fn submitter(transport: Arc<ScriptedTransport>) -> (Submitter, Arc<Mutex<Vec<Duration>>>) {
        let (delay, waits) = recording_delay();
        let submitter = Submitter::new(
            transport,
            Arc::new(StaticToken("t".into())),
            &ClientConfig::default(),
        )
        .with_delay(delay);
        (submitter, waits)
    }

    fn draft() -> ReportDraft {
        ReportDraft::new(ReportType::Pothole, "Pothole near junction", "Ring Road")
    }

    #[tokio::test]
    async fn test_timeout_then_success_uses_two_attempts() {
        let transport = ScriptedTransport::new(vec![Err(SubmitError::Timeout), Ok(())]);
        let (submitter, waits) = submitter(transport.clone());

        let submitted = submitter.submit(&draft()).await.unwrap();
        assert_eq!(submitted.attempts, 2);
        assert_eq!(transport.attempts(), 2);
        assert_eq!(*waits.lock().unwrap(), vec![Duration::from_millis(1000)]);

        let keys = transport.keys.lock().unwrap();
        assert_eq!(keys[0], keys[1], "attempts must share one idempotency key");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(SubmitError::from_status(400, "bad request"))]);
        let (submitter, waits) = submitter(transport.clone());

        let err = submitter.submit(&draft()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected { status: 400, .. }));
        assert_eq!(transport.attempts(), 1);
        assert!(waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_final_failure_is_typed() {
        let transport = ScriptedTransport::new(vec![
            Err(SubmitError::Network),
            Err(SubmitError::from_status(502, "bad gateway")),
            Err(SubmitError::Timeout),
        ]);
        let (submitter, waits) = submitter(transport.clone());
        let submitter = submitter.with_max_attempts(3);

        let err = submitter.submit(&draft()).await.unwrap_err();
        assert_eq!(err, SubmitError::Timeout);
        assert_eq!(transport.attempts(), 3);
        assert_eq!(
            *waits.lock().unwrap(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_attempt() {
        let transport = ScriptedTransport::new(vec![]);
        let (submitter, _) = submitter(transport.clone());

        let mut incomplete = draft();
        incomplete.description.clear();
        let err = submitter.submit(&incomplete).await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation { .. }));
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let transport = ScriptedTransport::new(vec![]);
        let (submitter, _) = submitter(transport.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = submitter.submit_until_cancelled(&draft(), &cancel).await.unwrap_err();
        assert_eq!(err, SubmitError::Cancelled);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_stops_retry_loop() {
        let transport = ScriptedTransport::new(vec![Err(SubmitError::Timeout), Ok(())]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        // The backoff never completes on its own; cancelling must end the loop.
        let delay: DelayFn = Arc::new(move |_: Duration| {
            trigger.cancel();
            futures::future::pending::<()>().boxed()
        });
        let submitter = Submitter::new(
            transport.clone(),
            Arc::new(StaticToken("t".into())),
            &ClientConfig::default(),
        )
        .with_delay(delay);

        let err = submitter.submit_until_cancelled(&draft(), &cancel).await.unwrap_err();
        assert_eq!(err, SubmitError::Cancelled);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_progress_reported_per_attempt() {
        let transport = ScriptedTransport::new(vec![Err(SubmitError::Timeout), Ok(())]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (submitter, _) = submitter(transport);
        let submitter = submitter.with_progress(move |p| sink.lock().unwrap().push(p.attempt));

        submitter.submit(&draft()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
