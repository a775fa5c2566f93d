//! Pipeline invocation under a deadline.
//!
//! The pipeline runs as its own task and reports through a one-shot slot.
//! The handler waits on exactly two events: the slot being filled, or the
//! deadline passing. Whichever it observes first wins. A result written after
//! the handler gave up is dropped by the closed slot; the task is never joined.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::pipeline::{Pipeline, PipelineError, PipelineRequest, PipelineResponse, PipelineResult};
use crate::resilience::timeouts::DeadlineScope;

/// What the response renderer is handed.
#[derive(Debug)]
pub enum InvocationOutcome {
    /// The pipeline answered without error. `None` is the "no response" answer.
    Success(Option<PipelineResponse>),
    /// The pipeline failed but still produced data.
    ErrorWithPartialData(PipelineResponse, PipelineError),
    /// The pipeline failed with nothing to show.
    ErrorNoData(PipelineError),
    /// The deadline passed before the pipeline answered.
    Timeout,
    /// The request was rejected before the pipeline was invoked.
    MethodNotAllowed,
}

impl InvocationOutcome {
    /// Classify a pipeline result.
    pub fn from_result(result: PipelineResult) -> Self {
        match result {
            Ok(response) => InvocationOutcome::Success(response),
            Err(failure) => match failure.partial {
                Some(partial) if partial.has_data() => {
                    InvocationOutcome::ErrorWithPartialData(partial, failure.error)
                }
                _ => InvocationOutcome::ErrorNoData(failure.error),
            },
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationOutcome::Success(_) => "success",
            InvocationOutcome::ErrorWithPartialData(..) => "partial",
            InvocationOutcome::ErrorNoData(_) => "error",
            InvocationOutcome::Timeout => "timeout",
            InvocationOutcome::MethodNotAllowed => "method_not_allowed",
        }
    }
}

enum Delivery {
    Delivered(PipelineResult),
    Lost,
    Expired,
}

/// Run `pipeline` inside `scope` and race it against the scope's deadline.
///
/// On expiry the scope is cancelled so the backend can wind down, and
/// `Timeout` is returned without waiting for it.
pub async fn invoke(
    pipeline: Arc<dyn Pipeline>,
    scope: &DeadlineScope,
    request: PipelineRequest,
) -> InvocationOutcome {
    let (tx, rx) = oneshot::channel();
    let task_scope = scope.clone();

    tokio::spawn(async move {
        let result = pipeline.run(task_scope, request).await;
        if tx.send(result).is_err() {
            tracing::debug!("Pipeline finished after the handler stopped waiting; result dropped");
        }
    });

    match wait_for(rx, scope.deadline()).await {
        Delivery::Delivered(result) => InvocationOutcome::from_result(result),
        Delivery::Lost => InvocationOutcome::ErrorNoData(PipelineError::Aborted),
        Delivery::Expired => {
            scope.cancel();
            InvocationOutcome::Timeout
        }
    }
}

/// Wait for the slot, bounded by `deadline` when there is one.
///
/// `timeout_at` polls the slot before the timer, so a value that is already
/// there is returned even when the deadline has also passed.
async fn wait_for(rx: oneshot::Receiver<PipelineResult>, deadline: Option<Instant>) -> Delivery {
    let received = match deadline {
        None => rx.await,
        Some(deadline) => match tokio::time::timeout_at(deadline, rx).await {
            Ok(received) => received,
            Err(_) => return Delivery::Expired,
        },
    };

    match received {
        Ok(result) => Delivery::Delivered(result),
        Err(_) => Delivery::Lost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{NoopPipeline, PipelineFailure};
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn delayed(delay: Duration, result: fn() -> PipelineResult) -> Arc<dyn Pipeline> {
        Arc::new(move |_scope: DeadlineScope, _request: PipelineRequest| async move {
            tokio::time::sleep(delay).await;
            result()
        })
    }

    #[test]
    fn test_classification() {
        let ok = InvocationOutcome::from_result(Ok(Some(PipelineResponse::complete(data(json!({"a": 1}))))));
        assert!(matches!(ok, InvocationOutcome::Success(Some(r)) if r.is_complete));

        assert!(matches!(InvocationOutcome::from_result(Ok(None)), InvocationOutcome::Success(None)));

        let partial = PipelineFailure::new(PipelineError::msg("boom"))
            .with_partial(PipelineResponse::incomplete(data(json!({"foo": "bar"}))));
        let outcome = InvocationOutcome::from_result(Err(partial));
        assert!(matches!(outcome, InvocationOutcome::ErrorWithPartialData(r, _) if r.data["foo"] == "bar"));

        let no_data = InvocationOutcome::from_result(Err(PipelineError::msg("boom").into()));
        assert!(matches!(no_data, InvocationOutcome::ErrorNoData(e) if e.to_string() == "boom"));

        // An empty partial payload is no data at all.
        let empty = PipelineFailure::new(PipelineError::msg("boom")).with_partial(PipelineResponse::default());
        assert!(matches!(InvocationOutcome::from_result(Err(empty)), InvocationOutcome::ErrorNoData(_)));
    }

    #[tokio::test]
    async fn test_fast_pipeline_wins() {
        let scope = DeadlineScope::from_timeout(Duration::from_millis(500));
        let outcome = invoke(Arc::new(NoopPipeline), &scope, PipelineRequest::default()).await;
        assert!(matches!(outcome, InvocationOutcome::Success(None)));
        assert!(!scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_zero_timeout_waits_for_slow_pipeline() {
        let pipeline = delayed(Duration::from_millis(100), || {
            Ok(Some(PipelineResponse::incomplete(data(json!({"foo": "bar"})))))
        });
        let scope = DeadlineScope::from_timeout(Duration::ZERO);
        let outcome = invoke(pipeline, &scope, PipelineRequest::default()).await;
        assert!(matches!(outcome, InvocationOutcome::Success(Some(r)) if !r.is_complete));
    }

    #[tokio::test]
    async fn test_deadline_expires_before_pipeline() {
        let pipeline = delayed(Duration::from_millis(300), || Ok(None));
        let scope = DeadlineScope::from_timeout(Duration::from_millis(20));

        let start = std::time::Instant::now();
        let outcome = invoke(pipeline, &scope, PipelineRequest::default()).await;

        assert!(matches!(outcome, InvocationOutcome::Timeout));
        assert!(start.elapsed() < Duration::from_millis(200));
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_late_result_is_dropped_without_panic() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let pipeline: Arc<dyn Pipeline> = Arc::new(move |_scope: DeadlineScope, _request: PipelineRequest| {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<Option<PipelineResponse>, PipelineFailure>(None)
            }
        });

        let scope = DeadlineScope::from_timeout(Duration::from_millis(5));
        let outcome = invoke(pipeline, &scope, PipelineRequest::default()).await;
        assert!(matches!(outcome, InvocationOutcome::Timeout));

        // The backend task keeps running in the background and finishes on its own.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_backend_observes_cancellation_on_timeout() {
        let observed = Arc::new(AtomicBool::new(false));
        let flag = observed.clone();
        let pipeline: Arc<dyn Pipeline> = Arc::new(move |scope: DeadlineScope, _request: PipelineRequest| {
            let flag = flag.clone();
            async move {
                scope.done().await;
                flag.store(scope.is_cancelled(), Ordering::SeqCst);
                Err::<Option<PipelineResponse>, _>(PipelineFailure::new(PipelineError::Cancelled))
            }
        });

        let scope = DeadlineScope::from_timeout(Duration::from_millis(10));
        let outcome = invoke(pipeline, &scope, PipelineRequest::default()).await;
        assert!(matches!(outcome, InvocationOutcome::Timeout));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_delivered_result_beats_elapsed_deadline() {
        let (tx, rx) = oneshot::channel();
        tx.send(Ok(None)).unwrap();

        let past = Instant::now() - Duration::from_millis(10);
        assert!(matches!(wait_for(rx, Some(past)).await, Delivery::Delivered(Ok(None))));
    }

    #[tokio::test]
    async fn test_panicking_pipeline_is_an_error() {
        let pipeline: Arc<dyn Pipeline> = Arc::new(|_scope: DeadlineScope, _request: PipelineRequest| async move {
            if true {
                panic!("backend blew up");
            }
            Ok::<Option<PipelineResponse>, PipelineFailure>(None)
        });
        let scope = DeadlineScope::unbounded();
        let outcome = invoke(pipeline, &scope, PipelineRequest::default()).await;
        assert!(matches!(outcome, InvocationOutcome::ErrorNoData(PipelineError::Aborted)));
    }
}
