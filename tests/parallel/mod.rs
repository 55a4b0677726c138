use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Barrier;

use hookrs::{BoxError, DispatchError, Dispatcher, Event, EventHandler, EventResponse, HandlerError, HandlerRegistry};

use crate::handlers::{
    registry_with, test_event, Calls, FailureRecorder, SuccessRecorder, TestEventHandler, TestResponse,
};

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..25))
}

#[tokio::test]
async fn no_handlers_returns_not_found_test() {
    let success: SuccessRecorder = SuccessRecorder::default();
    let failure: FailureRecorder = FailureRecorder::default();

    let mut registry: HandlerRegistry = HandlerRegistry::new();
    registry
        .set_success_handler("a", success.clone())
        .set_failure_handler("a", failure.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    let result: Result<(), DispatchError> = dispatcher.dispatch_parallel(&test_event("a")).await;

    assert!(matches!(result, Err(DispatchError::NotFound { .. })));
    assert!(success.invocations().is_empty());
    assert!(failure.invocations().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_responses_reach_success_handler_test() {
    let calls: Calls = Calls::default();
    let success: SuccessRecorder = SuccessRecorder::default();

    let mut registry: HandlerRegistry = registry_with(
        "c",
        vec![
            TestEventHandler::ok("h1", &calls).with_delay(jitter()),
            TestEventHandler::ok("h2", &calls).with_delay(jitter()),
            TestEventHandler::ok("h3", &calls).with_delay(jitter()),
        ],
    );
    registry.set_success_handler("c", success.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    dispatcher.dispatch_parallel(&test_event("c")).await.unwrap();

    let invocations: Vec<Vec<&'static str>> = success.invocations();
    assert_eq!(invocations.len(), 1);

    let mut responses: Vec<&'static str> = invocations[0].clone();
    responses.sort_unstable();
    assert_eq!(responses, vec!["h1", "h2", "h3"]);
    assert_eq!(calls.sorted(), vec!["h1", "h2", "h3"]);
}

#[tokio::test]
async fn without_success_handler_returns_ok_test() {
    let calls: Calls = Calls::default();
    let registry: HandlerRegistry = registry_with(
        "a",
        vec![TestEventHandler::ok("h1", &calls), TestEventHandler::ok("h2", &calls)],
    );

    let dispatcher: Dispatcher = Dispatcher::new(registry);

    assert!(dispatcher.dispatch_parallel(&test_event("a")).await.is_ok());
    assert_eq!(calls.sorted(), vec!["h1", "h2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_are_aggregated_test() {
    let calls: Calls = Calls::default();
    let success: SuccessRecorder = SuccessRecorder::default();

    let mut registry: HandlerRegistry = registry_with(
        "d",
        vec![
            TestEventHandler::ok("h1", &calls).with_delay(jitter()),
            TestEventHandler::failing("h2", "second failed", &calls).with_delay(jitter()),
            TestEventHandler::ok("h3", &calls).with_delay(jitter()),
            TestEventHandler::failing("h4", "fourth failed", &calls).with_delay(jitter()),
            TestEventHandler::ok("h5", &calls).with_delay(jitter()),
        ],
    );
    registry.set_success_handler("d", success.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    let error: DispatchError = dispatcher.dispatch_parallel(&test_event("d")).await.unwrap_err();

    let aggregate = match error {
        DispatchError::Aggregate(aggregate) => aggregate,
        other => panic!("unexpected error: {}", other),
    };
    assert_eq!(aggregate.len(), 2);

    let mut sources: Vec<&str> = aggregate.iter().map(HandlerError::source_name).collect();
    sources.sort_unstable();
    assert_eq!(
        sources,
        vec!["dispatch_parallel.handlers[1]", "dispatch_parallel.handlers[3]"]
    );

    let mut causes: Vec<String> = aggregate.iter().map(|error| error.cause().to_string()).collect();
    causes.sort_unstable();
    assert_eq!(causes, vec!["fourth failed", "second failed"]);

    // A failure does not stop the other handlers.
    assert_eq!(calls.sorted(), vec!["h1", "h2", "h3", "h4", "h5"]);
    assert!(success.invocations().is_empty());
}

#[tokio::test]
async fn failures_are_absorbed_by_failure_handler_test() {
    let calls: Calls = Calls::default();
    let success: SuccessRecorder = SuccessRecorder::default();
    let failure: FailureRecorder = FailureRecorder::default();

    let mut registry: HandlerRegistry = registry_with(
        "d",
        vec![
            TestEventHandler::failing("h1", "first failed", &calls),
            TestEventHandler::ok("h2", &calls),
            TestEventHandler::failing("h3", "third failed", &calls),
        ],
    );
    registry
        .set_success_handler("d", success.clone())
        .set_failure_handler("d", failure.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);

    assert!(dispatcher.dispatch_parallel(&test_event("d")).await.is_ok());

    let failures = failure.invocations();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event_id, "evt_test");
    assert_eq!(failures[0].aggregated, Some(2));
    assert!(failures[0].message.starts_with("2 handler(s) failed: "));
    assert!(failures[0].message.contains(" - "));
    assert!(failures[0].message.contains("first failed"));
    assert!(failures[0].message.contains("third failed"));
    assert!(success.invocations().is_empty());
}

#[tokio::test]
async fn failure_handler_error_is_returned_test() {
    let calls: Calls = Calls::default();
    let failure: FailureRecorder = FailureRecorder {
        give_up_with: Some("could not notify"),
        ..FailureRecorder::default()
    };

    let mut registry: HandlerRegistry = registry_with("a", vec![TestEventHandler::failing("h1", "boom", &calls)]);
    registry.set_failure_handler("a", failure.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    let error: DispatchError = dispatcher.dispatch_parallel(&test_event("a")).await.unwrap_err();

    assert!(matches!(error, DispatchError::Callback { callback: "failure_recorder", .. }));
    assert_eq!(error.to_string(), "could not notify");
    assert_eq!(failure.invocations()[0].aggregated, Some(1));
}

#[tokio::test]
async fn panicking_handler_yields_incomplete_result_test() {
    let calls: Calls = Calls::default();
    let success: SuccessRecorder = SuccessRecorder::default();

    let mut registry: HandlerRegistry = registry_with(
        "e",
        vec![
            TestEventHandler::ok("h1", &calls),
            TestEventHandler::panicking("h2", &calls),
        ],
    );
    registry.set_success_handler("e", success.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    let error: DispatchError = dispatcher.dispatch_parallel(&test_event("e")).await.unwrap_err();

    match error {
        DispatchError::IncompleteResult {
            event_id,
            expected,
            received,
        } => {
            assert_eq!(event_id, "evt_test");
            assert_eq!(expected, 2);
            assert_eq!(received, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(success.invocations().is_empty());
}

#[tokio::test]
async fn incomplete_result_goes_to_failure_handler_test() {
    let calls: Calls = Calls::default();
    let failure: FailureRecorder = FailureRecorder::default();

    let mut registry: HandlerRegistry = registry_with("e", vec![TestEventHandler::panicking("h1", &calls)]);
    registry.set_failure_handler("e", failure.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);

    assert!(dispatcher.dispatch_parallel(&test_event("e")).await.is_ok());

    let failures = failure.invocations();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].incomplete);
    assert_eq!(failures[0].aggregated, None);
}

#[tokio::test]
async fn same_handler_registered_twice_runs_twice_test() {
    let calls: Calls = Calls::default();
    let success: SuccessRecorder = SuccessRecorder::default();
    let h1: Arc<dyn EventHandler> = Arc::new(TestEventHandler::ok("h1", &calls));

    let mut registry: HandlerRegistry = HandlerRegistry::new();
    registry
        .register("a", vec![h1.clone(), h1])
        .set_success_handler("a", success.clone());

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    dispatcher.dispatch_parallel(&test_event("a")).await.unwrap();

    assert_eq!(calls.snapshot(), vec!["h1", "h1"]);
    assert_eq!(success.invocations(), vec![vec!["h1", "h1"]]);
}

/// Completes only once `parties` handlers are running at the same time.
struct RendezvousHandler {
    barrier: Arc<Barrier>,
}

#[async_trait::async_trait]
impl EventHandler for RendezvousHandler {
    async fn handle(&self, event: &Event) -> Result<Box<dyn EventResponse>, BoxError> {
        self.barrier.wait().await;
        Ok(Box::new(TestResponse {
            handler: "rendezvous",
            event_id: event.id.clone(),
        }))
    }
}

#[tokio::test]
async fn handlers_run_concurrently_test() {
    let barrier: Arc<Barrier> = Arc::new(Barrier::new(3));

    let mut registry: HandlerRegistry = HandlerRegistry::new();
    for _ in 0..3 {
        registry.register_handler(
            "f",
            RendezvousHandler {
                barrier: barrier.clone(),
            },
        );
    }

    let dispatcher: Dispatcher = Dispatcher::new(registry);
    let event: Event = test_event("f");

    let result = tokio::time::timeout(Duration::from_secs(5), dispatcher.dispatch_parallel(&event)).await;

    assert!(matches!(result, Ok(Ok(()))));
}
