// tests/error_handling_tests.rs
mod common;
use codcall::{CallError, ContextData, FlowError, OrderEvent, OrderStatus, Pipeline, PipelineControl, Registry};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 1;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing_pipeline = Pipeline::<TestContext, FlowError>::new(&[("fail_task", false, None)]);
  failing_pipeline.on_root("fail_task", |_ctx| {
    Box::pin(async move { Err(FlowError::Internal("Intentional FlowError".to_string())) })
  });
  match failing_pipeline.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "Intentional FlowError"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_anyhow_error_converts_to_handler_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("io", false, None)]);
  pipeline.on_root("io", |_ctx| {
    Box::pin(async move { Err::<PipelineControl, _>(anyhow::anyhow!("disk on fire")) })
  });

  match pipeline.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::HandlerError { source }) => assert_eq!(source.to_string(), "disk on fire"),
    other => panic!("Expected FlowError::HandlerError, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_registry_runs_pipeline_for_context_type() {
  setup_tracing();
  let registry = Registry::<TestError>::new();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("only", false, None)]);
  pipeline.on_root("only", create_simple_handler("only", "registered"));
  registry.register_pipeline(pipeline);

  assert!(registry.is_registered::<TestContext>());
  let ctx = ContextData::new(TestContext::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "registered");
}

#[tokio::test]
#[serial]
async fn test_registry_without_pipeline_reports_configuration_error() {
  setup_tracing();
  let registry = Registry::<FlowError>::new();
  assert!(!registry.is_registered::<TestContext>());

  match registry.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::ConfigurationError { message, .. }) => assert!(message.contains("No pipeline registered")),
    other => panic!("Expected FlowError::ConfigurationError, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_registry_converts_handler_errors_into_app_error() {
  setup_tracing();
  let registry = Registry::<CallError>::new();
  // A required step without handlers surfaces as FlowError, wrapped into CallError::Flow.
  let pipeline = Pipeline::<TestContext, FlowError>::new(&[("empty", false, None)]);
  registry.register_pipeline(pipeline);

  match registry.run(ContextData::new(TestContext::default())).await {
    Err(CallError::Flow {
      source: FlowError::HandlerMissing { step_name },
    }) => assert_eq!(step_name, "empty"),
    other => panic!("Expected CallError::Flow(HandlerMissing), got {:?}", other),
  }
}

#[test]
fn test_invalid_transition_is_reported_with_context() {
  let err = OrderStatus::Confirmed.apply(OrderEvent::CallPlaced).unwrap_err();
  match &err {
    CallError::InvalidTransition { from, event } => {
      assert_eq!(*from, OrderStatus::Confirmed);
      assert_eq!(*event, OrderEvent::CallPlaced);
    }
    other => panic!("Expected InvalidTransition, got {:?}", other),
  }
  assert_eq!(
    err.to_string(),
    "Transition 'call_placed' is not allowed from status 'confirmado'"
  );
}

#[test]
fn test_call_error_helpers_name_the_provider() {
  assert_eq!(
    CallError::voice("timeout").to_string(),
    "voice provider error: timeout"
  );
  assert_eq!(
    CallError::commerce("HTTP 500").to_string(),
    "commerce provider error: HTTP 500"
  );
  assert!(matches!(
    CallError::persistence(anyhow::anyhow!("pool closed")),
    CallError::Persistence(_)
  ));
}
