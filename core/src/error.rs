// codcall/src/error.rs
use crate::model::{OrderEvent, OrderStatus};
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the pipeline engine itself.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Type mismatch during context dispatch (expected {expected_type}, step: '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Error in handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal engine error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;

/// Errors surfaced by the call-confirmation operations.
///
/// Business no-ops (duplicate order, non-COD order, ignored report, missing
/// voice configuration) are not errors; they are reported in the operation's
/// return value.
#[derive(Debug, Error)]
pub enum CallError {
  /// A required field is missing or malformed. Nothing was mutated.
  #[error("Validation Error: {0}")]
  Validation(String),

  /// No matching call attempt / order / store. Nothing was mutated.
  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// The voice or commerce provider answered with a failure or timed out.
  #[error("{provider} provider error: {message}")]
  Provider { provider: &'static str, message: String },

  #[error("Persistence Error: {0}")]
  Persistence(#[source] AnyhowError),

  #[error("Transition '{event}' is not allowed from status '{from}'")]
  InvalidTransition { from: OrderStatus, event: OrderEvent },

  #[error("Workflow Error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Error: {0}")]
  Internal(String),
}

impl CallError {
  pub fn persistence(err: impl Into<AnyhowError>) -> Self {
    CallError::Persistence(err.into())
  }

  pub fn voice(message: impl Into<String>) -> Self {
    CallError::Provider {
      provider: "voice",
      message: message.into(),
    }
  }

  pub fn commerce(message: impl Into<String>) -> Self {
    CallError::Provider {
      provider: "commerce",
      message: message.into(),
    }
  }
}

pub type Result<T, E = CallError> = std::result::Result<T, E>;
