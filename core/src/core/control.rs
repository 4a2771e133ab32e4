// codcall/src/core/control.rs

//! Flow signals returned by step handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. Remaining handlers of the current step and all later steps
  /// are skipped. Used for business no-ops (duplicate order, not COD, ignored
  /// report), never for failures.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}
