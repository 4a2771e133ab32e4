// codcall/src/core/context.rs

//! The boxed handler type stored by a `Pipeline`.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler: takes a clone of the run's `ContextData<TData>` and resolves
/// to a flow signal or the pipeline's error type.
///
/// Handlers lock the context to read inputs and write results, and must release
/// every guard before awaiting storage or provider I/O.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
