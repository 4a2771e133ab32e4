// src/lib.rs

//! codcall: order lifecycle and call scheduling for cash-on-delivery shops.
//!
//! Upstream COD orders are ingested and scheduled for a confirmation call
//! inside business hours. A dispatcher places outbound calls through a voice
//! provider, and call reports and in-call decisions move each order through an
//! explicit state machine. The crate provides:
//!  - A small async step-pipeline engine (named steps with before/on/after
//!    handlers, optional steps, skip conditions, early stop) and a type-keyed
//!    registry that runs the pipeline registered for a context type.
//!  - The domain model, pure scheduling and classification rules, and the
//!    order state machine.
//!  - Ports for storage, the voice provider and the commerce platform, plus
//!    an in-memory storage implementation.
//!  - The operations themselves, behind [`CallFlow`].

pub mod core;
pub mod error;
pub mod memory;
pub mod model;
pub mod payload;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod rules;
pub mod settings;
pub mod workflows;

// --- Re-exports for the Public API ---

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;
pub use crate::registry::Registry;

pub use crate::error::{CallError, FlowError, FlowResult, Result};

pub use crate::memory::MemoryStore;
pub use crate::model::{CallResult, OrderEvent, OrderStatus};
pub use crate::ports::{CommerceProvider, Storage, VoiceProvider};
pub use crate::settings::Settings;
pub use crate::workflows::CallFlow;
