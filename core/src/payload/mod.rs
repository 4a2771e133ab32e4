//! Wire formats exchanged with the upstream shop and the voice provider.

pub mod shopify;
pub mod vapi;

pub use shopify::{RawAddress, RawCustomer, RawLineItem, RawOrder};
pub use vapi::{CallRequest, CallVariables, CompletionReport, PlacedCall, ToolCall, ToolReply};
