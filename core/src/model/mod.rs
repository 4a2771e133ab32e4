//! Records persisted by the store and the order state machine.

pub mod call;
pub mod order;
pub mod status;
pub mod store;

pub use call::{CallAttempt, CallCompletion, CallFilter, NewCallAttempt};
pub use order::{InsertOutcome, NewOrder, Order, OrderFilter, OrderGuard, OrderPatch};
pub use status::{CallResult, OrderEvent, OrderStatus};
pub use store::{NewStore, Store, DEFAULT_COD_LABEL};
