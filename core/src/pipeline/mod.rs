pub mod definition;
pub mod execution;

pub use definition::Pipeline;
