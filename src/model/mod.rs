pub mod correlation_id;
pub mod error;
pub mod field;
pub mod todo;

pub use correlation_id::CorrelationId;
pub use error::ModelError;
pub use todo::{Todo, TodoId, TodoInput, ValidTodo};
