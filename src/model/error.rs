use thiserror::Error;

// Validation errors for client supplied todo fields
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Todo name is required and must be a string.")]
    NameRequired,
    #[error("Due date must be a valid date.")]
    InvalidDueDate,
    #[error("Completion date must be a valid date.")]
    InvalidCompletionDate,
}
