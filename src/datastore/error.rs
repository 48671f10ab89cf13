use thiserror::*;

use crate::model::TodoId;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum DataStoreError {
    #[error("todo {0} not found")]
    NotFound(TodoId),
}
