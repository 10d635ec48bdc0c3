use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Navigation item not found: {0}")]
    NotFound(Uuid),

    #[error("Item {id} cannot be placed under {parent_id}: it would become its own ancestor")]
    Cycle { id: Uuid, parent_id: Uuid },

    #[error("Navigation changed concurrently: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),
}

impl NavError {
    pub fn validation(message: impl Into<String>) -> Self {
        NavError::Validation(message.into())
    }
}

impl From<DatabaseError> for NavError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => NavError::Conflict(msg),
            other => NavError::Storage(other),
        }
    }
}
