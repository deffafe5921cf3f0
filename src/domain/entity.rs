//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Capacity violations, always shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CapacityError {
    GridFull,
    MinRows,
    MaxRows { max: usize },
    MinColumns,
    MaxColumns { max: usize },
    LastGrid,
}

impl std::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityError::GridFull => write!(f, "No empty slots on this shelf"),
            CapacityError::MinRows => write!(f, "Shelves must have at least one row"),
            CapacityError::MaxRows { max } => write!(f, "Shelves can have at most {} rows", max),
            CapacityError::MinColumns => write!(f, "Cannot have less than 1 column"),
            CapacityError::MaxColumns { max } => {
                write!(f, "Shelves can have at most {} columns", max)
            }
            CapacityError::LastGrid => write!(f, "You need to keep at least one shelf"),
        }
    }
}

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainError {
    Capacity(CapacityError),
    NotFound(String),
    InvalidInput(String),
    Conflict(String),
    Storage(String),
    Internal(String),
}

impl DomainError {
    /// Whether the error is reported to the user (as opposed to only logged)
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DomainError::Capacity(_) | DomainError::InvalidInput(_) | DomainError::Conflict(_)
        )
    }
}

impl From<CapacityError> for DomainError {
    fn from(err: CapacityError) -> Self {
        DomainError::Capacity(err)
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::Capacity(err) => write!(f, "{}", err),
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Storage(msg) => write!(f, "Storage error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_messages() {
        assert_eq!(
            DomainError::from(CapacityError::GridFull).to_string(),
            "No empty slots on this shelf"
        );
        assert_eq!(
            CapacityError::MinColumns.to_string(),
            "Cannot have less than 1 column"
        );
        assert_eq!(
            CapacityError::MaxRows { max: 5 }.to_string(),
            "Shelves can have at most 5 rows"
        );
    }

    #[test]
    fn test_user_facing_split() {
        assert!(DomainError::Capacity(CapacityError::MinRows).is_user_facing());
        assert!(DomainError::Conflict("slot".into()).is_user_facing());
        assert!(!DomainError::NotFound("Item 3".into()).is_user_facing());
        assert!(!DomainError::Storage("quota".into()).is_user_facing());
    }
}
