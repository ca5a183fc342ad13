//! Service errors

use serde::Serialize;
use serde_json::Value;
use so_core::{Id, ValidationErrors};
use so_db::{Row, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("{group} could not be saved: {message}")]
    AssociationFailed { group: &'static str, message: String },

    #[error(transparent)]
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { collection, id } => Self::NotFound {
                entity: collection.label(),
                id,
            },
            other => Self::Store(other),
        }
    }
}

/// Serialize a payload into a store row
pub(crate) fn to_row<T: Serialize>(value: &T) -> ServiceResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StoreError::Decode(format!("expected an object, got {}", other)).into()),
        Err(e) => Err(StoreError::Decode(e.to_string()).into()),
    }
}

/// Deserialize a store row into a typed record
pub(crate) fn from_row<T: for<'de> serde::Deserialize<'de>>(row: Row) -> ServiceResult<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| StoreError::Decode(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use so_models::Collection;

    #[test]
    fn test_store_not_found_keeps_its_identity() {
        let error: ServiceError = StoreError::not_found(Collection::Epi, 4).into();
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "PPE item 4 not found");
    }

    #[test]
    fn test_other_store_errors_pass_through() {
        let error: ServiceError = StoreError::Constraint("fk".to_string()).into();
        assert!(matches!(error, ServiceError::Store(_)));
        assert_eq!(error.to_string(), "Constraint violation: fk");
    }
}
