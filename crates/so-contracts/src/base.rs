//! Base contract system

use so_core::error::ValidationErrors;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Validation applied to a request before it is written
pub trait Contract<T>: Send + Sync {
    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;

    /// Check if an attribute is writable
    fn is_writable(&self, _attribute: &str) -> bool {
        true
    }
}

/// Run a `validator` derive and convert its errors
pub fn validate_derived<T: validator::Validate>(entity: &T) -> ValidationResult {
    entity.validate().map_err(ValidationErrors::from)
}
