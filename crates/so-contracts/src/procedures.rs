//! Procedure creation contract

use so_models::NewProcedure;

use crate::base::{validate_derived, Contract, ValidationResult};

/// Name and description are required; the bill of materials needs positive quantities
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcedureContract;

impl Contract<NewProcedure> for ProcedureContract {
    fn validate(&self, entity: &NewProcedure) -> ValidationResult {
        let mut errors = match validate_derived(entity) {
            Ok(()) => Default::default(),
            Err(errors) => errors,
        };

        if entity.materials.iter().any(|m| m.quantity < 1) {
            errors.add("materials", "quantity must be positive");
        }

        errors.into_result()
    }
}
