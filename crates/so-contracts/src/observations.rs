//! Observation contract

use so_models::NewObservation;

use crate::base::{validate_derived, Contract, ValidationResult};

#[derive(Debug, Default, Clone, Copy)]
pub struct ObservationContract;

impl Contract<NewObservation> for ObservationContract {
    fn validate(&self, entity: &NewObservation) -> ValidationResult {
        let mut errors = match validate_derived(entity) {
            Ok(()) => Default::default(),
            Err(errors) => errors,
        };
        if entity.service_id < 1 {
            errors.add("service_id", "must be a positive integer");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_order_and_text() {
        let observation: NewObservation =
            serde_json::from_value(serde_json::json!({ "service_id": 0, "description": "" }))
                .unwrap();
        let errors = ObservationContract.validate(&observation).unwrap_err();
        assert!(errors.has_error("service_id"));
        assert!(errors.has_error("description"));
    }
}
