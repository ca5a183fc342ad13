//! Create contract for service orders

use so_core::error::ValidationErrors;
use so_models::NewOrder;

use super::base::OrderBaseContract;
use crate::base::{Contract, ValidationResult};

/// Contract for the composite order creation request
///
/// An order is only valid with at least one procedure, so an empty or missing
/// procedure list is rejected here before anything is written.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateOrderContract {
    base: OrderBaseContract,
}

impl CreateOrderContract {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Contract<NewOrder> for CreateOrderContract {
    fn validate(&self, entity: &NewOrder) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        self.base.validate_identity(&entity.fields, &mut errors);
        self.base.validate_dates(&entity.fields, &mut errors);
        self.base.validate_associations(&entity.associations, &mut errors);

        let has_procedures = entity
            .associations
            .procedures
            .as_ref()
            .is_some_and(|p| !p.is_empty());
        if !has_procedures {
            errors.add("procedures", "must include at least one procedure");
        }

        errors.into_result()
    }

    fn is_writable(&self, attribute: &str) -> bool {
        matches!(
            attribute,
            "type" | "ps" | "start_date" | "end_date" | "responsible" | "status"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(body: serde_json::Value) -> NewOrder {
        NewOrder::from_body(body).unwrap()
    }

    #[test]
    fn test_valid_order() {
        let entity = order(json!({
            "service": { "type": "Troca de válvula", "ps": "SF-06",
                         "start_date": "2024-01-10", "end_date": "2024-01-12" },
            "procedures": [{ "id_procedure": 5, "execution_order": 1 }]
        }));
        assert!(CreateOrderContract::new().validate(&entity).is_ok());
    }

    #[test]
    fn test_missing_identity_and_procedures() {
        let entity = order(json!({ "service": { "responsible": "A. Silva" } }));
        let errors = CreateOrderContract::new().validate(&entity).unwrap_err();

        assert_eq!(
            errors.full_messages(),
            vec![
                "procedures must include at least one procedure".to_string(),
                "ps can't be blank".to_string(),
                "type can't be blank".to_string(),
            ]
        );
    }

    #[test]
    fn test_end_before_start() {
        let entity = order(json!({
            "service": { "type": "Inspeção", "ps": "SF-01",
                         "start_date": "2024-01-12", "end_date": "2024-01-10" },
            "procedures": [{ "id_procedure": 1 }]
        }));
        let errors = CreateOrderContract::new().validate(&entity).unwrap_err();
        assert!(errors.has_error("end_date"));
        assert!(!errors.has_error("start_date"));
    }

    #[test]
    fn test_invalid_date_and_negative_quantity() {
        let entity = order(json!({
            "service": { "type": "Inspeção", "ps": "SF-01", "start_date": "12/01/2024" },
            "procedures": [{ "id_procedure": 1 }],
            "materials": [{ "material_id": 2, "quantity": -3 }]
        }));
        let errors = CreateOrderContract::new().validate(&entity).unwrap_err();
        assert_eq!(errors.get("start_date").unwrap()[0], "is not a valid date");
        assert_eq!(errors.get("materials").unwrap()[0], "quantity must be positive");
    }

    #[test]
    fn test_writable_attributes() {
        let contract = CreateOrderContract::new();
        assert!(contract.is_writable("status"));
        assert!(!contract.is_writable("created_at"));
    }
}
