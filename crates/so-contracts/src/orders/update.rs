//! Update contract for service orders

use so_core::error::ValidationErrors;
use so_models::{Collection, OrderChanges};

use super::base::OrderBaseContract;
use crate::base::{Contract, ValidationResult};

/// Contract for scalar and association-replacing order updates
///
/// Only fields present in the request are checked; `end_date >= start_date`
/// is enforced when both are set. The order composer fills in the stored
/// date when a request carries only one.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateOrderContract {
    base: OrderBaseContract,
}

impl UpdateOrderContract {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Contract<OrderChanges> for UpdateOrderContract {
    fn validate(&self, entity: &OrderChanges) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if entity.id < 1 {
            errors.add("id", "must be a positive integer");
        }
        self.base.validate_dates(&entity.fields, &mut errors);
        self.base.validate_associations(&entity.associations, &mut errors);

        errors.into_result()
    }

    fn is_writable(&self, attribute: &str) -> bool {
        Collection::Services.is_writable(attribute)
    }
}
