//! Contracts for the generic per-collection endpoints

use serde_json::Value;
use so_core::error::ValidationErrors;
use so_models::{Collection, RowPatch, UnitOfMeasure};
use validator::Validate;

use crate::base::{validate_derived, Contract, ValidationResult};

/// Columns that must stay non-blank once a row exists
pub fn required_columns(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Team => &["name", "position"],
        Collection::Materials => &["name", "unity_of_measure"],
        Collection::Equipments | Collection::Epi | Collection::Procedures => &["name", "description"],
        Collection::Services => &["type", "ps"],
        Collection::Observations => &["description"],
        _ => &[],
    }
}

/// Creation contract for any typed `New*` payload
///
/// Required fields are declared on the payload with `validator` attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateRowContract;

impl<T: Validate> Contract<T> for CreateRowContract {
    fn validate(&self, entity: &T) -> ValidationResult {
        validate_derived(entity)
    }
}

/// Contract for `{ id, updatedData }` partial row updates
#[derive(Debug, Clone, Copy)]
pub struct PatchRowContract {
    collection: Collection,
}

impl PatchRowContract {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    fn validate_value(&self, column: &str, value: &Value, errors: &mut ValidationErrors) {
        let text = value.as_str().map(str::trim);

        if required_columns(self.collection).contains(&column)
            && text.map_or(value.is_null(), str::is_empty)
        {
            errors.add(column, "can't be blank");
            return;
        }

        match column {
            "unity_of_measure" => {
                if text.and_then(|t| t.parse::<UnitOfMeasure>().ok()).is_none() {
                    errors.add(column, "is not a known unit of measure");
                }
            }
            "estimated_time" => {
                if !value.is_null() && !value.as_i64().is_some_and(|n| n >= 0) {
                    errors.add(column, "must be a non-negative integer");
                }
            }
            _ => {}
        }
    }
}

impl Contract<RowPatch> for PatchRowContract {
    fn validate(&self, entity: &RowPatch) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        for (column, value) in &entity.data {
            if !self.is_writable(column) {
                errors.add(column.as_str(), "is not a writable field");
                continue;
            }
            self.validate_value(column, value, &mut errors);
        }

        errors.into_result()
    }

    fn is_writable(&self, attribute: &str) -> bool {
        self.collection.is_writable(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use so_models::{NewEquipment, NewMaterial};

    fn patch(data: Value) -> RowPatch {
        RowPatch::from_body(json!({ "id": 1, "updatedData": data })).unwrap()
    }

    #[test]
    fn test_create_uses_payload_rules() {
        let material = NewMaterial {
            name: "Cabo".to_string(),
            unity_of_measure: "M".to_string(),
        };
        assert!(CreateRowContract.validate(&material).is_ok());

        let equipment = NewEquipment::default();
        let errors = CreateRowContract.validate(&equipment).unwrap_err();
        assert!(errors.has_error("name"));
        assert!(errors.has_error("description"));
    }

    #[test]
    fn test_patch_rejects_unknown_and_readonly_columns() {
        let contract = PatchRowContract::new(Collection::Team);
        let errors = contract
            .validate(&patch(json!({ "id": 4, "nickname": "Zé", "primary_contact": "1199" })))
            .unwrap_err();

        assert_eq!(
            errors.full_messages(),
            vec![
                "id is not a writable field".to_string(),
                "nickname is not a writable field".to_string(),
            ]
        );
    }

    #[test]
    fn test_patch_keeps_required_columns_filled() {
        let contract = PatchRowContract::new(Collection::Materials);
        assert!(contract.validate(&patch(json!({ "name": " " }))).is_err());
        assert!(contract.validate(&patch(json!({ "unity_of_measure": "YD" }))).is_err());
        assert!(contract.validate(&patch(json!({ "unity_of_measure": "KG" }))).is_ok());
    }

    #[test]
    fn test_patch_estimated_time() {
        let contract = PatchRowContract::new(Collection::Procedures);
        assert!(contract.validate(&patch(json!({ "estimated_time": 45 }))).is_ok());
        assert!(contract.validate(&patch(json!({ "estimated_time": "soon" }))).is_err());
    }
}
