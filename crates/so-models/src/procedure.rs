//! Procedure model and its bill of materials
//!
//! Tables: procedures, procedure_materials

use crate::catalog::{not_blank, Material};
use crate::links::MaterialEntry;
use serde::{Deserialize, Serialize};
use so_core::traits::Id;
use validator::Validate;

/// Procedure entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,

    /// Estimated duration in minutes
    pub estimated_time: Option<i64>,

    /// Service standard the procedure belongs to
    pub ps: Option<String>,
}

/// Procedure creation payload, optionally with its bill of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewProcedure {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,

    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub estimated_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<String>,

    #[serde(default, skip_serializing)]
    pub materials: Vec<MaterialEntry>,
}

/// One material of a procedure's bill, with the material record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    pub quantity: i64,
    pub material: Material,
}

/// Procedure with its bill of materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureWithMaterials {
    #[serde(flatten)]
    pub procedure: Procedure,
    pub materials: Vec<BomItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_procedure_payload() {
        let payload: NewProcedure = serde_json::from_value(serde_json::json!({
            "name": "Isolar linha",
            "description": "Fechar válvulas a montante",
            "estimated_time": 30,
            "ps": "SF-06",
            "materials": [{ "material_id": 3, "quantity": 2 }]
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.materials.len(), 1);

        // the bill of materials is stored separately
        let row = serde_json::to_value(&payload).unwrap();
        assert!(row.get("materials").is_none());
        assert_eq!(row["estimated_time"], 30);
    }

    #[test]
    fn test_negative_estimated_time_is_rejected() {
        let payload = NewProcedure {
            name: "Inspeção".to_string(),
            description: "Visual".to_string(),
            estimated_time: Some(-5),
            ..Default::default()
        };
        let errors: so_core::ValidationErrors = payload.validate().unwrap_err().into();
        assert_eq!(
            errors.full_messages(),
            vec!["estimated_time must not be negative".to_string()]
        );
    }
}
