//! Catalog entities picked when composing an order
//!
//! Tables: team, materials, equipments, epi

use serde::{Deserialize, Serialize};
use so_core::traits::Id;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Team member creation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewTeamMember {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_contact: Option<String>,
}

/// Material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Id,
    pub name: String,
    pub unity_of_measure: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewMaterial {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "known_unit")]
    pub unity_of_measure: String,
}

/// Equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewEquipment {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub description: String,
}

/// Personal protective equipment item ("EPI")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpeItem {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewPpeItem {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub description: String,
}

/// Units a material can be measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOfMeasure {
    #[serde(rename = "UN")]
    Unit,
    #[serde(rename = "M")]
    Meter,
    #[serde(rename = "M²")]
    SquareMeter,
    #[serde(rename = "M³")]
    CubicMeter,
    #[serde(rename = "KG")]
    Kilogram,
    #[serde(rename = "L")]
    Liter,
    #[serde(rename = "ML")]
    Milliliter,
    #[serde(rename = "CX")]
    Box,
    #[serde(rename = "PC")]
    Piece,
}

impl UnitOfMeasure {
    pub const ALL: [UnitOfMeasure; 9] = [
        Self::Unit,
        Self::Meter,
        Self::SquareMeter,
        Self::CubicMeter,
        Self::Kilogram,
        Self::Liter,
        Self::Milliliter,
        Self::Box,
        Self::Piece,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unit => "UN",
            Self::Meter => "M",
            Self::SquareMeter => "M²",
            Self::CubicMeter => "M³",
            Self::Kilogram => "KG",
            Self::Liter => "L",
            Self::Milliliter => "ML",
            Self::Box => "CX",
            Self::Piece => "PC",
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for UnitOfMeasure {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|unit| unit.code() == value)
            .ok_or_else(|| format!("unknown unit of measure '{}'", value))
    }
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn known_unit(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;
    value
        .parse::<UnitOfMeasure>()
        .map(|_| ())
        .map_err(|_| {
            let mut error = ValidationError::new("inclusion");
            error.message = Some("is not a known unit of measure".into());
            error
        })
}
