//! Named collections and their columns

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every table the backend reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Services,
    Team,
    Procedures,
    ProcedureMaterials,
    Materials,
    Equipments,
    Epi,
    Observations,
    ServiceTeam,
    ProcedureOrder,
    ServiceMaterials,
    ServiceEquipments,
    ServiceEpi,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Self::Services,
        Self::Team,
        Self::Procedures,
        Self::ProcedureMaterials,
        Self::Materials,
        Self::Equipments,
        Self::Epi,
        Self::Observations,
        Self::ServiceTeam,
        Self::ProcedureOrder,
        Self::ServiceMaterials,
        Self::ServiceEquipments,
        Self::ServiceEpi,
    ];

    /// Pick-list collections exposed through the generic CRUD endpoints
    pub const CATALOG: [Collection; 4] = [Self::Team, Self::Materials, Self::Equipments, Self::Epi];

    /// Table name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Team => "team",
            Self::Procedures => "procedures",
            Self::ProcedureMaterials => "procedure_materials",
            Self::Materials => "materials",
            Self::Equipments => "equipments",
            Self::Epi => "epi",
            Self::Observations => "observations",
            Self::ServiceTeam => "service_team",
            Self::ProcedureOrder => "procedure_order",
            Self::ServiceMaterials => "service_materials",
            Self::ServiceEquipments => "service_equipments",
            Self::ServiceEpi => "service_epi",
        }
    }

    /// All columns, `id` first
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Services => &[
                "id",
                "type",
                "ps",
                "start_date",
                "end_date",
                "responsible",
                "status",
                "created_at",
            ],
            Self::Team => &["id", "name", "position", "primary_contact", "secondary_contact"],
            Self::Procedures => &["id", "name", "description", "estimated_time", "ps"],
            Self::ProcedureMaterials => &["id", "procedure_id", "material_id", "quantity"],
            Self::Materials => &["id", "name", "unity_of_measure"],
            Self::Equipments | Self::Epi => &["id", "name", "description"],
            Self::Observations => &[
                "id",
                "service_id",
                "description",
                "observation_date",
                "observation_type",
                "team_member_id",
            ],
            Self::ServiceTeam => &["id", "service_id", "team_id"],
            Self::ProcedureOrder => &["id", "service_id", "id_procedure", "execution_order"],
            Self::ServiceMaterials => &["id", "service_id", "material_id", "quantity"],
            Self::ServiceEquipments => &["id", "service_id", "equipment_id"],
            Self::ServiceEpi => &["id", "service_id", "epi_id", "quantity"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Columns a client may change after the row exists
    pub fn is_writable(&self, column: &str) -> bool {
        column != "id" && column != "created_at" && self.has_column(column)
    }

    /// Singular label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Services => "service",
            Self::Team => "team member",
            Self::Procedures => "procedure",
            Self::ProcedureMaterials => "procedure material",
            Self::Materials => "material",
            Self::Equipments => "equipment",
            Self::Epi => "PPE item",
            Self::Observations => "observation",
            Self::ServiceTeam => "team link",
            Self::ProcedureOrder => "procedure link",
            Self::ServiceMaterials => "material link",
            Self::ServiceEquipments => "equipment link",
            Self::ServiceEpi => "PPE link",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == value)
            .ok_or_else(|| format!("unknown collection '{}'", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_collection_starts_with_id() {
        for collection in Collection::ALL {
            assert_eq!(collection.columns()[0], "id", "{}", collection);
            assert_eq!(collection.name().parse::<Collection>().unwrap(), collection);
        }
    }

    #[test]
    fn test_writable_columns() {
        assert!(Collection::Services.is_writable("status"));
        assert!(!Collection::Services.is_writable("created_at"));
        assert!(!Collection::Team.is_writable("id"));
        assert!(!Collection::Materials.is_writable("description"));
    }
}
