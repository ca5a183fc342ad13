//! Eager-loaded view of an order with all of its associations
//!
//! The nesting follows the join shape the listing and report pages consume:
//! every link carries its catalog record under a singular key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use so_core::traits::Id;

use crate::catalog::{Equipment, Material, PpeItem};
use crate::order::Order;
use crate::procedure::Procedure;

/// Order with team, procedures, materials, equipment, PPE and observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAggregate {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub service_team: Vec<TeamAssignment>,
    #[serde(default)]
    pub procedure_order: Vec<ScheduledProcedure>,
    #[serde(default)]
    pub service_materials: Vec<MaterialUsage>,
    #[serde(default)]
    pub service_equipments: Vec<EquipmentUsage>,
    #[serde(default)]
    pub service_epi: Vec<PpeUsage>,
    #[serde(default)]
    pub observations: Vec<ObservationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub primary_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team: TeamSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledProcedure {
    pub execution_order: Option<i64>,
    pub procedure: Procedure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialUsage {
    pub quantity: i64,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentUsage {
    pub equipment: Equipment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpeUsage {
    pub quantity: i64,
    pub epi_item: PpeItem,
}

/// Observation with its author, when one was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationView {
    pub id: Id,
    pub description: String,
    pub observation_date: Option<DateTime<Utc>>,
    pub observation_type: Option<String>,
    #[serde(default)]
    pub team_member: Option<TeamSummary>,
}

impl OrderAggregate {
    /// Put procedures in execution order and observations newest first
    ///
    /// Procedures without a position sort first, as position 0.
    pub fn arrange(&mut self) {
        self.procedure_order
            .sort_by_key(|p| (p.execution_order.unwrap_or(0), p.procedure.id));
        self.observations.sort_by(|a, b| {
            b.observation_date
                .cmp(&a.observation_date)
                .then_with(|| b.id.cmp(&a.id))
        });
    }

    /// Sum of the estimated minutes of all scheduled procedures
    pub fn estimated_minutes(&self) -> i64 {
        self.procedure_order
            .iter()
            .filter_map(|p| p.procedure.estimated_time)
            .sum()
    }
}
