//! Association links between an order and the catalog
//!
//! Request-side references (`*Entry`) clients submit when creating or
//! updating an order. The link rows themselves are written by the services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use so_core::traits::Id;

// ---------------------------------------------------------------------------
// Entries
//
// Forms send catalog rows back with extra fields, so each entry accepts either
// its specific key (`material_id`) or the catalog row's `id`, the specific key
// winning. Ids may arrive as numbers or numeric strings.
// ---------------------------------------------------------------------------

/// Team member reference: a bare id, `{ "team_id": .. }` or `{ "id": .. }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "i64")]
pub struct TeamEntry(pub Id);

impl TryFrom<Value> for TeamEntry {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let id = match &value {
            Value::Object(map) => map
                .get("team_id")
                .filter(|v| !v.is_null())
                .or_else(|| map.get("id"))
                .ok_or_else(|| "team entry needs team_id or id".to_string())?,
            other => other,
        };
        reference_id(id, "team_id").map(TeamEntry)
    }
}

impl From<TeamEntry> for i64 {
    fn from(entry: TeamEntry) -> Self {
        entry.0
    }
}

/// Procedure reference with its position in the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct ProcedureEntry {
    #[serde(rename = "id_procedure")]
    pub procedure_id: Id,
    pub execution_order: i64,
}

impl TryFrom<RawEntry> for ProcedureEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            procedure_id: raw.reference("id_procedure")?,
            execution_order: lenient_count(raw.execution_order.as_ref()),
        })
    }
}

/// Material reference with quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct MaterialEntry {
    pub material_id: Id,
    pub quantity: i64,
}

impl TryFrom<RawEntry> for MaterialEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            material_id: raw.reference("material_id")?,
            quantity: lenient_count(raw.quantity.as_ref()),
        })
    }
}

/// Equipment reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct EquipmentEntry {
    pub equipment_id: Id,
}

impl TryFrom<RawEntry> for EquipmentEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            equipment_id: raw.reference("equipment_id")?,
        })
    }
}

/// PPE reference with quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct PpeEntry {
    pub epi_id: Id,
    pub quantity: i64,
}

impl TryFrom<RawEntry> for PpeEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            epi_id: raw.reference("epi_id")?,
            quantity: lenient_count(raw.quantity.as_ref()),
        })
    }
}

/// Loose shape shared by all object entries
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct RawEntry {
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    execution_order: Option<Value>,
}

impl RawEntry {
    fn reference(&self, key: &'static str) -> Result<Id, String> {
        let value = self
            .fields
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| self.fields.get("id"))
            .ok_or_else(|| format!("entry needs {} or id", key))?;
        reference_id(value, key)
    }
}

fn reference_id(value: &Value, key: &str) -> Result<Id, String> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("{} must be an integer id", key))
}

/// Quantity and sequence values: absent, zero or non-numeric count as 1
///
/// Negative values are kept so contracts can reject them.
fn lenient_count(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    match parsed {
        None | Some(0) => 1,
        Some(n) => n,
    }
}
