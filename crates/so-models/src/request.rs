//! Request payloads decoded from loosely shaped JSON bodies
//!
//! Order forms post the scalar fields either nested under `service` or at the
//! top level next to the association arrays, and send ids as numbers or
//! strings. Decoding collects every problem into [`ValidationErrors`] instead
//! of stopping at the first one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use so_core::{Id, ValidationErrors};
use std::fmt;
use std::str::FromStr;

use crate::collection::Collection;
use crate::links::{EquipmentEntry, MaterialEntry, PpeEntry, ProcedureEntry, TeamEntry};
use crate::order::OrderFields;

const TEAM: &str = "team";
const PROCEDURES: &str = "procedures";
const MATERIALS: &str = "materials";
const EQUIPMENTS: &str = "equipments";
const PPE_KEYS: [&str; 2] = ["epi", "epis"];

/// Aggregate keys a client may echo back on update; they are not columns
const ECHOED_KEYS: [&str; 7] = [
    "service",
    "service_team",
    "procedure_order",
    "service_materials",
    "service_equipments",
    "service_epi",
    "observations",
];

/// The five association groups of an order
///
/// `None` means the group was not submitted; `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderAssociations {
    pub team: Option<Vec<TeamEntry>>,
    pub procedures: Option<Vec<ProcedureEntry>>,
    pub materials: Option<Vec<MaterialEntry>>,
    pub equipments: Option<Vec<EquipmentEntry>>,
    pub ppe: Option<Vec<PpeEntry>>,
}

impl OrderAssociations {
    pub fn is_empty(&self) -> bool {
        self.team.is_none()
            && self.procedures.is_none()
            && self.materials.is_none()
            && self.equipments.is_none()
            && self.ppe.is_none()
    }

    fn take(body: &mut Map<String, Value>, errors: &mut ValidationErrors) -> Self {
        let ppe = PPE_KEYS
            .iter()
            .find_map(|key| take_list(body, key, errors));
        for key in PPE_KEYS {
            body.remove(key);
        }
        Self {
            team: take_list(body, TEAM, errors),
            procedures: take_list(body, PROCEDURES, errors),
            materials: take_list(body, MATERIALS, errors),
            equipments: take_list(body, EQUIPMENTS, errors),
            ppe,
        }
    }
}

/// Composite order creation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewOrder {
    pub fields: OrderFields,
    /// Free-text planning note
    pub observation: Option<String>,
    pub associations: OrderAssociations,
}

impl NewOrder {
    pub fn from_body(body: Value) -> Result<Self, ValidationErrors> {
        let mut body = into_object(body)?;
        let mut errors = ValidationErrors::new();

        let associations = OrderAssociations::take(&mut body, &mut errors);
        let observation = match body.remove("observations") {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(_) => {
                errors.add("observations", "must be text");
                None
            }
        };

        let source = match body.remove("service") {
            Some(Value::Object(service)) => service,
            Some(Value::Null) | None => body,
            Some(_) => {
                errors.add("service", "must be an object");
                Map::new()
            }
        };
        let mut fields = decode_fields(source, &mut errors);
        fields.normalize_dates();

        errors.into_result()?;
        Ok(Self {
            fields,
            observation,
            associations,
        })
    }
}

/// Order update request: scalar fields plus any replaced association groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderChanges {
    pub id: Id,
    pub fields: OrderFields,
    pub associations: OrderAssociations,
}

impl OrderChanges {
    pub fn from_body(body: Value) -> Result<Self, ValidationErrors> {
        let mut body = into_object(body)?;
        let mut errors = ValidationErrors::new();

        let id = take_id(&mut body, "id", &mut errors);
        let associations = OrderAssociations::take(&mut body, &mut errors);

        body.remove("created_at");
        for key in ECHOED_KEYS {
            body.remove(key);
        }
        for key in body.keys() {
            if !Collection::Services.is_writable(key) {
                errors.add(key.as_str(), "is not a writable field");
            }
        }
        let mut fields = decode_fields(body, &mut errors);
        fields.normalize_dates();

        errors.into_result()?;
        Ok(Self {
            id: id.unwrap_or_default(),
            fields,
            associations,
        })
    }
}

/// Delivery channel for a rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Whatsapp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(format!("unsupported channel '{}'", other)),
        }
    }
}

/// `POST /api/send_order` body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub id: Id,
    pub channel: Channel,
    /// Email address or phone number, depending on the channel
    pub destination: String,
}

impl DeliveryRequest {
    pub fn from_body(body: Value) -> Result<Self, ValidationErrors> {
        let mut body = into_object(body)?;
        let mut errors = ValidationErrors::new();

        let id = take_id(&mut body, "id", &mut errors);
        let channel = match body.remove("channel") {
            Some(Value::String(text)) if !text.trim().is_empty() => match text.parse::<Channel>() {
                Ok(channel) => Some(channel),
                Err(_) => {
                    errors.add("channel", "is not supported");
                    None
                }
            },
            _ => {
                errors.add("channel", "can't be blank");
                None
            }
        };
        let destination = match body.remove("destination") {
            Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
            _ => {
                errors.add("destination", "can't be blank");
                String::new()
            }
        };

        match (id, channel) {
            (Some(id), Some(channel)) if errors.is_empty() => Ok(Self {
                id,
                channel,
                destination,
            }),
            _ => Err(errors),
        }
    }
}

/// `{ id, updatedData }` body of a generic row update
#[derive(Debug, Clone, PartialEq)]
pub struct RowPatch {
    pub id: Id,
    pub data: Map<String, Value>,
}

impl RowPatch {
    pub fn from_body(body: Value) -> Result<Self, ValidationErrors> {
        let mut body = into_object(body)?;
        let mut errors = ValidationErrors::new();

        let id = take_id(&mut body, "id", &mut errors);
        let data = match body.remove("updatedData") {
            Some(Value::Object(data)) if !data.is_empty() => data,
            Some(Value::Object(_)) | Some(Value::Null) | None => {
                errors.add("updatedData", "can't be blank");
                Map::new()
            }
            Some(_) => {
                errors.add("updatedData", "must be an object");
                Map::new()
            }
        };

        match id {
            Some(id) if errors.is_empty() => Ok(Self { id, data }),
            _ => Err(errors),
        }
    }
}

fn into_object(body: Value) -> Result<Map<String, Value>, ValidationErrors> {
    match body {
        Value::Object(map) => Ok(map),
        _ => {
            let mut errors = ValidationErrors::new();
            errors.add_base("request body must be a JSON object");
            Err(errors)
        }
    }
}

/// Positive integer id given as a number or numeric string
pub fn parse_id(value: &Value) -> Option<Id> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}

fn take_id(body: &mut Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Option<Id> {
    match body.remove(key) {
        None | Some(Value::Null) => {
            errors.add(key, "can't be blank");
            None
        }
        Some(value) => {
            let id = parse_id(&value);
            if id.is_none() {
                errors.add(key, "must be a positive integer");
            }
            id
        }
    }
}

fn take_list<T>(body: &mut Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Option<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    match body.remove(key)? {
        Value::Null => None,
        value @ Value::Array(_) => match serde_json::from_value(value) {
            Ok(list) => Some(list),
            Err(e) => {
                errors.add(key, format!("is invalid: {}", e));
                None
            }
        },
        _ => {
            errors.add(key, "must be a list");
            None
        }
    }
}

fn decode_fields(source: Map<String, Value>, errors: &mut ValidationErrors) -> OrderFields {
    // empty strings from untouched form inputs count as absent
    let source: Map<String, Value> = source
        .into_iter()
        .filter(|(_, v)| !matches!(v, Value::String(s) if s.trim().is_empty()))
        .collect();
    match serde_json::from_value(Value::Object(source)) {
        Ok(fields) => fields,
        Err(e) => {
            errors.add("service", format!("is invalid: {}", e));
            OrderFields::default()
        }
    }
}
