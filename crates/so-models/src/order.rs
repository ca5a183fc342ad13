//! Service order model
//!
//! Table: services

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use so_core::traits::Id;

/// Service order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,

    /// Kind of work, e.g. "Troca de válvula"
    #[serde(rename = "type")]
    pub kind: String,

    /// Service standard code
    pub ps: String,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub responsible: Option<String>,
    pub status: Option<String>,

    /// Set once when the order is created
    pub created_at: Option<DateTime<Utc>>,
}

/// Scalar order fields as submitted by a client
///
/// Absent fields are skipped on serialization so the same value can drive an
/// insert and a partial update. Dates stay textual until validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFields {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl OrderFields {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.ps.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.responsible.is_none()
            && self.status.is_none()
    }

    /// Rewrite dates to `YYYY-MM-DD` and drop blank ones
    ///
    /// Unparseable dates are left untouched; the contract reports them.
    pub fn normalize_dates(&mut self) {
        for date in [&mut self.start_date, &mut self.end_date] {
            match date.as_deref().map(str::trim) {
                Some("") => *date = None,
                Some(text) => {
                    if let Some(parsed) = parse_order_date(text) {
                        *date = Some(parsed.format("%Y-%m-%d").to_string());
                    }
                }
                None => {}
            }
        }
    }
}

/// Parse a submitted order date
///
/// Accepts plain dates (`2024-01-10`) and RFC 3339 timestamps, whose calendar
/// date in UTC is used.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}
