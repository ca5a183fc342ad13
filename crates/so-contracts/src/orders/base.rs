//! Checks shared by order creation and update

use chrono::NaiveDate;
use so_core::error::ValidationErrors;
use so_models::{parse_order_date, OrderAssociations, OrderFields};

/// Field and association checks common to every order write
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderBaseContract;

impl OrderBaseContract {
    pub fn new() -> Self {
        Self
    }

    /// `type` and `ps` identify the order and must be present on creation
    pub fn validate_identity(&self, fields: &OrderFields, errors: &mut ValidationErrors) {
        if is_blank(fields.kind.as_deref()) {
            errors.add("type", "can't be blank");
        }
        if is_blank(fields.ps.as_deref()) {
            errors.add("ps", "can't be blank");
        }
    }

    /// Dates must parse, and the end may not precede the start
    pub fn validate_dates(&self, fields: &OrderFields, errors: &mut ValidationErrors) {
        let start = self.parse_date("start_date", fields.start_date.as_deref(), errors);
        let end = self.parse_date("end_date", fields.end_date.as_deref(), errors);

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                errors.add("end_date", "must be on or after start_date");
            }
        }
    }

    fn parse_date(
        &self,
        field: &str,
        value: Option<&str>,
        errors: &mut ValidationErrors,
    ) -> Option<NaiveDate> {
        let date = parse_order_date(value?);
        if date.is_none() {
            errors.add(field, "is not a valid date");
        }
        date
    }

    /// Quantities and positions must be positive
    pub fn validate_associations(&self, groups: &OrderAssociations, errors: &mut ValidationErrors) {
        if let Some(procedures) = &groups.procedures {
            if procedures.iter().any(|p| p.execution_order < 1) {
                errors.add("procedures", "execution_order must be positive");
            }
        }
        if let Some(materials) = &groups.materials {
            if materials.iter().any(|m| m.quantity < 1) {
                errors.add("materials", "quantity must be positive");
            }
        }
        if let Some(ppe) = &groups.ppe {
            if ppe.iter().any(|e| e.quantity < 1) {
                errors.add("epi", "quantity must be positive");
            }
        }
    }
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
