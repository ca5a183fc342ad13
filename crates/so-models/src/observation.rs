//! Observation model
//!
//! Table: observations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use so_core::traits::Id;
use validator::Validate;

use crate::catalog::not_blank;

/// Tag given to notes entered on the order creation form
pub const PLANNING: &str = "planning";

/// Free-text note attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Id,
    pub service_id: Id,
    pub description: String,
    pub observation_date: Option<DateTime<Utc>>,
    pub observation_type: Option<String>,
    pub team_member_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewObservation {
    pub service_id: Id,

    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub description: String,

    #[serde(default)]
    pub observation_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub observation_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_member_id: Option<Id>,
}

impl NewObservation {
    /// Planning note written together with a new order
    pub fn planning_note(service_id: Id, text: &str, now: DateTime<Utc>) -> Self {
        Self {
            service_id,
            description: text.trim().to_string(),
            observation_date: Some(now),
            observation_type: Some(PLANNING.to_string()),
            team_member_id: None,
        }
    }

    /// Fill in the submission time when the client sent no date
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.observation_date.get_or_insert(now);
        self
    }
}
