//! Observations attached to an order after creation

use std::sync::Arc;

use chrono::Utc;
use so_contracts::{Contract, ObservationContract};
use so_core::{Id, ValidationErrors};
use so_db::{Collection, ListQuery, RecordStore, Row};
use so_models::NewObservation;
use tracing::{debug, info, instrument};

use crate::error::{to_row, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ObservationService {
    store: Arc<dyn RecordStore>,
}

impl ObservationService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Observations of an order, newest first
    pub async fn list(&self, service_id: Id) -> ServiceResult<Vec<Row>> {
        self.ensure_order(service_id).await?;
        let query = ListQuery::new()
            .filter("service_id", service_id)
            .order_by("observation_date", true);
        Ok(self.store.list(Collection::Observations, query).await?)
    }

    #[instrument(skip(self, observation), fields(service_id = observation.service_id))]
    pub async fn add(&self, observation: NewObservation) -> ServiceResult<Row> {
        ObservationContract.validate(&observation).map_err(|errors| {
            debug!(errors = %errors, "observation rejected");
            ServiceError::Validation(errors)
        })?;
        self.ensure_order(observation.service_id).await?;

        if let Some(member) = observation.team_member_id {
            if !self.store.exists(Collection::Team, member).await? {
                return Err(ValidationErrors::single("team_member_id", "does not exist").into());
            }
        }

        let row = to_row(&observation.stamped(Utc::now()))?;
        let stored = self.store.insert_one(Collection::Observations, row).await?;
        info!(id = ?stored.get("id"), "observation added");
        Ok(stored)
    }

    async fn ensure_order(&self, service_id: Id) -> ServiceResult<()> {
        if self.store.exists(Collection::Services, service_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound {
                entity: Collection::Services.label(),
                id: service_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_store;
    use chrono::TimeZone;

    fn note(service_id: Id, text: &str) -> NewObservation {
        NewObservation {
            service_id,
            description: text.to_string(),
            observation_date: None,
            observation_type: Some("execution".to_string()),
            team_member_id: None,
        }
    }

    #[tokio::test]
    async fn test_add_stamps_the_date() {
        let service = ObservationService::new(seeded_store().await);

        let row = service.add(note(1, "Válvula com vazamento")).await.unwrap();
        assert!(row["observation_date"].is_string());
        assert_eq!(row["observation_type"], "execution");
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let service = ObservationService::new(seeded_store().await);

        let mut older = note(1, "antes");
        older.observation_date = Some(Utc.with_ymd_and_hms(2024, 1, 9, 8, 0, 0).unwrap());
        let mut newer = note(1, "depois");
        newer.observation_date = Some(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap());
        service.add(older).await.unwrap();
        service.add(newer).await.unwrap();

        let listed = service.list(1).await.unwrap();
        assert_eq!(listed[0]["description"], "depois");
        assert_eq!(listed[1]["description"], "antes");
    }

    #[tokio::test]
    async fn test_unknown_order_or_author() {
        let service = ObservationService::new(seeded_store().await);

        assert!(service.add(note(7, "x")).await.unwrap_err().is_not_found());
        assert!(service.list(7).await.unwrap_err().is_not_found());

        let mut by_stranger = note(1, "x");
        by_stranger.team_member_id = Some(99);
        assert!(matches!(
            service.add(by_stranger).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_description() {
        let service = ObservationService::new(seeded_store().await);
        assert!(matches!(
            service.add(note(1, " ")).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
