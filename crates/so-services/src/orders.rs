//! Order composer
//!
//! Creates, updates and deletes service orders together with their
//! association groups. There is no transaction across groups: creation
//! writes the order row first and undoes it with a compensating delete when
//! a group the [`AssociationPolicy`] treats as load-bearing fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use so_contracts::{Contract, CreateOrderContract, UpdateOrderContract};
use so_core::config::AssociationPolicy;
use so_core::Id;
use so_db::{row_id, Collection, ListQuery, RecordStore, Row, StoreResult};
use so_models::{NewObservation, NewOrder, OrderAggregate, OrderChanges};
use tracing::{debug, info, instrument, warn};

use crate::associations::{AssociationGroup, AssociationWriter, LinkEntry};
use crate::error::{from_row, to_row, ServiceError, ServiceResult};

/// Key of the planning note in [`CreatedOrder`]
const NOTE: &str = "observations";

/// Outcome of a composite create
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreatedOrder {
    /// The order row as stored
    pub service: Row,
    /// Rows written per submitted group
    pub associations: BTreeMap<&'static str, Vec<Row>>,
    /// Best-effort groups that failed, with the store message
    pub failures: BTreeMap<&'static str, String>,
}

impl CreatedOrder {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Service object for orders and their associations
#[derive(Clone)]
pub struct OrderComposer {
    store: Arc<dyn RecordStore>,
    writer: AssociationWriter,
    policy: AssociationPolicy,
}

impl OrderComposer {
    pub fn new(store: Arc<dyn RecordStore>, policy: AssociationPolicy) -> Self {
        Self {
            writer: AssociationWriter::new(store.clone()),
            store,
            policy,
        }
    }

    pub fn policy(&self) -> AssociationPolicy {
        self.policy
    }

    /// Orders newest first
    pub async fn list(&self) -> ServiceResult<Vec<Row>> {
        let query = ListQuery::new().order_by("id", true);
        Ok(self.store.list(Collection::Services, query).await?)
    }

    /// Order with all associations, procedures in execution order
    pub async fn get(&self, id: Id) -> ServiceResult<OrderAggregate> {
        let row = self.store.order_aggregate(id).await?;
        let mut aggregate: OrderAggregate = from_row(row)?;
        aggregate.arrange();
        Ok(aggregate)
    }

    /// Composite create: order row, planning note, then the five groups
    #[instrument(skip(self, order))]
    pub async fn create(&self, order: NewOrder) -> ServiceResult<CreatedOrder> {
        CreateOrderContract::new().validate(&order).map_err(|errors| {
            debug!(errors = %errors, "order rejected");
            ServiceError::Validation(errors)
        })?;

        let now = Utc::now();
        let mut row = to_row(&order.fields)?;
        row.insert("created_at".to_string(), Value::String(now.to_rfc3339()));

        let service = self.store.insert_one(Collection::Services, row).await?;
        let id = row_id(&service)?;
        info!(order_id = id, "order created");

        let mut created = CreatedOrder {
            service,
            ..Default::default()
        };

        if let Some(text) = order.observation.as_deref() {
            let note = to_row(&NewObservation::planning_note(id, text, now))?;
            let outcome = self
                .store
                .insert_one(Collection::Observations, note)
                .await
                .map(|row| vec![row]);
            self.settle(&mut created, id, NOTE, self.policy == AssociationPolicy::AllRequired, outcome)
                .await?;
        }

        let associations = &order.associations;
        self.write_group(&mut created, id, associations.team.as_deref()).await?;
        self.write_group(&mut created, id, associations.procedures.as_deref()).await?;
        self.write_group(&mut created, id, associations.materials.as_deref()).await?;
        self.write_group(&mut created, id, associations.equipments.as_deref()).await?;
        self.write_group(&mut created, id, associations.ppe.as_deref()).await?;

        if !created.is_complete() {
            warn!(order_id = id, failed = ?created.failures.keys().collect::<Vec<_>>(), "order created with missing associations");
        }
        Ok(created)
    }

    async fn write_group<E: LinkEntry>(
        &self,
        created: &mut CreatedOrder,
        id: Id,
        entries: Option<&[E]>,
    ) -> ServiceResult<()> {
        let Some(entries) = entries else {
            return Ok(());
        };
        let fatal = match self.policy {
            AssociationPolicy::AllRequired => true,
            AssociationPolicy::ProceduresRequired => E::GROUP == AssociationGroup::Procedures,
        };
        let outcome = self.writer.insert(id, entries).await;
        self.settle(created, id, E::GROUP.name(), fatal, outcome).await
    }

    /// Record a group outcome; a fatal failure removes the order again
    async fn settle(
        &self,
        created: &mut CreatedOrder,
        id: Id,
        group: &'static str,
        fatal: bool,
        outcome: StoreResult<Vec<Row>>,
    ) -> ServiceResult<()> {
        match outcome {
            Ok(rows) => {
                created.associations.insert(group, rows);
                Ok(())
            }
            Err(error) if fatal => {
                warn!(order_id = id, group, error = %error, "required group failed, removing order");
                if let Err(cleanup) = self.store.delete(Collection::Services, id).await {
                    tracing::error!(order_id = id, error = %cleanup, "compensating delete failed");
                }
                Err(ServiceError::AssociationFailed {
                    group,
                    message: error.to_string(),
                })
            }
            Err(error) => {
                warn!(order_id = id, group, error = %error, "optional group failed");
                created.failures.insert(group, error.to_string());
                Ok(())
            }
        }
    }

    /// PATCH: scalar fields plus full replacement of every submitted group
    #[instrument(skip(self, changes), fields(order_id = changes.id))]
    pub async fn update(&self, changes: OrderChanges) -> ServiceResult<OrderAggregate> {
        let id = changes.id;
        self.validate_update(&changes).await?;
        self.ensure_exists(id).await?;

        if !changes.fields.is_empty() {
            self.store
                .update(Collection::Services, id, to_row(&changes.fields)?)
                .await?;
        }

        let associations = &changes.associations;
        let mut failures = Vec::new();
        self.replace_group(id, associations.team.as_deref(), &mut failures).await;
        self.replace_group(id, associations.procedures.as_deref(), &mut failures).await;
        self.replace_group(id, associations.materials.as_deref(), &mut failures).await;
        self.replace_group(id, associations.equipments.as_deref(), &mut failures).await;
        self.replace_group(id, associations.ppe.as_deref(), &mut failures).await;

        if let Some(&(group, _)) = failures.first() {
            let message = failures
                .iter()
                .map(|(group, message)| format!("{}: {}", group, message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ServiceError::AssociationFailed { group, message });
        }

        info!(order_id = id, "order updated");
        self.get(id).await
    }

    /// Replace one group; a failure is collected and the next group still runs
    async fn replace_group<E: LinkEntry>(
        &self,
        id: Id,
        entries: Option<&[E]>,
        failures: &mut Vec<(&'static str, String)>,
    ) {
        let Some(entries) = entries else {
            return;
        };
        if let Err(error) = self.writer.replace(id, entries).await {
            warn!(order_id = id, group = E::GROUP.name(), error = %error, "group replacement failed");
            failures.push((E::GROUP.name(), error.to_string()));
        }
    }

    /// PUT: scalar fields only; submitted groups are ignored
    #[instrument(skip(self, changes), fields(order_id = changes.id))]
    pub async fn update_fields(&self, changes: OrderChanges) -> ServiceResult<Row> {
        if !changes.associations.is_empty() {
            debug!("ignoring association groups on a field update");
        }
        let changes = OrderChanges {
            associations: Default::default(),
            ..changes
        };
        self.validate_update(&changes).await?;

        if changes.fields.is_empty() {
            return Ok(self.store.get(Collection::Services, changes.id).await?);
        }
        let row = self
            .store
            .update(Collection::Services, changes.id, to_row(&changes.fields)?)
            .await?;
        info!(order_id = changes.id, "order fields updated");
        Ok(row)
    }

    /// Run the update contract with the stored counterpart filled in when
    /// only one date is submitted
    async fn validate_update(&self, changes: &OrderChanges) -> ServiceResult<()> {
        let fields = &changes.fields;
        let one_date = fields.start_date.is_some() != fields.end_date.is_some();
        let result = if one_date && changes.id > 0 {
            let stored = self.store.get(Collection::Services, changes.id).await?;
            let stored_date = |key: &str| stored.get(key).and_then(Value::as_str).map(str::to_string);
            let mut merged = changes.clone();
            if merged.fields.start_date.is_none() {
                merged.fields.start_date = stored_date("start_date");
            }
            if merged.fields.end_date.is_none() {
                merged.fields.end_date = stored_date("end_date");
            }
            UpdateOrderContract::new().validate(&merged)
        } else {
            UpdateOrderContract::new().validate(changes)
        };
        result.map_err(|errors| {
            debug!(errors = %errors, "order update rejected");
            ServiceError::Validation(errors)
        })
    }

    /// Delete an order; links and observations go with it
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Id) -> ServiceResult<Id> {
        self.ensure_exists(id).await?;
        self.store.delete(Collection::Services, id).await?;
        info!(order_id = id, "order deleted");
        Ok(id)
    }

    async fn ensure_exists(&self, id: Id) -> ServiceResult<()> {
        if self.store.exists(Collection::Services, id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound {
                entity: Collection::Services.label(),
                id,
            })
        }
    }
}
