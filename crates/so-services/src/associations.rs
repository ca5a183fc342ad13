//! Association writer
//!
//! Links between an order and the catalog live in five tables. Each group is
//! written on its own: `insert` appends rows and `replace` first removes
//! every link of that group for the order. Entries are stored as submitted,
//! duplicates included.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use so_core::Id;
use so_db::{Collection, RecordStore, Row, StoreResult};
use so_models::{EquipmentEntry, MaterialEntry, PpeEntry, ProcedureEntry, TeamEntry};
use tracing::debug;

/// The association groups of an order, in the order they are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssociationGroup {
    Team,
    Procedures,
    Materials,
    Equipments,
    Ppe,
}

impl AssociationGroup {
    pub const ALL: [AssociationGroup; 5] = [
        Self::Team,
        Self::Procedures,
        Self::Materials,
        Self::Equipments,
        Self::Ppe,
    ];

    /// Request key of the group
    pub fn name(&self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Procedures => "procedures",
            Self::Materials => "materials",
            Self::Equipments => "equipments",
            Self::Ppe => "epi",
        }
    }

    /// Link table of the group
    pub fn collection(&self) -> Collection {
        match self {
            Self::Team => Collection::ServiceTeam,
            Self::Procedures => Collection::ProcedureOrder,
            Self::Materials => Collection::ServiceMaterials,
            Self::Equipments => Collection::ServiceEquipments,
            Self::Ppe => Collection::ServiceEpi,
        }
    }
}

impl fmt::Display for AssociationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request entry that becomes one link row
pub trait LinkEntry: Send + Sync {
    const GROUP: AssociationGroup;

    fn link_row(&self, service_id: Id) -> Row;
}

fn object(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(row) => row,
        _ => Row::new(),
    }
}

impl LinkEntry for TeamEntry {
    const GROUP: AssociationGroup = AssociationGroup::Team;

    fn link_row(&self, service_id: Id) -> Row {
        object(json!({ "service_id": service_id, "team_id": self.0 }))
    }
}

impl LinkEntry for ProcedureEntry {
    const GROUP: AssociationGroup = AssociationGroup::Procedures;

    fn link_row(&self, service_id: Id) -> Row {
        object(json!({
            "service_id": service_id,
            "id_procedure": self.procedure_id,
            "execution_order": self.execution_order,
        }))
    }
}

impl LinkEntry for MaterialEntry {
    const GROUP: AssociationGroup = AssociationGroup::Materials;

    fn link_row(&self, service_id: Id) -> Row {
        object(json!({
            "service_id": service_id,
            "material_id": self.material_id,
            "quantity": self.quantity,
        }))
    }
}

impl LinkEntry for EquipmentEntry {
    const GROUP: AssociationGroup = AssociationGroup::Equipments;

    fn link_row(&self, service_id: Id) -> Row {
        object(json!({ "service_id": service_id, "equipment_id": self.equipment_id }))
    }
}

impl LinkEntry for PpeEntry {
    const GROUP: AssociationGroup = AssociationGroup::Ppe;

    fn link_row(&self, service_id: Id) -> Row {
        object(json!({
            "service_id": service_id,
            "epi_id": self.epi_id,
            "quantity": self.quantity,
        }))
    }
}

/// Writes the link rows of an order's association groups
#[derive(Clone)]
pub struct AssociationWriter {
    store: Arc<dyn RecordStore>,
}

impl AssociationWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Insert one link row per entry
    pub async fn insert<E: LinkEntry>(&self, order_id: Id, entries: &[E]) -> StoreResult<Vec<Row>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let rows = entries.iter().map(|entry| entry.link_row(order_id)).collect();
        self.store.insert(E::GROUP.collection(), rows).await
    }

    /// Remove every link of the group for the order, then insert the entries
    pub async fn replace<E: LinkEntry>(&self, order_id: Id, entries: &[E]) -> StoreResult<Vec<Row>> {
        let removed = self
            .store
            .delete_where(E::GROUP.collection(), "service_id", order_id)
            .await?;
        debug!(order_id, group = %E::GROUP, removed, added = entries.len(), "replacing links");
        self.insert(order_id, entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_store;
    use so_db::ListQuery;

    async fn links(store: &Arc<dyn RecordStore>, collection: Collection) -> Vec<Row> {
        store
            .list(collection, ListQuery::by_id().filter("service_id", 1))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_builds_link_rows() {
        let store = seeded_store().await;
        let writer = AssociationWriter::new(store.clone());

        let rows = writer
            .insert(
                1,
                &[ProcedureEntry { procedure_id: 1, execution_order: 2 }],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["service_id"], 1);
        assert_eq!(rows[0]["id_procedure"], 1);
        assert_eq!(rows[0]["execution_order"], 2);
    }

    #[tokio::test]
    async fn test_replace_clears_and_keeps_duplicates() {
        let store = seeded_store().await;
        let writer = AssociationWriter::new(store.clone());

        writer
            .insert(1, &[MaterialEntry { material_id: 1, quantity: 1 }])
            .await
            .unwrap();
        writer
            .replace(
                1,
                &[
                    MaterialEntry { material_id: 1, quantity: 2 },
                    MaterialEntry { material_id: 1, quantity: 3 },
                ],
            )
            .await
            .unwrap();

        let rows = links(&store, Collection::ServiceMaterials).await;
        let quantities: Vec<_> = rows.iter().map(|r| r["quantity"].clone()).collect();
        assert_eq!(quantities, vec![json!(2), json!(3)]);

        writer.replace::<MaterialEntry>(1, &[]).await.unwrap();
        assert!(links(&store, Collection::ServiceMaterials).await.is_empty());
    }

    #[tokio::test]
    async fn test_groups_are_independent() {
        let store = seeded_store().await;
        let writer = AssociationWriter::new(store.clone());

        writer.replace(1, &[TeamEntry(1)]).await.unwrap();
        writer
            .replace(1, &[PpeEntry { epi_id: 1, quantity: 2 }])
            .await
            .unwrap();
        writer.replace::<TeamEntry>(1, &[]).await.unwrap();

        assert!(links(&store, Collection::ServiceTeam).await.is_empty());
        assert_eq!(links(&store, Collection::ServiceEpi).await.len(), 1);
    }

    #[test]
    fn test_group_names_match_request_keys() {
        let names: Vec<_> = AssociationGroup::ALL.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["team", "procedures", "materials", "equipments", "epi"]);
    }
}
