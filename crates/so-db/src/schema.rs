//! Relational constraints shared by both backends
//!
//! PostgreSQL enforces these through `schema.sql`; the in-memory store reads
//! the same tables to emulate them.

use so_models::Collection;

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
}

/// `collection.column` references `target.id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub collection: Collection,
    pub column: &'static str,
    pub target: Collection,
    pub on_delete: OnDelete,
}

const fn fk(
    collection: Collection,
    column: &'static str,
    target: Collection,
    on_delete: OnDelete,
) -> ForeignKey {
    ForeignKey {
        collection,
        column,
        target,
        on_delete,
    }
}

pub const FOREIGN_KEYS: [ForeignKey; 14] = [
    fk(Collection::ServiceTeam, "service_id", Collection::Services, OnDelete::Cascade),
    fk(Collection::ServiceTeam, "team_id", Collection::Team, OnDelete::Restrict),
    fk(Collection::ProcedureOrder, "service_id", Collection::Services, OnDelete::Cascade),
    fk(Collection::ProcedureOrder, "id_procedure", Collection::Procedures, OnDelete::Restrict),
    fk(Collection::ServiceMaterials, "service_id", Collection::Services, OnDelete::Cascade),
    fk(Collection::ServiceMaterials, "material_id", Collection::Materials, OnDelete::Restrict),
    fk(Collection::ServiceEquipments, "service_id", Collection::Services, OnDelete::Cascade),
    fk(Collection::ServiceEquipments, "equipment_id", Collection::Equipments, OnDelete::Restrict),
    fk(Collection::ServiceEpi, "service_id", Collection::Services, OnDelete::Cascade),
    fk(Collection::ServiceEpi, "epi_id", Collection::Epi, OnDelete::Restrict),
    fk(Collection::Observations, "service_id", Collection::Services, OnDelete::Cascade),
    fk(Collection::Observations, "team_member_id", Collection::Team, OnDelete::SetNull),
    fk(Collection::ProcedureMaterials, "procedure_id", Collection::Procedures, OnDelete::Cascade),
    fk(Collection::ProcedureMaterials, "material_id", Collection::Materials, OnDelete::Restrict),
];

/// Keys whose source column lives in `collection`
pub fn references_from(collection: Collection) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |k| k.collection == collection)
}

/// Keys pointing at `collection`
pub fn references_to(collection: Collection) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |k| k.target == collection)
}

/// Columns declared `NOT NULL` (besides `id`)
pub fn not_null(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Services => &["type", "ps"],
        Collection::Team | Collection::Materials | Collection::Equipments | Collection::Epi => {
            &["name"]
        }
        Collection::Procedures => &["name"],
        Collection::ProcedureMaterials => &["procedure_id", "material_id", "quantity"],
        Collection::Observations => &["service_id", "description"],
        Collection::ServiceTeam => &["service_id", "team_id"],
        Collection::ProcedureOrder => &["service_id", "id_procedure"],
        Collection::ServiceMaterials => &["service_id", "material_id", "quantity"],
        Collection::ServiceEquipments => &["service_id", "equipment_id"],
        Collection::ServiceEpi => &["service_id", "epi_id", "quantity"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_name_real_columns() {
        for key in FOREIGN_KEYS {
            assert!(key.collection.has_column(key.column), "{:?}", key);
        }
        for collection in Collection::ALL {
            for column in not_null(collection) {
                assert!(collection.has_column(column), "{}.{}", collection, column);
            }
        }
    }

    #[test]
    fn test_order_children_cascade() {
        let children: Vec<Collection> = references_to(Collection::Services)
            .filter(|k| k.on_delete == OnDelete::Cascade)
            .map(|k| k.collection)
            .collect();
        assert_eq!(children.len(), 6);
        assert!(children.contains(&Collection::Observations));
    }
}
