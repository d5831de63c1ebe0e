//! Secondary index catalogue for the report collection.

use bson::{doc, Document};
use mongodb::error::{Error, ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

/// Server codes meaning "this index is already there, maybe with other
/// options": IndexOptionsConflict, IndexKeySpecsConflict, IndexAlreadyExists.
const INDEX_CONFLICT_CODES: [i32; 3] = [85, 86, 68];
/// NamespaceNotFound, returned when dropping indexes of a missing collection.
const NAMESPACE_NOT_FOUND: i32 = 26;
const DUPLICATE_KEY: i32 = 11000;

/// One index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub keys: Document,
    /// Restrict the index to live rows (`deleted_at = null`).
    pub live_only: bool,
    pub unique: bool,
}

impl IndexSpec {
    pub fn to_model(&self) -> IndexModel {
        let mut options = IndexOptions::builder().name(self.name.to_string()).build();
        if self.live_only {
            options.partial_filter_expression = Some(live_filter());
        }
        if self.unique {
            options.unique = Some(true);
        }
        IndexModel::builder()
            .keys(self.keys.clone())
            .options(options)
            .build()
    }
}

fn live_filter() -> Document {
    doc! { "deleted_at": null }
}

/// The full index set, in creation order.
pub fn report_indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec {
            name: "id_deleted",
            keys: doc! { "id": 1, "deleted_at": 1 },
            live_only: false,
            // At most one live row per id.
            unique: true,
        },
        IndexSpec {
            name: "list_main",
            keys: doc! { "deleted_at": 1, "created_at": -1 },
            live_only: true,
            unique: false,
        },
        IndexSpec {
            name: "status_poll",
            keys: doc! { "status": 1, "deleted_at": 1, "created_at": -1 },
            live_only: true,
            unique: false,
        },
        IndexSpec {
            name: "template",
            keys: doc! { "template_id": 1, "deleted_at": 1, "created_at": -1 },
            live_only: true,
            unique: false,
        },
        IndexSpec {
            name: "complete",
            keys: doc! { "deleted_at": 1, "status": 1, "template_id": 1, "created_at": -1 },
            live_only: true,
            unique: false,
        },
    ]
}

fn command_code(err: &Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}

/// True when creating an index failed only because it already exists.
pub fn is_index_conflict(err: &Error) -> bool {
    if command_code(err).map_or(false, |code| INDEX_CONFLICT_CODES.contains(&code)) {
        return true;
    }
    err.to_string().to_ascii_lowercase().contains("already exists")
}

pub fn is_namespace_not_found(err: &Error) -> bool {
    command_code(err) == Some(NAMESPACE_NOT_FOUND)
}

pub fn is_duplicate_key(err: &Error) -> bool {
    command_code(err) == Some(DUPLICATE_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_canonical_names() {
        let names: Vec<_> = report_indexes().iter().map(|spec| spec.name).collect();
        assert_eq!(
            names,
            ["id_deleted", "list_main", "status_poll", "template", "complete"]
        );
    }

    #[test]
    fn live_indexes_carry_partial_filter() {
        for spec in report_indexes() {
            let model = spec.to_model();
            let options = model.options.expect("index options");
            assert_eq!(options.name.as_deref(), Some(spec.name));
            assert_eq!(options.unique, spec.unique.then_some(true));
            if spec.live_only {
                assert_eq!(options.partial_filter_expression, Some(doc! { "deleted_at": null }));
            } else {
                assert!(options.partial_filter_expression.is_none());
            }
        }
    }

    #[test]
    fn complete_index_matches_list_filter_order() {
        let complete = report_indexes()
            .into_iter()
            .find(|spec| spec.name == "complete")
            .unwrap();
        let keys: Vec<_> = complete.keys.keys().map(String::as_str).collect();
        assert_eq!(keys, ["deleted_at", "status", "template_id", "created_at"]);
        assert_eq!(complete.keys.get_i32("created_at").unwrap(), -1);
    }
}
