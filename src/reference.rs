//! Type references: the cut points that let the type model describe cyclic schemas.
//!
//! A reference either already points at a slot of a [`TypeTable`] or still
//! carries the symbolic `#/<index>` pointer it was deserialized from.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ReferenceError;
use crate::ir::{TypeId, TypeTable};

const REFERENCE_PREFIX: &str = "#/";

/// A type that is either resolved to a table slot or still symbolic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawReference", into = "RawReference")]
pub enum TypeReference {
    Resolved(TypeId),
    Unresolved(String),
}

#[derive(Serialize, Deserialize)]
struct RawReference {
    #[serde(rename = "$ref")]
    reference: String,
}

impl From<RawReference> for TypeReference {
    fn from(raw: RawReference) -> Self {
        TypeReference::Unresolved(raw.reference)
    }
}

impl From<TypeReference> for RawReference {
    fn from(reference: TypeReference) -> Self {
        let reference = match reference {
            TypeReference::Resolved(id) => format!("{}{}", REFERENCE_PREFIX, id.index()),
            TypeReference::Unresolved(pointer) => pointer,
        };
        RawReference { reference }
    }
}

impl From<TypeId> for TypeReference {
    fn from(id: TypeId) -> Self {
        TypeReference::Resolved(id)
    }
}

impl TypeReference {
    /// Create an unresolved reference from a `#/<index>` pointer.
    pub fn pointer(pointer: impl Into<String>) -> Self {
        TypeReference::Unresolved(pointer.into())
    }

    /// The resolved slot, if resolution already happened.
    pub fn id(&self) -> Option<TypeId> {
        match self {
            TypeReference::Resolved(id) => Some(*id),
            TypeReference::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TypeReference::Resolved(_))
    }

    /// Resolve against `table`.
    ///
    /// Already-resolved references are returned unchanged. A malformed or
    /// dangling pointer is logged and the reference stays unresolved.
    pub fn resolve(&mut self, table: &TypeTable) -> Result<TypeId, ReferenceError> {
        self.resolve_in(&table.occupancy())
    }

    /// Resolve using a per-slot occupancy map of the target table.
    pub(crate) fn resolve_in(&mut self, occupied: &[bool]) -> Result<TypeId, ReferenceError> {
        let pointer = match self {
            TypeReference::Resolved(id) => return Ok(*id),
            TypeReference::Unresolved(pointer) => pointer,
        };

        match parse_pointer(pointer, occupied) {
            Ok(id) => {
                *self = TypeReference::Resolved(id);
                Ok(id)
            }
            Err(err) => {
                warn!("leaving type reference unresolved: {}", err);
                Err(err)
            }
        }
    }
}

fn parse_pointer(pointer: &str, occupied: &[bool]) -> Result<TypeId, ReferenceError> {
    if pointer.is_empty() {
        return Err(ReferenceError::Empty);
    }
    let Some(index) = pointer.strip_prefix(REFERENCE_PREFIX) else {
        return Err(ReferenceError::MissingPrefix {
            reference: pointer.to_string(),
        });
    };
    let index: usize = index.parse().map_err(|_| ReferenceError::InvalidIndex {
        reference: pointer.to_string(),
    })?;
    match occupied.get(index) {
        None => Err(ReferenceError::OutOfRange {
            reference: pointer.to_string(),
            len: occupied.len(),
        }),
        Some(false) => Err(ReferenceError::EmptySlot {
            reference: pointer.to_string(),
        }),
        Some(true) => Ok(TypeId::new(index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BooleanType, StringType, TypeBase};
    use serde_json::json;

    fn table() -> TypeTable {
        let mut table = TypeTable::new();
        table.push(TypeBase::Boolean(BooleanType::default()));
        table.push(TypeBase::String(StringType::default()));
        table
    }

    #[test]
    fn resolves_in_range_pointer() {
        let table = table();
        let mut reference = TypeReference::pointer("#/1");
        assert_eq!(reference.resolve(&table), Ok(TypeId::new(1)));
        assert_eq!(reference, TypeReference::Resolved(TypeId::new(1)));
    }

    #[test]
    fn resolution_is_idempotent() {
        let table = table();
        let mut reference = TypeReference::pointer("#/0");
        let first = reference.resolve(&table).unwrap();
        let snapshot = reference.clone();
        let second = reference.resolve(&table).unwrap();
        assert_eq!(first, second);
        assert_eq!(reference, snapshot);
    }

    #[test]
    fn malformed_pointers_stay_unresolved() {
        let table = table();

        let mut reference = TypeReference::pointer("");
        assert_eq!(reference.resolve(&table), Err(ReferenceError::Empty));

        let mut reference = TypeReference::pointer("1");
        assert!(matches!(
            reference.resolve(&table),
            Err(ReferenceError::MissingPrefix { .. })
        ));
        assert!(!reference.is_resolved());

        let mut reference = TypeReference::pointer("#/one");
        assert!(matches!(
            reference.resolve(&table),
            Err(ReferenceError::InvalidIndex { .. })
        ));

        let mut reference = TypeReference::pointer("#/7");
        assert!(matches!(
            reference.resolve(&table),
            Err(ReferenceError::OutOfRange { len: 2, .. })
        ));
        assert_eq!(reference, TypeReference::pointer("#/7"));
    }

    #[test]
    fn empty_slot_stays_unresolved() {
        let mut reference = TypeReference::pointer("#/1");
        let result = reference.resolve_in(&[true, false]);
        assert!(matches!(result, Err(ReferenceError::EmptySlot { .. })));
        assert!(!reference.is_resolved());
    }

    #[test]
    fn wire_form_is_pointer() {
        let reference = TypeReference::Resolved(TypeId::new(3));
        assert_eq!(serde_json::to_value(&reference).unwrap(), json!({"$ref": "#/3"}));

        let parsed: TypeReference = serde_json::from_value(json!({"$ref": "#/3"})).unwrap();
        assert_eq!(parsed, TypeReference::pointer("#/3"));
    }
}
