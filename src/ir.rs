//! The type model: seven closed variants stored in a flat table.
//!
//! Types refer to each other through [`TypeReference`]s that point at
//! positions in a [`TypeTable`], which is what lets a self-referential
//! schema (a group whose members are groups) be represented without an
//! owning cycle. The table serializes as a JSON array of `"$type"`-tagged
//! variants with references written as `{"$ref": "#/<index>"}`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ReferenceError;
use crate::reference::TypeReference;
use crate::types::PropertyFlag;

/// Position of a type in a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

impl TypeId {
    pub fn new(index: usize) -> Self {
        TypeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#/{}", self.0)
    }
}

/// One node of the type model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "lowercase")]
pub enum TypeBase {
    Any(AnyType),
    Boolean(BooleanType),
    Number(NumberType),
    String(StringType),
    Array(ArrayType),
    Object(ObjectType),
    Union(UnionType),
}

impl TypeBase {
    /// The `"$type"` tag of this variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeBase::Any(_) => "any",
            TypeBase::Boolean(_) => "boolean",
            TypeBase::Number(_) => "number",
            TypeBase::String(_) => "string",
            TypeBase::Array(_) => "array",
            TypeBase::Object(_) => "object",
            TypeBase::Union(_) => "union",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeBase::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Visit every type reference this node holds directly.
    pub fn for_each_reference_mut(&mut self, mut f: impl FnMut(&mut TypeReference)) {
        match self {
            TypeBase::Array(array) => {
                if let Some(item) = array.item_type.as_mut() {
                    f(item);
                }
            }
            TypeBase::Object(object) => {
                for property in object.properties.values_mut() {
                    f(&mut property.ty);
                }
                if let Some(additional) = object.additional_properties.as_mut() {
                    f(additional);
                }
            }
            TypeBase::Union(union) => {
                for element in union.elements.iter_mut() {
                    f(element);
                }
            }
            TypeBase::Any(_)
            | TypeBase::Boolean(_)
            | TypeBase::Number(_)
            | TypeBase::String(_) => {}
        }
    }
}

/// Untyped value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnyType {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanType {}

/// Numeric value with optional inclusive bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberType {
    /// Format hint such as `int32` or `double`; not enforced.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Literal values the schema lists. Carried for consumers, not enforced.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<TypeReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, ObjectProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<TypeReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperty {
    #[serde(rename = "type")]
    pub ty: TypeReference,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<PropertyFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ObjectProperty {
    pub fn new(ty: impl Into<TypeReference>) -> Self {
        Self {
            ty: ty.into(),
            flags: BTreeSet::new(),
            description: None,
        }
    }

    /// Add a flag (builder style).
    pub fn flag(mut self, flag: PropertyFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn is_required(&self) -> bool {
        self.flags.contains(&PropertyFlag::Required)
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(&PropertyFlag::ReadOnly)
    }

    pub fn is_write_only(&self) -> bool {
        self.flags.contains(&PropertyFlag::WriteOnly)
    }
}

/// One-of-these-alternatives, without a discriminator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    #[serde(default)]
    pub elements: Vec<TypeReference>,
}

/// Flat, positionally addressed table of types.
///
/// Tables built by the converter have every slot filled. A table read from
/// external JSON may contain `null` slots; references into them never
/// resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    types: Vec<Option<TypeBase>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a type and return its slot.
    pub fn push(&mut self, ty: TypeBase) -> TypeId {
        self.types.push(Some(ty));
        TypeId(self.types.len() - 1)
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeBase> {
        self.types.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut TypeBase> {
        self.types.get_mut(id.0).and_then(Option::as_mut)
    }

    /// The type a reference points at, if it is resolved and the slot is filled.
    pub fn lookup(&self, reference: &TypeReference) -> Option<&TypeBase> {
        self.get(reference.id()?)
    }

    /// Number of slots, including empty ones.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Filled slots in table order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeBase)> {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(index, ty)| ty.as_ref().map(|ty| (TypeId(index), ty)))
    }

    pub(crate) fn occupancy(&self) -> Vec<bool> {
        self.types.iter().map(Option::is_some).collect()
    }

    /// Resolve every symbolic reference held by the table's own types.
    ///
    /// Returns the references that could not be resolved; they are left
    /// in place unresolved. Running this twice is a no-op the second time.
    pub fn resolve_references(&mut self) -> Vec<ReferenceError> {
        let occupied = self.occupancy();
        let mut failures = Vec::new();
        for ty in self.types.iter_mut().flatten() {
            ty.for_each_reference_mut(|reference| {
                if let Err(err) = reference.resolve_in(&occupied) {
                    failures.push(err);
                }
            });
        }
        failures
    }
}
