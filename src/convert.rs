//! Schema conversion - translates OpenAPI schema nodes into the type model.
//!
//! Every composite node is pushed into the table and recorded in the
//! memo cache before its children are converted, so a schema that refers
//! back to itself (directly or through other schemas) converts to the same
//! table slot instead of recursing forever. Shared sub-schemas are
//! converted once.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::document::{AdditionalProperties, Document, Schema, SchemaRef};
use crate::ir::{
    AnyType, ArrayType, BooleanType, NumberType, ObjectProperty, ObjectType, StringType,
    TypeBase, TypeId, TypeTable, UnionType,
};
use crate::reference::TypeReference;
use crate::types::{json_type_name, ConvertOptions, PropertyFlag};

/// Why part of a schema converted to something more permissive than declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WarningKind {
    #[error("unsupported discriminator property \"{property}\"")]
    UnsupportedDiscriminator { property: String },

    #[error("schema reference {reference} cannot be resolved")]
    UnresolvedSchema { reference: String },

    #[error("schema is null")]
    NilSchema,

    #[error("property \"{name}\" has no schema")]
    NilProperty { name: String },

    #[error("allOf branch converted to {actual}, only objects can be merged")]
    NonObjectAllOfBranch { actual: String },

    #[error("array schema has no items")]
    MissingArrayItems,

    #[error("enum value of type {actual} ignored")]
    NonStringEnumValue { actual: String },

    #[error("unsupported type \"{type_name}\", treating as any")]
    UnsupportedType {
        #[serde(rename = "type")]
        type_name: String,
    },
}

/// A degraded-conversion diagnostic with the schema location it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionWarning {
    /// JSON-pointer-like path from the converted root (e.g. `/properties/members/items`).
    pub path: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", display_path(&self.path), self.kind)
    }
}

/// Output of a conversion: the table, the converted root and any diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub root: Option<TypeId>,
    pub types: TypeTable,
    pub warnings: Vec<ConversionWarning>,
}

/// Convert one schema of `document` into a fresh type table.
pub fn convert_schema(
    document: &Document,
    schema: &SchemaRef,
    options: &ConvertOptions,
) -> Conversion {
    let mut converter = SchemaConverter::new(document, options.clone());
    let root = converter.convert(schema);
    let (types, warnings) = converter.finish();
    Conversion {
        root,
        types,
        warnings,
    }
}

/// Stateful converter over one borrowed document.
///
/// The memo cache is keyed by the address of each schema node inside the
/// document and lives only as long as the converter.
pub struct SchemaConverter<'doc> {
    document: &'doc Document,
    options: ConvertOptions,
    table: TypeTable,
    cache: HashMap<*const Schema, TypeId>,
    warnings: Vec<ConversionWarning>,
}

impl<'doc> SchemaConverter<'doc> {
    pub fn new(document: &'doc Document, options: ConvertOptions) -> Self {
        Self {
            document,
            options,
            table: TypeTable::new(),
            cache: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Convert a schema or schema reference.
    ///
    /// Returns `None` if the reference cannot be followed.
    pub fn convert(&mut self, schema: &'doc SchemaRef) -> Option<TypeId> {
        self.convert_ref(schema, "")
    }

    /// Consume the converter, returning the table and collected warnings.
    pub fn finish(self) -> (TypeTable, Vec<ConversionWarning>) {
        (self.table, self.warnings)
    }

    fn convert_ref(&mut self, schema: &'doc SchemaRef, path: &str) -> Option<TypeId> {
        let document = self.document;
        match document.resolve(schema) {
            Some(resolved) => Some(self.convert_schema(resolved, path)),
            None => {
                let reference = match schema {
                    SchemaRef::Reference { reference } => reference.clone(),
                    SchemaRef::Inline(_) => String::new(),
                };
                self.warn(path, WarningKind::UnresolvedSchema { reference });
                None
            }
        }
    }

    fn convert_optional(&mut self, schema: &'doc Option<SchemaRef>, path: &str) -> Option<TypeId> {
        match schema {
            Some(schema) => self.convert_ref(schema, path),
            None => {
                self.warn(path, WarningKind::NilSchema);
                None
            }
        }
    }

    fn convert_schema(&mut self, schema: &'doc Schema, path: &str) -> TypeId {
        if let Some(id) = self.cache.get(&(schema as *const Schema)) {
            return *id;
        }

        if let Some(discriminator) = &schema.discriminator {
            if discriminator.property_name != self.options.discriminator_property {
                self.warn(
                    path,
                    WarningKind::UnsupportedDiscriminator {
                        property: discriminator.property_name.clone(),
                    },
                );
            }
        }

        if !schema.all_of.is_empty() {
            return self.convert_all_of(schema, path);
        }

        if schema.discriminator.is_none() {
            if !schema.any_of.is_empty() {
                return self.convert_union(schema, &schema.any_of, &format!("{}/anyOf", path));
            }
            if !schema.one_of.is_empty() {
                return self.convert_union(schema, &schema.one_of, &format!("{}/oneOf", path));
            }
        }

        let Some(kind) = &schema.kind else {
            return self.convert_any(schema);
        };

        match kind.primary() {
            Some("object") => self.convert_object(schema, path),
            Some("string") => self.convert_string(schema, path),
            Some("boolean") => self.insert(schema, TypeBase::Boolean(BooleanType::default())),
            Some("array") => self.convert_array(schema, path),
            Some("number") | Some("integer") => self.insert(
                schema,
                TypeBase::Number(NumberType {
                    format: schema.format.clone(),
                    min_value: schema.minimum,
                    max_value: schema.maximum,
                }),
            ),
            _ => {
                self.warn(
                    path,
                    WarningKind::UnsupportedType {
                        type_name: kind.describe(),
                    },
                );
                self.convert_any(schema)
            }
        }
    }

    fn convert_all_of(&mut self, schema: &'doc Schema, path: &str) -> TypeId {
        let id = self.insert(
            schema,
            TypeBase::Object(ObjectType {
                name: schema.title.clone(),
                ..Default::default()
            }),
        );

        let mut merged = BTreeMap::new();
        for (index, branch) in schema.all_of.iter().enumerate() {
            let branch_path = format!("{}/allOf/{}", path, index);
            let Some(child) = self.convert_optional(branch, &branch_path) else {
                continue;
            };
            match self.table.get(child) {
                Some(TypeBase::Object(object)) => {
                    // Last branch wins on duplicate property names.
                    merged.extend(object.properties.clone());
                }
                Some(other) => {
                    let actual = other.kind_name().to_string();
                    self.warn(&branch_path, WarningKind::NonObjectAllOfBranch { actual });
                }
                None => {}
            }
        }

        if let Some(TypeBase::Object(object)) = self.table.get_mut(id) {
            object.properties.extend(merged);
        }
        id
    }

    fn convert_union(
        &mut self,
        schema: &'doc Schema,
        alternatives: &'doc [Option<SchemaRef>],
        path: &str,
    ) -> TypeId {
        let id = self.insert(schema, TypeBase::Union(UnionType::default()));

        let mut elements = Vec::with_capacity(alternatives.len());
        for (index, alternative) in alternatives.iter().enumerate() {
            let alternative_path = format!("{}/{}", path, index);
            if let Some(child) = self.convert_optional(alternative, &alternative_path) {
                elements.push(TypeReference::Resolved(child));
            }
        }

        if let Some(TypeBase::Union(union)) = self.table.get_mut(id) {
            union.elements = elements;
        }
        id
    }

    fn convert_object(&mut self, schema: &'doc Schema, path: &str) -> TypeId {
        let id = self.insert(
            schema,
            TypeBase::Object(ObjectType {
                name: schema.title.clone(),
                ..Default::default()
            }),
        );

        let required: HashSet<&str> = schema.required.iter().map(String::as_str).collect();
        let document = self.document;

        let mut properties = BTreeMap::new();
        for (name, value) in &schema.properties {
            let property_path = format!("{}/properties/{}", path, escape_segment(name));
            let Some(value) = value else {
                self.warn(&property_path, WarningKind::NilProperty { name: name.clone() });
                continue;
            };
            let Some(property_schema) = document.resolve(value) else {
                let reference = match value {
                    SchemaRef::Reference { reference } => reference.clone(),
                    SchemaRef::Inline(_) => String::new(),
                };
                self.warn(&property_path, WarningKind::UnresolvedSchema { reference });
                continue;
            };

            let ty = self.convert_schema(property_schema, &property_path);

            let mut property = ObjectProperty::new(ty);
            if required.contains(name.as_str()) {
                property.flags.insert(PropertyFlag::Required);
            }
            if property_schema.read_only {
                property.flags.insert(PropertyFlag::ReadOnly);
            }
            if property_schema.write_only {
                property.flags.insert(PropertyFlag::WriteOnly);
            }
            if !property_schema.description.is_empty() {
                property.description = Some(property_schema.description.clone());
            }
            properties.insert(name.clone(), property);
        }

        let additional_properties = match &schema.additional_properties {
            Some(AdditionalProperties::Schema(additional)) => self
                .convert_ref(additional, &format!("{}/additionalProperties", path))
                .map(TypeReference::Resolved),
            Some(AdditionalProperties::Allowed(_)) | None => None,
        };

        if let Some(TypeBase::Object(object)) = self.table.get_mut(id) {
            object.properties = properties;
            object.additional_properties = additional_properties;
        }
        id
    }

    fn convert_string(&mut self, schema: &'doc Schema, path: &str) -> TypeId {
        let enum_values = schema.enum_values.as_ref().map(|values| {
            let mut literals = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    Value::String(literal) => literals.push(literal.clone()),
                    other => {
                        let actual = json_type_name(other).to_string();
                        self.warn(path, WarningKind::NonStringEnumValue { actual });
                    }
                }
            }
            literals
        });

        self.insert(
            schema,
            TypeBase::String(StringType {
                min_length: schema.min_length,
                max_length: schema.max_length,
                sensitive: false,
                pattern: schema.pattern.clone().filter(|p| !p.is_empty()),
                enum_values,
            }),
        )
    }

    fn convert_array(&mut self, schema: &'doc Schema, path: &str) -> TypeId {
        let id = self.insert(
            schema,
            TypeBase::Array(ArrayType {
                item_type: None,
                min_length: schema.min_items,
                max_length: schema.max_items,
            }),
        );

        let item_type = match &schema.items {
            Some(items) => self
                .convert_ref(items, &format!("{}/items", path))
                .map(TypeReference::Resolved),
            None => {
                self.warn(path, WarningKind::MissingArrayItems);
                None
            }
        };

        if let Some(TypeBase::Array(array)) = self.table.get_mut(id) {
            array.item_type = item_type;
        }
        id
    }

    fn convert_any(&mut self, schema: &'doc Schema) -> TypeId {
        self.insert(
            schema,
            TypeBase::Any(AnyType {
                description: schema.description.clone(),
            }),
        )
    }

    /// Push a type and cache it under the schema node it came from.
    fn insert(&mut self, schema: &'doc Schema, ty: TypeBase) -> TypeId {
        let id = self.table.push(ty);
        self.cache.insert(schema as *const Schema, id);
        id
    }

    fn warn(&mut self, path: &str, kind: WarningKind) {
        warn!(path = %display_path(path), "{}", kind);
        self.warnings.push(ConversionWarning {
            path: path.to_string(),
            kind,
        });
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(components: Value) -> Document {
        serde_json::from_value(json!({ "components": { "schemas": components } })).unwrap()
    }

    fn component(name: &str) -> SchemaRef {
        SchemaRef::Reference {
            reference: format!("#/components/schemas/{}", name),
        }
    }

    fn convert(doc: &Document, name: &str) -> Conversion {
        convert_schema(doc, &component(name), &ConvertOptions::new())
    }

    fn object<'a>(conversion: &'a Conversion, id: TypeId) -> &'a ObjectType {
        conversion
            .types
            .get(id)
            .and_then(TypeBase::as_object)
            .expect("expected object")
    }

    #[test]
    fn converts_primitive_kinds() {
        let doc = document(json!({
            "thing": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "minLength": 1, "maxLength": 5, "pattern": "^a", "enum": ["a", "ab"] },
                    "enabled": { "type": "boolean" },
                    "count": { "type": "number", "format": "int32", "minimum": 0, "maximum": 10 },
                    "size": { "type": "integer" },
                    "extra": { "description": "anything" }
                }
            }
        }));
        let conversion = convert(&doc, "thing");
        assert!(conversion.warnings.is_empty());

        let thing = object(&conversion, conversion.root.unwrap());
        let lookup = |name: &str| conversion.types.lookup(&thing.properties[name].ty).unwrap();

        assert_eq!(
            lookup("name"),
            &TypeBase::String(StringType {
                min_length: Some(1),
                max_length: Some(5),
                sensitive: false,
                pattern: Some("^a".into()),
                enum_values: Some(vec!["a".into(), "ab".into()]),
            })
        );
        assert_eq!(lookup("enabled"), &TypeBase::Boolean(BooleanType::default()));
        assert_eq!(
            lookup("count"),
            &TypeBase::Number(NumberType {
                format: "int32".into(),
                min_value: Some(0.0),
                max_value: Some(10.0),
            })
        );
        assert!(matches!(lookup("size"), TypeBase::Number(_)));
        assert_eq!(
            lookup("extra"),
            &TypeBase::Any(AnyType {
                description: "anything".into()
            })
        );
    }

    #[test]
    fn property_flags_from_schema() {
        let doc = document(json!({
            "user": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "id": { "type": "string", "readOnly": true, "description": "Unique id" },
                    "name": { "type": "string" },
                    "password": { "type": "string", "writeOnly": true }
                }
            }
        }));
        let conversion = convert(&doc, "user");
        let user = object(&conversion, conversion.root.unwrap());

        assert!(user.properties["id"].is_read_only());
        assert_eq!(user.properties["id"].description.as_deref(), Some("Unique id"));
        assert!(user.properties["name"].is_required());
        assert!(user.properties["password"].is_write_only());
        assert!(!user.properties["password"].is_required());
    }

    #[test]
    fn self_reference_terminates() {
        let doc = document(json!({
            "group": {
                "type": "object",
                "title": "group",
                "properties": {
                    "members": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/group" }
                    }
                }
            }
        }));
        let conversion = convert(&doc, "group");
        let root = conversion.root.unwrap();
        assert_eq!(conversion.types.len(), 2);

        let group = object(&conversion, root);
        assert_eq!(group.name, "group");
        let members = conversion.types.lookup(&group.properties["members"].ty).unwrap();
        let TypeBase::Array(array) = members else {
            panic!("expected array");
        };
        assert_eq!(array.item_type, Some(TypeReference::Resolved(root)));
    }

    #[test]
    fn indirect_cycle_terminates() {
        let doc = document(json!({
            "a": { "type": "object", "properties": { "b": { "$ref": "#/components/schemas/b" } } },
            "b": { "type": "object", "properties": { "a": { "$ref": "#/components/schemas/a" } } }
        }));
        let conversion = convert(&doc, "a");
        let a = conversion.root.unwrap();
        let b = conversion.types.lookup(&object(&conversion, a).properties["b"].ty).unwrap();
        let back = &b.as_object().unwrap().properties["a"].ty;
        assert_eq!(back, &TypeReference::Resolved(a));
        assert_eq!(conversion.types.len(), 2);
    }

    #[test]
    fn shared_subschema_converted_once() {
        let doc = document(json!({
            "address": { "type": "object", "properties": { "city": { "type": "string" } } },
            "person": {
                "type": "object",
                "properties": {
                    "home": { "$ref": "#/components/schemas/address" },
                    "work": { "$ref": "#/components/schemas/address" }
                }
            }
        }));
        let conversion = convert(&doc, "person");
        let person = object(&conversion, conversion.root.unwrap());
        assert_eq!(person.properties["home"].ty, person.properties["work"].ty);
    }

    #[test]
    fn all_of_merges_properties() {
        let doc = document(json!({
            "entity": { "type": "object", "properties": { "a": { "type": "string" } } },
            "derived": {
                "allOf": [
                    { "$ref": "#/components/schemas/entity" },
                    { "type": "object", "properties": { "b": { "type": "boolean" } } }
                ]
            }
        }));
        let conversion = convert(&doc, "derived");
        let derived = object(&conversion, conversion.root.unwrap());
        let keys: Vec<&str> = derived.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn all_of_last_branch_wins() {
        let doc = document(json!({
            "merged": {
                "allOf": [
                    { "type": "object", "properties": { "a": { "type": "string" } } },
                    { "type": "object", "properties": { "a": { "type": "boolean" } } }
                ]
            }
        }));
        let conversion = convert(&doc, "merged");
        let merged = object(&conversion, conversion.root.unwrap());
        let a = conversion.types.lookup(&merged.properties["a"].ty).unwrap();
        assert!(matches!(a, TypeBase::Boolean(_)));
    }

    #[test]
    fn all_of_skips_non_object_branch() {
        let doc = document(json!({
            "merged": {
                "allOf": [
                    { "type": "string" },
                    { "type": "object", "properties": { "a": { "type": "string" } } }
                ]
            }
        }));
        let conversion = convert(&doc, "merged");
        let merged = object(&conversion, conversion.root.unwrap());
        assert_eq!(merged.properties.len(), 1);
        assert_eq!(
            conversion.warnings[0].kind,
            WarningKind::NonObjectAllOfBranch {
                actual: "string".into()
            }
        );
        assert_eq!(conversion.warnings[0].path, "/allOf/0");
    }

    #[test]
    fn any_of_and_one_of_become_unions() {
        let doc = document(json!({
            "either": { "anyOf": [{ "type": "string" }, { "type": "number" }] },
            "exactly": { "oneOf": [{ "type": "boolean" }] }
        }));

        let conversion = convert(&doc, "either");
        let TypeBase::Union(union) = conversion.types.get(conversion.root.unwrap()).unwrap() else {
            panic!("expected union");
        };
        assert_eq!(union.elements.len(), 2);

        let conversion = convert(&doc, "exactly");
        assert!(matches!(
            conversion.types.get(conversion.root.unwrap()),
            Some(TypeBase::Union(_))
        ));
    }

    #[test]
    fn discriminated_one_of_is_not_a_union() {
        let doc = document(json!({
            "shape": {
                "type": "object",
                "discriminator": { "propertyName": "@odata.type" },
                "oneOf": [{ "type": "object" }],
                "properties": { "@odata.type": { "type": "string" } }
            }
        }));
        let conversion = convert(&doc, "shape");
        assert!(conversion.warnings.is_empty());
        let shape = object(&conversion, conversion.root.unwrap());
        assert!(shape.properties.contains_key("@odata.type"));
    }

    #[test]
    fn unexpected_discriminator_warns() {
        let doc = document(json!({
            "shape": { "type": "object", "discriminator": { "propertyName": "kind" } }
        }));
        let conversion = convert(&doc, "shape");
        assert_eq!(
            conversion.warnings,
            vec![ConversionWarning {
                path: String::new(),
                kind: WarningKind::UnsupportedDiscriminator {
                    property: "kind".into()
                },
            }]
        );

        let options = ConvertOptions::new().discriminator("kind");
        let conversion = convert_schema(&doc, &component("shape"), &options);
        assert!(conversion.warnings.is_empty());
    }

    #[test]
    fn degraded_shapes_produce_warnings() {
        let doc = document(json!({
            "odd": {
                "type": "object",
                "properties": {
                    "gone": null,
                    "dangling": { "$ref": "#/components/schemas/missing" },
                    "list": { "type": "array" },
                    "file": { "type": "file" },
                    "level": { "type": "string", "enum": ["low", 3] }
                }
            }
        }));
        let conversion = convert(&doc, "odd");
        let odd = object(&conversion, conversion.root.unwrap());

        assert!(!odd.properties.contains_key("gone"));
        assert!(!odd.properties.contains_key("dangling"));
        assert!(matches!(
            conversion.types.lookup(&odd.properties["file"].ty),
            Some(TypeBase::Any(_))
        ));

        let kinds: Vec<&WarningKind> = conversion.warnings.iter().map(|w| &w.kind).collect();
        assert!(kinds.contains(&&WarningKind::NilProperty { name: "gone".into() }));
        assert!(kinds.contains(&&WarningKind::UnresolvedSchema {
            reference: "#/components/schemas/missing".into()
        }));
        assert!(kinds.contains(&&WarningKind::MissingArrayItems));
        assert!(kinds.contains(&&WarningKind::UnsupportedType {
            type_name: "file".into()
        }));
        assert!(kinds.contains(&&WarningKind::NonStringEnumValue {
            actual: "number".into()
        }));
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let warning = ConversionWarning {
            path: "/properties/file".into(),
            kind: WarningKind::UnsupportedType {
                type_name: "file".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&warning).unwrap(),
            json!({"path": "/properties/file", "kind": "unsupportedType", "type": "file"})
        );
        assert_eq!(
            warning.to_string(),
            "/properties/file: unsupported type \"file\", treating as any"
        );

        let warning = ConversionWarning {
            path: String::new(),
            kind: WarningKind::UnsupportedDiscriminator {
                property: "kind".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&warning).unwrap(),
            json!({"path": "", "kind": "unsupportedDiscriminator", "property": "kind"})
        );
    }

    #[test]
    fn unresolvable_root_is_none() {
        let doc = document(json!({}));
        let conversion = convert(&doc, "missing");
        assert!(conversion.root.is_none());
        assert!(conversion.types.is_empty());
        assert_eq!(conversion.warnings.len(), 1);
    }

    #[test]
    fn additional_properties_schema() {
        let doc = document(json!({
            "labels": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "open": { "type": "object", "additionalProperties": true }
        }));
        let conversion = convert(&doc, "labels");
        let labels = object(&conversion, conversion.root.unwrap());
        let additional = labels.additional_properties.as_ref().unwrap();
        assert!(matches!(
            conversion.types.lookup(additional),
            Some(TypeBase::String(_))
        ));

        let conversion = convert(&doc, "open");
        assert!(object(&conversion, conversion.root.unwrap())
            .additional_properties
            .is_none());
    }

    #[test]
    fn nullable_type_list() {
        let doc = document(json!({
            "maybe": { "type": ["string", "null"], "maxLength": 3 }
        }));
        let conversion = convert(&doc, "maybe");
        assert!(matches!(
            conversion.types.get(conversion.root.unwrap()),
            Some(TypeBase::String(StringType { max_length: Some(3), .. }))
        ));
    }

    #[test]
    fn converted_table_round_trips_through_json() {
        let doc = document(json!({
            "group": {
                "type": "object",
                "properties": {
                    "members": { "type": "array", "items": { "$ref": "#/components/schemas/group" } }
                }
            }
        }));
        let conversion = convert(&doc, "group");
        let json = serde_json::to_string(&conversion.types).unwrap();

        let mut parsed: TypeTable = serde_json::from_str(&json).unwrap();
        assert!(parsed.resolve_references().is_empty());
        assert_eq!(parsed, conversion.types);
    }
}
