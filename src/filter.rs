//! Field filtering - projects payloads onto read-only or configurable fields.
//!
//! Filtering is a best-effort projection applied after validation: values
//! whose shape does not match the type become `null` instead of producing
//! an error. Only objects select fields; every scalar variant (and unions)
//! pass values through unchanged.

use serde_json::{Map, Value};

use crate::ir::{ArrayType, ObjectType, TypeBase, TypeId, TypeTable};
use crate::validator::undeclared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    ReadOnly,
    Configurable,
}

impl TypeTable {
    /// Keep only the fields a server populates, starting at `root`.
    pub fn filter_read_only(&self, root: TypeId, value: &Value) -> Value {
        match self.get(root) {
            Some(ty) => ty.filter_read_only(self, value),
            None => value.clone(),
        }
    }

    /// Keep only the fields a client may set, starting at `root`.
    pub fn filter_configurable(&self, root: TypeId, value: &Value) -> Value {
        match self.get(root) {
            Some(ty) => ty.filter_configurable(self, value),
            None => value.clone(),
        }
    }
}

impl TypeBase {
    pub fn filter_read_only(&self, table: &TypeTable, value: &Value) -> Value {
        self.project(table, value, Projection::ReadOnly)
    }

    pub fn filter_configurable(&self, table: &TypeTable, value: &Value) -> Value {
        self.project(table, value, Projection::Configurable)
    }

    fn project(&self, table: &TypeTable, value: &Value, projection: Projection) -> Value {
        match self {
            TypeBase::Any(_)
            | TypeBase::Boolean(_)
            | TypeBase::Number(_)
            | TypeBase::String(_)
            | TypeBase::Union(_) => value.clone(),
            TypeBase::Array(array) => array.project(table, value, projection),
            TypeBase::Object(object) => object.project(table, value, projection),
        }
    }
}

impl ArrayType {
    fn project(&self, table: &TypeTable, value: &Value, projection: Projection) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let Some(item_type) = self.item_type.as_ref() else {
            return value.clone();
        };
        let Value::Array(items) = value else {
            return Value::Null;
        };

        let projected = items
            .iter()
            .map(|item| match table.lookup(item_type) {
                Some(ty) => ty.project(table, item, projection),
                None => item.clone(),
            })
            .collect();
        Value::Array(projected)
    }
}

impl ObjectType {
    fn project(&self, table: &TypeTable, value: &Value, projection: Projection) -> Value {
        let Value::Object(map) = value else {
            return Value::Null;
        };

        let mut result = Map::new();
        for (name, property) in &self.properties {
            let keep = match projection {
                Projection::ReadOnly => property.is_read_only(),
                Projection::Configurable => !property.is_read_only(),
            };
            if !keep {
                continue;
            }
            let Some(field) = map.get(name) else {
                continue;
            };
            let projected = match table.lookup(&property.ty) {
                Some(ty) => ty.project(table, field, projection),
                None => field.clone(),
            };
            result.insert(name.clone(), projected);
        }

        if projection == Projection::Configurable {
            if let Some(additional) = self.additional_properties.as_ref() {
                for (name, field) in undeclared(map, self) {
                    let projected = match table.lookup(additional) {
                        Some(ty) => ty.project(table, field, projection),
                        None => field.clone(),
                    };
                    result.insert(name.clone(), projected);
                }
            }
        }

        Value::Object(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NumberType, ObjectProperty, StringType, UnionType};
    use crate::reference::TypeReference;
    use crate::types::PropertyFlag;
    use serde_json::json;

    /// `{id: readOnly string, name: string, tags: [tag]}` where tag is
    /// `{created: readOnly number, label: string}`.
    fn resource_table() -> (TypeTable, TypeId) {
        let mut table = TypeTable::new();
        let string = table.push(TypeBase::String(StringType::default()));
        let number = table.push(TypeBase::Number(NumberType::default()));

        let mut tag = ObjectType::default();
        tag.properties.insert(
            "created".into(),
            ObjectProperty::new(number).flag(PropertyFlag::ReadOnly),
        );
        tag.properties
            .insert("label".into(), ObjectProperty::new(string));
        let tag = table.push(TypeBase::Object(tag));
        let tags = table.push(TypeBase::Array(ArrayType {
            item_type: Some(TypeReference::Resolved(tag)),
            ..Default::default()
        }));

        let mut resource = ObjectType::default();
        resource.properties.insert(
            "id".into(),
            ObjectProperty::new(string).flag(PropertyFlag::ReadOnly),
        );
        resource
            .properties
            .insert("name".into(), ObjectProperty::new(string));
        resource
            .properties
            .insert("tags".into(), ObjectProperty::new(tags));
        let resource = table.push(TypeBase::Object(resource));
        (table, resource)
    }

    #[test]
    fn read_only_and_configurable_partition() {
        let (table, root) = resource_table();
        let value = json!({"id": "1", "name": "n"});

        let read_only = table.filter_read_only(root, &value);
        let configurable = table.filter_configurable(root, &value);
        assert_eq!(read_only, json!({"id": "1"}));
        assert_eq!(configurable, json!({"name": "n"}));

        let read_keys: Vec<&String> = read_only.as_object().unwrap().keys().collect();
        let config_keys: Vec<&String> = configurable.as_object().unwrap().keys().collect();
        assert!(read_keys.iter().all(|k| !config_keys.contains(k)));
    }

    #[test]
    fn filters_recurse_through_arrays() {
        let (table, root) = resource_table();
        let value = json!({
            "id": "1",
            "name": "n",
            "tags": [{"created": 3, "label": "a"}, {"label": "b"}]
        });

        assert_eq!(
            table.filter_configurable(root, &value),
            json!({"name": "n", "tags": [{"label": "a"}, {"label": "b"}]})
        );
        // `tags` itself is not read-only, so it is dropped from the read-only view.
        assert_eq!(table.filter_read_only(root, &value), json!({"id": "1"}));
    }

    #[test]
    fn undeclared_keys_are_dropped() {
        let (table, root) = resource_table();
        let value = json!({"name": "n", "extra": true});
        assert_eq!(table.filter_configurable(root, &value), json!({"name": "n"}));
    }

    #[test]
    fn shape_mismatch_yields_null() {
        let (table, root) = resource_table();
        assert_eq!(table.filter_read_only(root, &json!("nope")), Value::Null);
        assert_eq!(
            table.filter_configurable(root, &json!({"tags": "nope"})),
            json!({"tags": null})
        );
    }

    #[test]
    fn scalars_and_unions_are_identity() {
        let mut table = TypeTable::new();
        let string = table.push(TypeBase::String(StringType::default()));
        let union = table.push(TypeBase::Union(UnionType {
            elements: vec![TypeReference::Resolved(string)],
        }));

        let value = json!({"id": "1"});
        assert_eq!(table.filter_read_only(string, &value), value);
        assert_eq!(table.filter_configurable(union, &value), value);
    }

    #[test]
    fn array_without_item_type_is_identity() {
        let mut table = TypeTable::new();
        let array = table.push(TypeBase::Array(ArrayType::default()));
        assert_eq!(table.filter_read_only(array, &json!([1, 2])), json!([1, 2]));
        assert_eq!(table.filter_read_only(array, &Value::Null), Value::Null);
    }

    #[test]
    fn additional_properties_kept_when_configurable() {
        let mut table = TypeTable::new();
        let string = table.push(TypeBase::String(StringType::default()));
        let labels = table.push(TypeBase::Object(ObjectType {
            additional_properties: Some(TypeReference::Resolved(string)),
            ..Default::default()
        }));

        let value = json!({"env": "prod"});
        assert_eq!(table.filter_configurable(labels, &value), value);
        assert_eq!(table.filter_read_only(labels, &value), json!({}));
    }
}
