//! Payload validation against the type model.
//!
//! Validation never stops at the first problem: every variant returns the
//! full list of errors it found, path-qualified with a dotted breadcrumb.
//! A `null` value is always accepted; requiredness is checked by the
//! enclosing object.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::error::ValidationError;
use crate::ir::{
    ArrayType, NumberType, ObjectType, StringType, TypeBase, TypeId, TypeTable, UnionType,
};
use crate::types::json_type_name;

/// Compiled patterns, `None` for patterns that failed to compile.
static PATTERNS: Lazy<Mutex<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl TypeTable {
    /// Validate `value` against the type stored at `root`.
    ///
    /// An empty slot validates everything.
    pub fn validate(&self, root: TypeId, value: &Value) -> Vec<ValidationError> {
        match self.get(root) {
            Some(ty) => ty.validate(self, value, ""),
            None => Vec::new(),
        }
    }
}

impl TypeBase {
    /// Validate `value` at `path`, following references through `table`.
    pub fn validate(&self, table: &TypeTable, value: &Value, path: &str) -> Vec<ValidationError> {
        match self {
            TypeBase::Any(_) | TypeBase::Boolean(_) => Vec::new(),
            TypeBase::Number(number) => number.validate(value, path),
            TypeBase::String(string) => string.validate(value, path),
            TypeBase::Array(array) => array.validate(table, value, path),
            TypeBase::Object(object) => object.validate(table, value, path),
            TypeBase::Union(union) => union.validate(table, value, path),
        }
    }
}

impl NumberType {
    pub fn validate(&self, value: &Value, path: &str) -> Vec<ValidationError> {
        let number = match value {
            Value::Null => return Vec::new(),
            Value::Number(number) => number,
            other => {
                return vec![ValidationError::mismatch(
                    path,
                    "number",
                    json_type_name(other),
                )]
            }
        };

        // Some producers encode integers as floats, so floats skip the bounds.
        let Some(n) = integer_value(number) else {
            return Vec::new();
        };

        if let Some(min) = self.min_value {
            if n < min {
                return vec![ValidationError::constraint(
                    path,
                    format!("value is less than {}", min),
                )];
            }
        }
        if let Some(max) = self.max_value {
            if n > max {
                return vec![ValidationError::constraint(
                    path,
                    format!("value is greater than {}", max),
                )];
            }
        }
        Vec::new()
    }
}

fn integer_value(number: &Number) -> Option<f64> {
    if number.is_f64() {
        return None;
    }
    number
        .as_i64()
        .map(|n| n as f64)
        .or_else(|| number.as_u64().map(|n| n as f64))
}

impl StringType {
    pub fn validate(&self, value: &Value, path: &str) -> Vec<ValidationError> {
        let s = match value {
            Value::Null => return Vec::new(),
            Value::String(s) => s,
            other => {
                return vec![ValidationError::mismatch(
                    path,
                    "string",
                    json_type_name(other),
                )]
            }
        };

        // Unknown values arrive as "", which is accepted as unset.
        if s.is_empty() {
            return Vec::new();
        }

        // Bounds apply to the UTF-8 encoded length.
        let len = s.len() as u64;
        if let Some(min) = self.min_length {
            if len < min {
                return vec![ValidationError::constraint(
                    path,
                    format!("string length is less than {}", min),
                )];
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return vec![ValidationError::constraint(
                    path,
                    format!("string length is greater than {}", max),
                )];
            }
        }

        if let Some(pattern) = &self.pattern {
            if matches_pattern(pattern, s) == Some(false) {
                return vec![ValidationError::constraint(
                    path,
                    format!("string does not match pattern {}", pattern),
                )];
            }
        }
        Vec::new()
    }
}

/// Returns `None` when the pattern does not compile.
fn matches_pattern(pattern: &str, s: &str) -> Option<bool> {
    let mut patterns = match PATTERNS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let compiled = patterns
        .entry(pattern.to_string())
        .or_insert_with(|| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("skipping invalid pattern {}: {}", pattern, err);
                None
            }
        });
    compiled.as_ref().map(|regex| regex.is_match(s))
}

impl ArrayType {
    pub fn validate(&self, table: &TypeTable, value: &Value, path: &str) -> Vec<ValidationError> {
        let items = match value {
            Value::Null => return Vec::new(),
            Value::Array(items) => items,
            other => {
                return vec![ValidationError::mismatch(
                    path,
                    "array",
                    json_type_name(other),
                )]
            }
        };

        let mut errors = Vec::new();
        let len = items.len() as u64;
        if let Some(min) = self.min_length {
            if len < min {
                errors.push(ValidationError::constraint(
                    path,
                    format!("array length is less than {}", min),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                errors.push(ValidationError::constraint(
                    path,
                    format!("array length is greater than {}", max),
                ));
            }
        }

        if let Some(item_type) = self.item_type.as_ref().and_then(|r| table.lookup(r)) {
            for (index, item) in items.iter().enumerate() {
                let item_path = join_path(path, &index.to_string());
                errors.extend(item_type.validate(table, item, &item_path));
            }
        }
        errors
    }
}

impl ObjectType {
    pub fn validate(&self, table: &TypeTable, value: &Value, path: &str) -> Vec<ValidationError> {
        let map = match value {
            Value::Null => return Vec::new(),
            Value::Object(map) => map,
            other => {
                return vec![ValidationError::mismatch(
                    path,
                    "object",
                    json_type_name(other),
                )]
            }
        };

        let mut errors = Vec::new();
        for (name, property) in &self.properties {
            let property_path = join_path(path, name);
            match map.get(name) {
                None => {
                    if property.is_required() {
                        errors.push(ValidationError::missing_required(&property_path));
                    }
                }
                Some(field) => {
                    if let Some(ty) = table.lookup(&property.ty) {
                        errors.extend(ty.validate(table, field, &property_path));
                    }
                }
            }
        }

        if let Some(additional) = self
            .additional_properties
            .as_ref()
            .and_then(|r| table.lookup(r))
        {
            for (name, field) in undeclared(map, self) {
                errors.extend(additional.validate(table, field, &join_path(path, name)));
            }
        }
        errors
    }
}

/// Entries of `map` that are not declared as properties of `object`.
pub(crate) fn undeclared<'a>(
    map: &'a Map<String, Value>,
    object: &'a ObjectType,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    map.iter()
        .filter(move |(name, _)| !object.properties.contains_key(name.as_str()))
}

impl UnionType {
    pub fn validate(&self, table: &TypeTable, value: &Value, path: &str) -> Vec<ValidationError> {
        if value.is_null() {
            return Vec::new();
        }

        let matched = self
            .elements
            .iter()
            .filter_map(|element| table.lookup(element))
            .any(|alternative| alternative.validate(table, value, path).is_empty());

        if matched {
            Vec::new()
        } else {
            vec![ValidationError::no_alternative_matched(path)]
        }
    }
}

fn join_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}
