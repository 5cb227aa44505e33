//! OpenAPI document model.
//!
//! Only the parts of an OpenAPI 3 document that the type model consumes are
//! modelled; everything else is ignored during deserialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::normalize_templated_path;
use crate::types::Method;

const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// A parsed OpenAPI document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default)]
    pub components: Components,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaRef>,
}

/// Operations available under one path template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
    pub patch: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
}

impl PathItem {
    /// Returns the operation registered for `method`, if any.
    pub fn operation(&self, method: Method) -> Option<&Operation> {
        match method {
            Method::Get => self.get.as_ref(),
            Method::Post => self.post.as_ref(),
            Method::Put => self.put.as_ref(),
            Method::Patch => self.patch.as_ref(),
            Method::Delete => self.delete.as_ref(),
            Method::Options => self.options.as_ref(),
            Method::Head => self.head.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub external_docs: Option<ExternalDocs>,
    pub request_body: Option<RequestBody>,
}

impl Operation {
    /// Schema of the request body for the given media type.
    pub fn request_schema(&self, media_type: &str) -> Option<&SchemaRef> {
        self.request_body
            .as_ref()?
            .content
            .get(media_type)?
            .schema
            .as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDocs {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<SchemaRef>,
}

/// Either a `$ref` pointer or an inline schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline(Box<Schema>),
}

/// Declared `type` of a schema: a single kind or, in OpenAPI 3.1, a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SchemaKind {
    Single(String),
    Multiple(Vec<String>),
}

impl SchemaKind {
    /// The single non-null kind this declaration names, if there is one.
    pub fn primary(&self) -> Option<&str> {
        match self {
            SchemaKind::Single(kind) => Some(kind.as_str()),
            SchemaKind::Multiple(kinds) => {
                let mut non_null = kinds.iter().filter(|k| k.as_str() != "null");
                match (non_null.next(), non_null.next()) {
                    (Some(kind), None) => Some(kind.as_str()),
                    _ => None,
                }
            }
        }
    }

    /// Human-readable form for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            SchemaKind::Single(kind) => kind.clone(),
            SchemaKind::Multiple(kinds) => kinds.join("|"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
}

/// `additionalProperties` may be a boolean or a schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(SchemaRef),
}

/// A single schema node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: Option<SchemaKind>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub properties: IndexMap<String, Option<SchemaRef>>,
    #[serde(default)]
    pub required: Vec<String>,
    pub additional_properties: Option<AdditionalProperties>,
    pub items: Option<SchemaRef>,

    #[serde(default)]
    pub all_of: Vec<Option<SchemaRef>>,
    #[serde(default)]
    pub any_of: Vec<Option<SchemaRef>>,
    #[serde(default)]
    pub one_of: Vec<Option<SchemaRef>>,
    pub discriminator: Option<Discriminator>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
}

impl Document {
    /// Follow a schema reference to the schema node it denotes.
    ///
    /// Only local `#/components/schemas/...` pointers are understood; chains
    /// of references are followed. Returns `None` for unknown or external
    /// pointers and for reference loops that never reach a schema.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaRef) -> Option<&'a Schema> {
        let mut current = schema;
        for _ in 0..=self.components.schemas.len() {
            match current {
                SchemaRef::Inline(schema) => return Some(schema),
                SchemaRef::Reference { reference } => {
                    current = self.component(reference)?;
                }
            }
        }
        None
    }

    fn component(&self, reference: &str) -> Option<&SchemaRef> {
        let name = reference.strip_prefix(COMPONENT_SCHEMA_PREFIX)?;
        let name = name.replace("~1", "/").replace("~0", "~");
        self.components.schemas.get(&name)
    }

    /// Locate the operation for `method` under `url`.
    ///
    /// A missing leading `/` is added. The path table is matched literally
    /// first, then structurally with templated segments collapsed, so
    /// `/groups/{id}` finds a path declared as `/groups/{group-id}`.
    pub fn find_operation(&self, url: &str, method: Method) -> Option<&Operation> {
        self.find_path(url)?.operation(method)
    }

    /// Locate the path item for `url`, see [`Document::find_operation`].
    pub fn find_path(&self, url: &str) -> Option<&PathItem> {
        let url = if url.starts_with('/') {
            url.to_string()
        } else {
            format!("/{}", url)
        };

        if let Some(item) = self.paths.get(&url) {
            return Some(item);
        }

        let (normalized, _, _) = normalize_templated_path(&url);
        self.paths
            .iter()
            .find(|(path, _)| normalize_templated_path(path).0 == normalized)
            .map(|(_, item)| item)
    }
}
