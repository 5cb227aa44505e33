//! Core vocabulary shared by the converter, validator and catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator property the source documents use for polymorphic types.
///
/// Discriminators on any other property are reported as unsupported.
pub const DEFAULT_DISCRIMINATOR: &str = "@odata.type";

/// API versions served when no explicit list is configured.
pub const DEFAULT_API_VERSIONS: &[&str] = &["v1.0", "beta"];

/// Media type whose request-body schema describes a resource.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Flag attached to an object property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyFlag {
    /// The property must be present in a payload.
    Required,
    /// The property is populated by the server and never sent by a client.
    ReadOnly,
    /// The property is accepted on input but never returned.
    WriteOnly,
}

/// HTTP method of an operation in a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

/// Options for schema conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Discriminator property that is understood by the type model.
    pub discriminator_property: String,
}

impl ConvertOptions {
    /// Create options with the default discriminator property.
    pub fn new() -> Self {
        Self {
            discriminator_property: DEFAULT_DISCRIMINATOR.to_string(),
        }
    }

    /// Set the expected discriminator property.
    pub fn discriminator(mut self, property: impl Into<String>) -> Self {
        self.discriminator_property = property.into();
        self
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for a resource catalog.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// API versions the catalog reports, in order.
    pub api_versions: Vec<String>,
    /// Options forwarded to the schema converter.
    pub convert: ConvertOptions,
}

impl CatalogOptions {
    /// Create options serving the default API versions.
    pub fn new() -> Self {
        Self {
            api_versions: DEFAULT_API_VERSIONS.iter().map(|v| v.to_string()).collect(),
            convert: ConvertOptions::new(),
        }
    }

    /// Replace the served API versions.
    pub fn api_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the converter options.
    pub fn convert(mut self, convert: ConvertOptions) -> Self {
        self.convert = convert;
        self
    }
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self::new()
    }
}
