//! OpenAPI Type Model
//!
//! Compiles OpenAPI request-body schemas into a compact, flat type model and
//! runs two operations over it: structural validation of decoded JSON
//! payloads, and field filtering into server-populated (read-only) and
//! client-settable (configurable) subsets.
//!
//! # Example
//!
//! ```
//! use openapi_typemodel::{convert_schema, ConvertOptions, Document, SchemaRef};
//! use serde_json::json;
//!
//! let document: Document = serde_json::from_value(json!({
//!     "components": {
//!         "schemas": {
//!             "group": {
//!                 "type": "object",
//!                 "required": ["displayName"],
//!                 "properties": {
//!                     "id": { "type": "string", "readOnly": true },
//!                     "displayName": { "type": "string", "minLength": 1 },
//!                     "members": {
//!                         "type": "array",
//!                         "items": { "$ref": "#/components/schemas/group" }
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let root = SchemaRef::Reference {
//!     reference: "#/components/schemas/group".into(),
//! };
//! let conversion = convert_schema(&document, &root, &ConvertOptions::new());
//! let group = conversion.root.unwrap();
//!
//! let errors = conversion.types.validate(group, &json!({ "members": [{}] }));
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors[0].path, "displayName");
//! assert_eq!(errors[1].path, "members.0.displayName");
//!
//! let payload = json!({ "id": "1", "displayName": "Admins" });
//! assert_eq!(
//!     conversion.types.filter_configurable(group, &payload),
//!     json!({ "displayName": "Admins" })
//! );
//! assert_eq!(
//!     conversion.types.filter_read_only(group, &payload),
//!     json!({ "id": "1" })
//! );
//! ```
//!
//! # Type Variants
//!
//! | `$type` | Validation | Filtering |
//! |---------|------------|-----------|
//! | `any` | always valid | identity |
//! | `boolean` | always valid | identity |
//! | `number` | kind, integer bounds | identity |
//! | `string` | kind, length, pattern | identity |
//! | `array` | kind, length, every item | every item |
//! | `object` | kind, required properties, every property | selects properties by flag |
//! | `union` | at least one alternative | identity |

mod catalog;
mod convert;
mod document;
mod error;
mod filter;
mod ir;
mod loader;
mod reference;
mod types;
mod validator;

pub use catalog::{normalize_templated_path, Catalog, ResourceDefinition, ResourceType};
pub use convert::{convert_schema, Conversion, ConversionWarning, SchemaConverter, WarningKind};
pub use document::{
    AdditionalProperties, Components, Discriminator, Document, ExternalDocs, MediaType,
    Operation, PathItem, RequestBody, Schema, SchemaKind, SchemaRef,
};
pub use error::{LoadError, ReferenceError, ValidationError, ValidationErrorKind};
pub use ir::{
    AnyType, ArrayType, BooleanType, NumberType, ObjectProperty, ObjectType, StringType,
    TypeBase, TypeId, TypeTable, UnionType,
};
pub use loader::{
    load_document, load_document_str, load_payload, DirectorySource, DocumentFormat,
    DocumentSource, StaticSource,
};
pub use reference::TypeReference;
pub use types::{
    json_type_name, CatalogOptions, ConvertOptions, Method, PropertyFlag, DEFAULT_API_VERSIONS,
    DEFAULT_DISCRIMINATOR,
};
