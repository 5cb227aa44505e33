//! Resource catalog - finds resource-like endpoints and builds their body types.
//!
//! A resource is a collection path with a POST whose item path (the same
//! path followed by one templated segment) has both a GET and a DELETE.
//! Parsed documents are cached per API version behind a mutex so that
//! concurrent callers load each version at most once.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use crate::convert::{ConversionWarning, SchemaConverter};
use crate::document::{Document, ExternalDocs, Operation};
use crate::error::LoadError;
use crate::ir::TypeTable;
use crate::loader::DocumentSource;
use crate::reference::TypeReference;
use crate::types::{CatalogOptions, Method, JSON_MEDIA_TYPE};

/// A creatable or readable endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    #[serde(rename = "$type")]
    pub kind: &'static str,
    pub url: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<TypeReference>,
}

impl ResourceType {
    fn from_operation(url: &str, operation: &Operation) -> Self {
        Self {
            kind: "resource",
            url: url.to_string(),
            name: operation.summary.clone(),
            description: operation.description.clone(),
            external_docs: operation.external_docs.clone(),
            body: None,
        }
    }
}

/// A resource together with the type table its body refers into.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDefinition {
    pub resource: ResourceType,
    pub types: TypeTable,
    pub warnings: Vec<ConversionWarning>,
}

/// Lists resources and converts their request bodies.
pub struct Catalog<S> {
    source: S,
    options: CatalogOptions,
    documents: Mutex<HashMap<String, Arc<Document>>>,
}

impl<S: DocumentSource> Catalog<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, CatalogOptions::new())
    }

    pub fn with_options(source: S, options: CatalogOptions) -> Self {
        Self {
            source,
            options,
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// API versions this catalog serves.
    pub fn list_api_versions(&self) -> Vec<String> {
        self.options.api_versions.clone()
    }

    /// The parsed document for `api_version`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the source's load error; failures are not cached.
    pub fn document(&self, api_version: &str) -> Result<Arc<Document>, LoadError> {
        let mut documents = match self.documents.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(document) = documents.get(api_version) {
            return Ok(Arc::clone(document));
        }

        debug!(api_version, "parsing document");
        let document = Arc::new(self.source.load(api_version)?);
        documents.insert(api_version.to_string(), Arc::clone(&document));
        Ok(document)
    }

    /// Resources that can be created (POST) and then read and deleted by id.
    ///
    /// Sorted by name.
    pub fn list_resources(&self, api_version: &str) -> Result<Vec<ResourceType>, LoadError> {
        let document = self.document(api_version)?;

        let mut by_template = HashMap::new();
        for (path, item) in &document.paths {
            let (normalized, _, _) = normalize_templated_path(path);
            by_template.insert(normalized, (path.as_str(), item));
        }

        let mut resources = Vec::new();
        for (template, (url, item)) in &by_template {
            let Some(post) = item.post.as_ref() else {
                continue;
            };

            if !template.contains("/$ref") {
                let item_template = format!("{}/{{}}", template);
                let Some((_, item_path)) = by_template.get(&item_template) else {
                    continue;
                };
                if item_path.get.is_none() || item_path.delete.is_none() {
                    continue;
                }
            }

            resources.push(ResourceType::from_operation(url, post));
        }

        sort_by_name(&mut resources);
        Ok(resources)
    }

    /// Every path with a GET operation, sorted by name.
    pub fn list_readable_resources(
        &self,
        api_version: &str,
    ) -> Result<Vec<ResourceType>, LoadError> {
        let document = self.document(api_version)?;

        let mut resources: Vec<ResourceType> = document
            .paths
            .iter()
            .filter_map(|(path, item)| {
                item.get
                    .as_ref()
                    .map(|get| ResourceType::from_operation(path, get))
            })
            .collect();

        sort_by_name(&mut resources);
        Ok(resources)
    }

    /// Convert the JSON request body of the POST under `url`.
    ///
    /// Returns `Ok(None)` when there is no such operation or it has no JSON
    /// request body schema. A body schema that cannot be resolved yields a
    /// definition without `body`, carrying the conversion warnings.
    pub fn resource_definition(
        &self,
        api_version: &str,
        url: &str,
    ) -> Result<Option<ResourceDefinition>, LoadError> {
        let document = self.document(api_version)?;

        let Some(post) = document.find_operation(url, Method::Post) else {
            return Ok(None);
        };
        let Some(schema) = post.request_schema(JSON_MEDIA_TYPE) else {
            return Ok(None);
        };

        let mut converter = SchemaConverter::new(&document, self.options.convert.clone());
        let body = converter.convert(schema);
        let (types, warnings) = converter.finish();

        let mut resource = ResourceType::from_operation(url, post);
        resource.body = body.map(TypeReference::Resolved);

        Ok(Some(ResourceDefinition {
            resource,
            types,
            warnings,
        }))
    }
}

fn sort_by_name(resources: &mut [ResourceType]) {
    resources.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.url.cmp(&b.url)));
}

/// Collapse every `{variable}` segment of a path template to `{}`.
///
/// Returns the normalized path, the number of variables and their names.
/// Wildcard variables collapse too: `{path*}` becomes `{}`.
pub fn normalize_templated_path(path: &str) -> (String, usize, BTreeSet<String>) {
    if !path.contains('{') {
        return (path.to_string(), 0, BTreeSet::new());
    }

    let mut template = String::with_capacity(path.len());
    let mut variables = BTreeSet::new();
    let mut variable = String::new();
    let mut count = 0;
    let mut in_variable = false;

    for c in path.chars() {
        if in_variable {
            if c != '}' {
                variable.push(c);
                continue;
            }
            in_variable = false;
            variables.insert(std::mem::take(&mut variable));
        } else if c == '{' {
            in_variable = true;
            count += 1;
        }
        template.push(c);
    }

    (template, count, variables)
}
