//! Document loading from files, strings and per-version directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::Document;
use crate::error::LoadError;

/// File names probed, in order, inside a version directory.
const DOCUMENT_FILE_NAMES: &[&str] = &["openapi.yaml", "openapi.yml", "openapi.json"];

/// Serialization format of an OpenAPI document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Guess the format from a file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content isn't a valid document.
pub fn load_document(path: &Path) -> Result<Document, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content, DocumentFormat::from_path(path))
}

/// Load a document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::InvalidYaml` if the
/// content doesn't parse.
pub fn load_document_str(content: &str, format: DocumentFormat) -> Result<Document, LoadError> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
        }
    }
}

/// Load a JSON payload to validate or filter.
pub fn load_payload(path: &Path) -> Result<serde_json::Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Where a catalog gets the document for each API version.
pub trait DocumentSource {
    /// Load and parse the document for `api_version`.
    fn load(&self, api_version: &str) -> Result<Document, LoadError>;
}

/// Documents stored as `<root>/<api_version>/openapi.{yaml,yml,json}`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, api_version: &str) -> Option<PathBuf> {
        let dir = self.root.join(api_version);
        DOCUMENT_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

impl DocumentSource for DirectorySource {
    fn load(&self, api_version: &str) -> Result<Document, LoadError> {
        let Some(path) = self.document_path(api_version) else {
            return Err(LoadError::UnknownVersion {
                version: api_version.to_string(),
            });
        };
        debug!(path = %path.display(), "loading document");
        load_document(&path)
    }
}

/// Documents held in memory, keyed by API version.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: HashMap<String, Document>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document (builder style).
    pub fn with(mut self, api_version: impl Into<String>, document: Document) -> Self {
        self.documents.insert(api_version.into(), document);
        self
    }
}

impl DocumentSource for StaticSource {
    fn load(&self, api_version: &str) -> Result<Document, LoadError> {
        self.documents
            .get(api_version)
            .cloned()
            .ok_or_else(|| LoadError::UnknownVersion {
                version: api_version.to_string(),
            })
    }
}
