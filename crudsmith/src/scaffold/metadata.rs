//! Entity metadata documents
//!
//! An [`EntityMetadata`] bundles everything one generation call needs: the
//! entity name, its table, its field descriptors and optional generation
//! options. Documents are JSON or TOML; the format follows the file
//! extension.
//!
//! ```toml
//! entity = "article"
//!
//! [options]
//! with_approval = true
//!
//! [[fields]]
//! name = "article_id"
//! data_type = "int"
//! primary_key = true
//! list = true
//! detail = true
//!
//! [[fields]]
//! name = "title"
//! required = true
//! insert = true
//! update = true
//! list = true
//! list_filters = ["text"]
//! ```

use super::field_type::FieldDescriptor;
use super::helpers::TemplateHelpers;
use super::options::GenerationOptions;
use crate::error::{CrudsmithError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Entity name; identifies the page, the permission key and the approval tables
    pub entity: String,

    /// Table name; defaults to the entity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Field descriptors in display order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// Generation options stored with the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

/// Document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    /// JSON document
    Json,
    /// TOML document
    Toml,
}

impl MetadataFormat {
    /// Format implied by a file extension, JSON unless the extension is `toml`
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl EntityMetadata {
    /// Create metadata from an entity name and descriptors
    pub fn new(entity: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            entity: entity.into(),
            table: None,
            fields,
            options: None,
        }
    }

    /// Build metadata from compact field specs
    ///
    /// # Errors
    ///
    /// Returns the first field spec that fails to parse.
    pub fn from_specs<S: AsRef<str>>(entity: &str, specs: &[S]) -> Result<Self> {
        let fields = specs
            .iter()
            .map(|spec| FieldDescriptor::parse(spec.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(entity, fields).normalized())
    }

    /// Parse a document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or names no entity.
    pub fn parse(source: &str, format: MetadataFormat) -> Result<Self> {
        let metadata: Self = match format {
            MetadataFormat::Json => serde_json::from_str(source)?,
            MetadataFormat::Toml => toml::from_str(source)?,
        };
        if metadata.entity.trim().is_empty() {
            return Err(CrudsmithError::Metadata(
                "metadata document has an empty entity name".to_string(),
            ));
        }
        Ok(metadata.normalized())
    }

    /// Load a document from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let metadata = Self::parse(&source, MetadataFormat::from_path(path))?;
        tracing::debug!(
            path = %path.display(),
            entity = %metadata.entity,
            fields = metadata.fields.len(),
            "loaded metadata"
        );
        Ok(metadata)
    }

    /// Serialize to a document
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_document(&self, format: MetadataFormat) -> Result<String> {
        match format {
            MetadataFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            MetadataFormat::Toml => toml::to_string_pretty(self)
                .map_err(|err| CrudsmithError::Metadata(err.to_string())),
        }
    }

    /// Table name, the entity name when unset
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table
            .as_deref()
            .filter(|table| !table.trim().is_empty())
            .unwrap_or(&self.entity)
    }

    /// Options stored with the document, or `fallback`
    #[must_use]
    pub fn options_or(&self, fallback: GenerationOptions) -> GenerationOptions {
        self.options.unwrap_or(fallback)
    }

    fn normalized(mut self) -> Self {
        self.entity = TemplateHelpers::to_entity_name(&self.entity);
        self
    }
}
