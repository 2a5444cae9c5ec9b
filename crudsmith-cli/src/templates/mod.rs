//! Starter file generation

use anyhow::{Context, Result};
use handlebars::Handlebars;
use inflector::Inflector;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

pub mod files;
pub use files::*;

/// Starter files for a new entity
pub struct StarterTemplate {
    entity: String,
    with_approval: bool,
    handlebars: Handlebars<'static>,
}

impl StarterTemplate {
    /// Create a starter template for `entity`
    #[must_use]
    pub fn new(entity: &str, with_approval: bool) -> Self {
        let mut handlebars = Handlebars::new();

        // Disable HTML escaping since we're generating TOML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            entity: entity.to_string(),
            with_approval,
            handlebars,
        }
    }

    /// Render the starter metadata document
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails
    pub fn render_metadata(&self) -> Result<String> {
        self.render("metadata", METADATA_TOML)
    }

    /// Render the starter configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails
    pub fn render_config(&self) -> Result<String> {
        self.render("config", CONFIG_TOML)
    }

    /// Write the metadata document as `<entity>.toml` under `output_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Template rendering fails
    /// - File writing fails
    pub fn write_metadata(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(format!("{}.toml", self.entity));
        let rendered = self.render_metadata()?;
        fs::write(&path, rendered)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(path)
    }

    /// Write `crudsmith.toml` under `output_dir`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Template rendering fails
    /// - File writing fails
    pub fn write_config(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(crudsmith::config::DEFAULT_CONFIG_FILE);
        let rendered = self.render_config()?;
        fs::write(&path, rendered)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(path)
    }

    fn render(&self, name: &str, template: &str) -> Result<String> {
        let context = json!({
            "entity": self.entity,
            "title": self.entity.to_title_case(),
            "with_approval": self.with_approval,
        });

        self.handlebars
            .render_template(template, &context)
            .with_context(|| format!("Failed to render template: {name}"))
    }
}
