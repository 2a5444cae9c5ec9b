//! Generation context
//!
//! The [`GenerationContext`] is the single value threaded through every
//! emitter. It is built once per generation call and never mutated, so the
//! sections can be built and rendered in any order with the same result.

use super::field_type::{primary_key_index, DataType, FieldDescriptor, FieldSet};
use super::helpers::TemplateHelpers;
use super::metadata::EntityMetadata;
use super::options::GenerationOptions;
use crate::config::RuntimeSettings;

/// Everything a section emitter may read
#[derive(Debug, Clone)]
pub struct GenerationContext {
    entity: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    primary_key: FieldDescriptor,
    options: GenerationOptions,
    runtime: RuntimeSettings,
}

impl GenerationContext {
    /// Build a context with default runtime settings
    ///
    /// The primary key is the first descriptor marked as such, else the first
    /// descriptor. An empty field list synthesizes an `<entity>_id` integer key
    /// so generation still produces a page.
    #[must_use]
    pub fn new(entity: &str, fields: &[FieldDescriptor], options: GenerationOptions) -> Self {
        let entity = TemplateHelpers::to_entity_name(entity);
        let primary_key = primary_key_index(fields).map_or_else(
            || {
                tracing::warn!(entity = %entity, "entity has no fields, synthesizing a key");
                FieldDescriptor::new(format!("{entity}_id"), DataType::Int).primary_key()
            },
            |index| fields[index].clone(),
        );

        Self {
            table: entity.clone(),
            entity,
            fields: fields.to_vec(),
            primary_key,
            options,
            runtime: RuntimeSettings::default(),
        }
    }

    /// Build a context from a metadata document
    ///
    /// Options stored in the document win over `options`.
    #[must_use]
    pub fn from_metadata(
        metadata: &EntityMetadata,
        options: GenerationOptions,
        runtime: RuntimeSettings,
    ) -> Self {
        Self::new(
            &metadata.entity,
            &metadata.fields,
            metadata.options_or(options),
        )
        .with_table(metadata.table_name())
        .with_runtime(runtime)
    }

    /// Override the table name
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        if !table.trim().is_empty() {
            self.table = table.trim().to_string();
        }
        self
    }

    /// Override the runtime settings
    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeSettings) -> Self {
        self.runtime = runtime;
        self
    }

    /// Entity name
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Table name
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All descriptors in display order
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Primary key descriptor
    #[must_use]
    pub const fn primary_key(&self) -> &FieldDescriptor {
        &self.primary_key
    }

    /// Primary key column name
    #[must_use]
    pub fn pk(&self) -> &str {
        &self.primary_key.name
    }

    /// Generation options
    #[must_use]
    pub const fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Runtime settings
    #[must_use]
    pub const fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Descriptors belonging to a field set, in display order
    pub fn fields_in(&self, set: FieldSet) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(move |field| field.in_set(set))
    }

    /// Descriptors of a field set with the primary key guaranteed present
    ///
    /// The key is prepended when the set does not already contain it.
    #[must_use]
    pub fn fields_with_key(&self, set: FieldSet) -> Vec<&FieldDescriptor> {
        let mut fields: Vec<&FieldDescriptor> = self.fields_in(set).collect();
        if !fields.iter().any(|field| field.name == self.primary_key.name) {
            fields.insert(0, &self.primary_key);
        }
        fields
    }

    /// Quote an identifier when `quote_identifiers` is on
    #[must_use]
    pub fn ident(&self, name: &str) -> String {
        if self.options.quote_identifiers {
            format!("`{name}`")
        } else {
            name.to_string()
        }
    }

    /// Column qualified by a table
    #[must_use]
    pub fn qualified(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.ident(table), self.ident(column))
    }

    /// Column qualified by the main table
    #[must_use]
    pub fn column(&self, column: &str) -> String {
        self.qualified(&self.table, column)
    }

    /// Approval link column on the main table
    #[must_use]
    pub fn approval_column(&self) -> String {
        TemplateHelpers::approval_column(&self.table)
    }

    /// Shadow table name
    #[must_use]
    pub fn shadow_table(&self) -> String {
        TemplateHelpers::shadow_table(&self.table)
    }

    /// Trash table name
    #[must_use]
    pub fn trash_table(&self) -> String {
        TemplateHelpers::trash_table(&self.table)
    }

    /// Trash table column stamped with the deleting user
    #[must_use]
    pub fn trash_key_column(&self) -> String {
        format!("{}_id", self.trash_table())
    }

    /// Module name the host framework knows the page by
    #[must_use]
    pub fn module_name(&self) -> String {
        TemplateHelpers::module_name(&self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("title", DataType::Text).insert().list(),
            FieldDescriptor::new("article_id", DataType::Int).primary_key().detail(),
        ]
    }

    #[test]
    fn test_marked_primary_key() {
        let ctx = GenerationContext::new("Article", &fields(), GenerationOptions::default());
        assert_eq!(ctx.entity(), "article");
        assert_eq!(ctx.table(), "article");
        assert_eq!(ctx.pk(), "article_id");
    }

    #[test]
    fn test_key_prepended_to_field_set() {
        let ctx = GenerationContext::new("article", &fields(), GenerationOptions::default());
        let names: Vec<&str> = ctx
            .fields_with_key(FieldSet::List)
            .iter()
            .map(|field| field.name.as_str())
            .collect();
        assert_eq!(names, vec!["article_id", "title"]);
    }

    #[test]
    fn test_empty_fields_synthesize_key() {
        let ctx = GenerationContext::new("page", &[], GenerationOptions::default());
        assert_eq!(ctx.pk(), "page_id");
        assert_eq!(ctx.fields_with_key(FieldSet::All).len(), 1);
    }

    #[test]
    fn test_identifier_quoting() {
        let plain = GenerationContext::new("article", &fields(), GenerationOptions::default());
        assert_eq!(plain.column("title"), "article.title");

        let quoted = GenerationContext::new("article", &fields(), GenerationOptions::default().quoted())
            .with_table("tbl_article");
        assert_eq!(quoted.column("title"), "`tbl_article`.`title`");
        assert_eq!(quoted.shadow_table(), "tbl_article_apv");
    }

    #[test]
    fn test_companion_names_follow_table() {
        let ctx = GenerationContext::new("article", &fields(), GenerationOptions::default())
            .with_table("news_item");
        assert_eq!(ctx.entity(), "article");
        assert_eq!(ctx.approval_column(), "news_item_apv_id");
        assert_eq!(ctx.shadow_table(), "news_item_apv");
        assert_eq!(ctx.trash_table(), "news_item_trash");
        assert_eq!(ctx.trash_key_column(), "news_item_trash_id");
        assert_eq!(ctx.module_name(), "news-item");
    }

    #[test]
    fn test_metadata_options_win() {
        let mut metadata = EntityMetadata::new("news", fields());
        metadata.options = Some(GenerationOptions::default().with_trash());
        let ctx = GenerationContext::from_metadata(
            &metadata,
            GenerationOptions::default().with_approval(),
            RuntimeSettings::default(),
        );
        assert!(ctx.options().with_trash);
        assert!(!ctx.options().with_approval);
    }
}
