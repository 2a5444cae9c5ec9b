//! CRUD page generator
//!
//! This module coordinates the emission of one complete page per target.
//! Sections are built and rendered in a fixed order:
//! - Auth include
//! - Controller
//! - Insert form
//! - Update form
//! - Detail page
//! - List page
//!
//! Generation is pure: identical descriptors, options and target always
//! produce byte-identical output.

use super::ast::Renderer;
use super::context::GenerationContext;
use super::field_type::FieldDescriptor;
use super::helpers::TemplateHelpers;
use super::metadata::EntityMetadata;
use super::options::GenerationOptions;
use super::sections::SectionKind;
use super::target::EmissionTarget;
use crate::config::RuntimeSettings;
use std::path::PathBuf;

/// Generate the page for one entity and target with default runtime settings
///
/// # Examples
///
/// ```
/// use crudsmith::scaffold::{generate, DataType, FieldDescriptor, GenerationOptions, Jsp};
///
/// let fields = vec![
///     FieldDescriptor::new("tag_id", DataType::Int).primary_key().everywhere(),
///     FieldDescriptor::new("label", DataType::Text).everywhere(),
/// ];
/// let page = generate("tag", &fields, &GenerationOptions::default(), &Jsp);
/// assert!(page.starts_with("<%@ include file="));
/// ```
#[must_use]
pub fn generate(
    entity: &str,
    fields: &[FieldDescriptor],
    options: &GenerationOptions,
    target: &dyn EmissionTarget,
) -> String {
    let ctx = GenerationContext::new(entity, fields, *options);
    render_page(&ctx, target)
}

/// Render every section of a page in order
#[must_use]
pub fn render_page(ctx: &GenerationContext, target: &dyn EmissionTarget) -> String {
    let mut page = String::new();
    for section in SectionKind::ORDER {
        let text = Renderer::new(target, ctx).render(&section.build(ctx));
        tracing::debug!(
            entity = %ctx.entity(),
            target = target.name(),
            section = section.name(),
            bytes = text.len(),
            "emitted section"
        );
        page.push_str(&text);
    }
    page
}

/// CRUD page generator for one entity
#[derive(Debug, Clone)]
pub struct ScaffoldGenerator {
    ctx: GenerationContext,
}

impl ScaffoldGenerator {
    /// Create a generator
    ///
    /// # Arguments
    ///
    /// * `metadata` - Entity name, table and descriptors
    /// * `options` - Flags used when the metadata stores none
    /// * `runtime` - Include path, page size and messages rendered into the page
    #[must_use]
    pub fn new(
        metadata: &EntityMetadata,
        options: GenerationOptions,
        runtime: RuntimeSettings,
    ) -> Self {
        Self {
            ctx: GenerationContext::from_metadata(metadata, options, runtime),
        }
    }

    /// Generation context shared by every target
    #[must_use]
    pub const fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    /// Generate the page for one target
    #[must_use]
    pub fn generate(&self, target: &dyn EmissionTarget) -> GeneratedFile {
        let content = render_page(&self.ctx, target);
        let path = PathBuf::from(TemplateHelpers::page_file_name(
            &self.ctx.module_name(),
            target.extension(),
        ));
        tracing::info!(
            entity = %self.ctx.entity(),
            target = target.name(),
            path = %path.display(),
            "generated page"
        );

        GeneratedFile {
            path,
            content,
            description: format!("{} page for {}", target.name(), self.ctx.entity()),
        }
    }

    /// Generate one page per target, in the order given
    pub fn generate_all<'t, I>(&self, targets: I) -> Vec<GeneratedFile>
    where
        I: IntoIterator<Item = &'t dyn EmissionTarget>,
    {
        targets
            .into_iter()
            .map(|target| self.generate(target))
            .collect()
    }
}

/// Generated page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory
    pub path: PathBuf,
    /// Page content
    pub content: String,
    /// Description for user feedback
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::field_type::{DataType, ElementType, FilterKind};
    use crate::scaffold::target::{Jsp, Php, TargetRegistry};
    use crate::testing::{assert_blocks_balanced, assert_in_order, assert_pending_guarded};
    use proptest::prelude::*;

    fn article_fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("article_id", DataType::Int)
                .primary_key()
                .everywhere(),
            FieldDescriptor::new("title", DataType::Text)
                .required()
                .everywhere()
                .filter(FilterKind::Text),
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .everywhere()
                .filter(FilterKind::Select),
        ]
    }

    #[test]
    fn test_sections_in_order() {
        let page = generate(
            "article",
            &article_fields(),
            &GenerationOptions::default(),
            &Php,
        );
        assert_in_order(
            &page,
            &[
                "include_once dirname(__FILE__) . '/lib.inc/auth-with-login-form.php';",
                "$cms->createUserLog($_POST, $_userID, 'article', ",
                "$permission = $cms->getPermission($_userLevel, $moduleName);",
                "<form name=\"insertform\"",
                "<form name=\"editform\"",
                "<form name=\"detailform\"",
                "<form name=\"filterform\"",
            ],
        );
    }

    #[test]
    fn test_generator_names_files_by_target() {
        let metadata = EntityMetadata::new("article", article_fields());
        let generator =
            ScaffoldGenerator::new(&metadata, GenerationOptions::default(), RuntimeSettings::default());
        let registry = TargetRegistry::builtin();
        let files = generator.generate_all(registry.iter());

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, PathBuf::from("article.php"));
        assert_eq!(files[1].path, PathBuf::from("article.jsp"));
        assert!(files[1]
            .content
            .starts_with("<%@ include file=\"lib.inc/auth-with-login-form.jsp\" %>\n"));
    }

    #[test]
    fn test_runtime_settings_reach_the_page() {
        let metadata = EntityMetadata::new("article", article_fields());
        let mut runtime = RuntimeSettings {
            page_size: 50,
            ..RuntimeSettings::default()
        };
        runtime.messages.not_found = "Tidak ada data".to_string();
        let file = ScaffoldGenerator::new(&metadata, GenerationOptions::default(), runtime)
            .generate(&Php);

        assert!(file.content.contains("limit 50 offset"));
        assert!(file.content.contains("Tidak ada data"));
    }

    #[test]
    fn test_primary_key_fallback_is_consistent() {
        let fields = vec![
            FieldDescriptor::new("code", DataType::Text).everywhere(),
            FieldDescriptor::new("title", DataType::Text).everywhere(),
        ];
        let page = generate("product", &fields, &GenerationOptions::default(), &Php);

        assert!(page.contains("'select * from product where product.code = ?'"));
        assert!(page.contains("name=\"code[]\""));
        assert!(page.contains("$id = filterInput(INPUT_GET, 'code', FILTER_SANITIZE_SPECIAL_CHARS, true);"));
        assert!(page.contains("$id = $input_code;"));
        assert!(page.contains("header('Location: ' . $selfUrl . '?user_action=detail&code=' . $id);"));
        assert!(page.contains("'update product set title = ? where code = ?'"));
        assert!(page.contains("where product.code = ?'"));
        assert!(!page.contains("product_id"));
    }

    #[test]
    fn test_select_key_stays_raw_on_every_page_use() {
        let fields = vec![
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .everywhere(),
            FieldDescriptor::new("title", DataType::Text).everywhere(),
        ];
        let options = GenerationOptions::default().with_approval();
        let page = generate("article", &fields, &options, &Php);
        let key = "$cms->escapeHTML($row['category_id'])";

        // list row id and bulk checkbox
        assert!(page.contains(&format!("<tr data-id=\"<?php echo {key}; ?>\">")));
        assert!(page.contains(&format!("name=\"category_id[]\" value=\"<?php echo {key}; ?>\"")));
        // update and detail links
        assert!(page.contains("$selfUrl . '?user_action=update&category_id=' . $row['category_id']"));
        assert!(page.contains("$selfUrl . '?user_action=detail&category_id=' . $row['category_id']"));
        // detail lookup and the key posted back for review
        assert!(page.contains("where article.category_id = ?'"));
        assert!(page.contains(&format!("<input type=\"hidden\" name=\"category_id\" value=\"<?php echo {key}; ?>\">")));
        // insert redirect and update WHERE
        assert!(page.contains("$id = $input_category_id;"));
        assert!(page.contains("header('Location: ' . $selfUrl . '?user_action=detail&category_id=' . $id);"));
        assert!(page.contains("where category_id = ? and article_apv_id = 0'"));

        assert!(page.contains("as category_id_label"));
        assert!(!page.contains(") as category_id,"));
        assert!(!page.contains(") as category_id from"));
    }

    #[test]
    fn test_empty_field_list_still_generates() {
        let page = generate("note", &[], &GenerationOptions::default(), &Php);
        assert!(page.contains("'select * from note where note.note_id = ?'"));
    }

    #[test]
    fn test_pending_flags_are_always_guarded() {
        let options = GenerationOptions::default().with_approval().with_trash();
        for target in [&Php as &dyn EmissionTarget, &Jsp] {
            let page = generate("article", &article_fields(), &options, target);
            assert_pending_guarded(&page, "article");
            assert_blocks_balanced(&page, target);
        }
    }

    #[test]
    fn test_without_approval_no_shadow_table() {
        let page = generate(
            "article",
            &article_fields(),
            &GenerationOptions::default(),
            &Php,
        );
        assert!(!page.contains("article_apv"));
        assert!(!page.contains("data_approve"));
    }

    fn options_strategy() -> impl Strategy<Value = GenerationOptions> {
        (
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(
                |(with_approval, with_trash, with_note, descending, manual, quoted)| {
                    GenerationOptions {
                        with_approval,
                        with_trash,
                        with_note,
                        default_order_descending: descending,
                        manual_sort_order: manual,
                        quote_identifiers: quoted,
                    }
                },
            )
    }

    fn fields_strategy() -> impl Strategy<Value = Vec<FieldDescriptor>> {
        let data_type = prop::sample::select(DataType::ALL.to_vec());
        let element = prop::sample::select(vec![
            ElementType::Text,
            ElementType::Textarea,
            ElementType::Select,
            ElementType::Checkbox,
        ]);
        prop::collection::vec((data_type, element, any::<bool>()), 0..6).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(index, (data_type, element, filtered))| {
                    let field = FieldDescriptor::new(format!("col_{index}"), data_type)
                        .element(element)
                        .everywhere();
                    if filtered {
                        field.filter(FilterKind::Text)
                    } else {
                        field
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_generation_is_deterministic(
            fields in fields_strategy(),
            options in options_strategy(),
        ) {
            for target in [&Php as &dyn EmissionTarget, &Jsp] {
                let first = generate("item", &fields, &options, target);
                let second = generate("item", &fields, &options, target);
                prop_assert!(!first.is_empty());
                prop_assert_eq!(first, second);
            }
        }
    }
}
