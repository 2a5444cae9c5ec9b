//! Naming helpers for code generation
//!
//! Every derived name in a generated page (captions, headings, approval
//! companion tables, page file names) comes from here so that all sections
//! agree on it.

use inflector::Inflector;

/// Naming helpers shared by the section emitters
pub struct TemplateHelpers;

impl TemplateHelpers {
    /// Normalize an entity name to `snake_case`
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::helpers::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_entity_name("BlogArticle"), "blog_article");
    /// assert_eq!(TemplateHelpers::to_entity_name("news-item"), "news_item");
    /// assert_eq!(TemplateHelpers::to_entity_name("article"), "article");
    /// ```
    #[must_use]
    pub fn to_entity_name(input: &str) -> String {
        input.trim().to_snake_case()
    }

    /// Human-readable title of an identifier
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::helpers::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_title("article"), "Article");
    /// assert_eq!(TemplateHelpers::to_title("category_id"), "Category Id");
    /// ```
    #[must_use]
    pub fn to_title(identifier: &str) -> String {
        identifier.to_title_case()
    }

    /// Human-readable plural title, used as the list page heading
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::helpers::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_plural_title("article"), "Articles");
    /// assert_eq!(TemplateHelpers::to_plural_title("news_category"), "News Categories");
    /// ```
    #[must_use]
    pub fn to_plural_title(entity: &str) -> String {
        Self::to_title(entity).to_plural()
    }

    /// Column linking a main row to its pending shadow row
    #[must_use]
    pub fn approval_column(table: &str) -> String {
        format!("{table}_apv_id")
    }

    /// Shadow table holding pending values and the approval audit trail
    #[must_use]
    pub fn shadow_table(table: &str) -> String {
        format!("{table}_apv")
    }

    /// Archive table receiving hard-deleted rows
    #[must_use]
    pub fn trash_table(table: &str) -> String {
        format!("{table}_trash")
    }

    /// Module name of a table, as registered with the host framework
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::helpers::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::module_name("news_item"), "news-item");
    /// ```
    #[must_use]
    pub fn module_name(table: &str) -> String {
        table.replace('_', "-")
    }

    /// Escape text placed into generated markup
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::helpers::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::escape_html("R&D <new>"), "R&amp;D &lt;new&gt;");
    /// ```
    #[must_use]
    pub fn escape_html(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#039;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }

    /// File name of the generated page for one target
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::helpers::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::page_file_name("news-item", "php"), "news-item.php");
    /// ```
    #[must_use]
    pub fn page_file_name(module: &str, extension: &str) -> String {
        format!("{module}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_name() {
        assert_eq!(TemplateHelpers::to_entity_name("BlogArticle"), "blog_article");
        assert_eq!(TemplateHelpers::to_entity_name("  article "), "article");
        assert_eq!(TemplateHelpers::to_entity_name("news_item"), "news_item");
    }

    #[test]
    fn test_title() {
        assert_eq!(TemplateHelpers::to_title("title"), "Title");
        assert_eq!(TemplateHelpers::to_title("published_at"), "Published At");
    }

    #[test]
    fn test_plural_title() {
        assert_eq!(TemplateHelpers::to_plural_title("article"), "Articles");
        assert_eq!(TemplateHelpers::to_plural_title("category"), "Categories");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(TemplateHelpers::escape_html("Title"), "Title");
        assert_eq!(TemplateHelpers::escape_html("\"it's\""), "&quot;it&#039;s&quot;");
    }

    #[test]
    fn test_approval_names() {
        assert_eq!(TemplateHelpers::approval_column("article"), "article_apv_id");
        assert_eq!(TemplateHelpers::shadow_table("article"), "article_apv");
        assert_eq!(TemplateHelpers::trash_table("article"), "article_trash");
    }
}
