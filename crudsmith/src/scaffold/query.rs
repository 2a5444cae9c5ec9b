//! Query fragment builder
//!
//! Derives every SQL fragment a generated page needs from the descriptors
//! alone: the SELECT list (foreign-key labels as correlated scalar
//! subqueries, never joins), the optional WHERE extension built from list
//! filters, and the ORDER BY clause.
//!
//! The builder serves two callers. The list emitter asks it for
//! [`FilterPredicate`]s and mirrors them in run-time code; tests and tools
//! call [`QueryBuilder::where_extension`] with concrete [`FilterInput`] to
//! see the exact clause the page would build.

use super::context::GenerationContext;
use super::field_type::{ElementType, FieldDescriptor, FieldSet, FilterKind, SanitizeFilter};
use std::collections::BTreeMap;

/// Column added to the list when manual ordering is on
pub const SORT_ORDER_COLUMN: &str = "sort_order";

/// Pending-state column on the main table
pub const WAITING_FOR_COLUMN: &str = "waiting_for";

/// Draft flag column on the main table
pub const DRAFT_COLUMN: &str = "draft";

/// Active flag column on the main table
pub const ACTIVE_COLUMN: &str = "active";

/// Request-time sort selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRequest {
    /// Column alias from the SELECT list
    pub column: String,
    /// Descending order
    pub descending: bool,
}

impl SortRequest {
    /// Create a sort request
    pub fn new(column: impl Into<String>, descending: bool) -> Self {
        Self {
            column: column.into(),
            descending,
        }
    }
}

/// Request-time filter values, keyed by request parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInput {
    values: BTreeMap<String, String>,
    search: Option<String>,
}

impl FilterInput {
    /// No filters set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a filter parameter
    #[must_use]
    pub fn with(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(param.into(), value.into());
        self
    }

    /// Set the free-text `q` search
    #[must_use]
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    fn value(&self, param: &str) -> Option<&str> {
        self.values
            .get(param)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// One optional list filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    /// Request parameter carrying the value
    pub param: String,
    /// Qualified column
    pub column: String,
    /// Filter kind
    pub kind: FilterKind,
    /// Sanitize filter applied to the request value
    pub sanitize: SanitizeFilter,
}

impl FilterPredicate {
    /// SQL predicate with one placeholder
    #[must_use]
    pub fn sql(&self) -> String {
        match self.kind {
            FilterKind::Text => format!("lower({}) like lower(?)", self.column),
            FilterKind::Select => format!("{} = ?", self.column),
        }
    }

    /// Bound value for a request value
    #[must_use]
    pub fn bind(&self, value: &str) -> String {
        match self.kind {
            FilterKind::Text => format!("%{value}%"),
            FilterKind::Select => value.to_string(),
        }
    }
}

/// WHERE extension with its bound parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereExtension {
    /// `" and <predicate>"` per populated filter, empty when none
    pub sql: String,
    /// Bound values in placeholder order
    pub params: Vec<String>,
}

impl WhereExtension {
    /// Number of predicates
    #[must_use]
    pub fn len(&self) -> usize {
        self.sql.matches(" and ").count()
    }

    /// No predicate
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    fn push(&mut self, predicate: &str, params: impl IntoIterator<Item = String>) {
        self.sql.push_str(" and ");
        self.sql.push_str(predicate);
        self.params.extend(params);
    }
}

/// Builds SQL fragments for one entity
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    ctx: &'a GenerationContext,
}

impl<'a> QueryBuilder<'a> {
    /// Create a builder
    #[must_use]
    pub const fn new(ctx: &'a GenerationContext) -> Self {
        Self { ctx }
    }

    /// SELECT list entries for a field set
    ///
    /// The primary key is prepended when the set lacks it. Every column is
    /// selected raw; a `select` field adds its looked-up label under
    /// [`Self::label_alias`]. With approval on, the approval link and
    /// pending state are appended, coalesced to 0.
    #[must_use]
    pub fn select_list(&self, set: FieldSet) -> Vec<String> {
        let ctx = self.ctx;
        let mut columns: Vec<String> = ctx
            .fields_with_key(set)
            .into_iter()
            .flat_map(|field| self.select_items(field))
            .collect();

        if ctx.options().with_approval {
            let apv = ctx.approval_column();
            columns.push(format!(
                "coalesce({}, 0) as {}",
                ctx.column(&apv),
                ctx.ident(&apv)
            ));
            columns.push(format!(
                "coalesce({}, 0) as {}",
                ctx.column(WAITING_FOR_COLUMN),
                ctx.ident(WAITING_FOR_COLUMN)
            ));
        }
        columns
    }

    /// SELECT list joined with commas
    #[must_use]
    pub fn select_clause(&self, set: FieldSet) -> String {
        self.select_list(set).join(", ")
    }

    fn select_items(&self, field: &FieldDescriptor) -> Vec<String> {
        let ctx = self.ctx;
        let mut items = vec![ctx.column(&field.name)];
        if let Some(alias) = Self::label_alias(field) {
            let relation = field.related();
            items.push(format!(
                "(select {} from {} where {} = {}) as {}",
                ctx.qualified(&relation.table, &relation.label),
                ctx.ident(&relation.table),
                ctx.qualified(&relation.table, &relation.key),
                ctx.column(&field.name),
                ctx.ident(&alias)
            ));
        }
        items
    }

    /// Result column holding the display label of a `select` field
    #[must_use]
    pub fn label_alias(field: &FieldDescriptor) -> Option<String> {
        (field.element_type == ElementType::Select).then(|| format!("{}_label", field.name))
    }

    /// Result column shown for a field in lists and detail pages
    #[must_use]
    pub fn display_column(field: &FieldDescriptor) -> String {
        Self::label_alias(field).unwrap_or_else(|| field.name.clone())
    }

    /// List filters in descriptor order
    #[must_use]
    pub fn filters(&self) -> Vec<FilterPredicate> {
        self.ctx
            .fields()
            .iter()
            .flat_map(|field| {
                field.list_filters.iter().map(move |kind| FilterPredicate {
                    param: field.filter_param(*kind),
                    column: self.ctx.column(&field.name),
                    kind: *kind,
                    sanitize: match kind {
                        FilterKind::Text => SanitizeFilter::SpecialChars,
                        FilterKind::Select => field.sanitize_filter(),
                    },
                })
            })
            .collect()
    }

    /// Columns searched by the free-text `q` parameter
    #[must_use]
    pub fn search_columns(&self) -> Vec<String> {
        self.ctx
            .fields_in(FieldSet::List)
            .filter(|field| field.data_type.is_textual())
            .filter(|field| {
                matches!(
                    field.element_type,
                    ElementType::Text | ElementType::Textarea
                )
            })
            .map(|field| self.ctx.column(&field.name))
            .collect()
    }

    /// Disjunction over [`Self::search_columns`], one placeholder per column
    #[must_use]
    pub fn search_predicate(&self) -> Option<String> {
        let columns = self.search_columns();
        if columns.is_empty() {
            return None;
        }
        let terms: Vec<String> = columns
            .iter()
            .map(|column| format!("lower({column}) like lower(?)"))
            .collect();
        Some(format!("({})", terms.join(" or ")))
    }

    /// WHERE extension for concrete request values
    ///
    /// Empty values contribute nothing; populated ones are conjoined.
    #[must_use]
    pub fn where_extension(&self, input: &FilterInput) -> WhereExtension {
        let mut extension = WhereExtension::default();

        for predicate in self.filters() {
            if let Some(value) = input.value(&predicate.param) {
                extension.push(&predicate.sql(), [predicate.bind(value)]);
            }
        }

        if let Some(query) = input.search.as_deref().filter(|query| !query.is_empty()) {
            if let Some(predicate) = self.search_predicate() {
                let count = self.search_columns().len();
                extension.push(&predicate, std::iter::repeat_n(format!("%{query}%"), count));
            }
        }

        extension
    }

    /// Column aliases a request may sort by
    #[must_use]
    pub fn sortable_columns(&self) -> Vec<String> {
        self.ctx
            .fields_with_key(FieldSet::List)
            .into_iter()
            .map(|field| field.name.clone())
            .collect()
    }

    /// Default ORDER BY, used when the request names no valid column
    ///
    /// Manual ordering wins over descending key order.
    #[must_use]
    pub fn default_order(&self) -> String {
        let ctx = self.ctx;
        if ctx.options().manual_sort_order {
            format!("{} asc", ctx.column(SORT_ORDER_COLUMN))
        } else if ctx.options().default_order_descending {
            format!("{} desc", ctx.column(ctx.pk()))
        } else {
            format!("{} asc", ctx.column(ctx.pk()))
        }
    }

    /// ORDER BY for an optional request sort
    ///
    /// A request sort applies only when its column is sortable.
    #[must_use]
    pub fn order_by(&self, sort: Option<&SortRequest>) -> String {
        match sort {
            Some(sort) if self.sortable_columns().contains(&sort.column) => format!(
                "{} {}",
                self.ctx.ident(&sort.column),
                if sort.descending { "desc" } else { "asc" }
            ),
            _ => self.default_order(),
        }
    }

    /// List query up to the WHERE clause; filters append to it
    #[must_use]
    pub fn list_sql(&self) -> String {
        format!(
            "select {} from {} where 1 = 1",
            self.select_clause(FieldSet::List),
            self.ctx.ident(self.ctx.table())
        )
    }

    /// Row count query up to the WHERE clause
    #[must_use]
    pub fn count_sql(&self) -> String {
        format!(
            "select count(*) as total from {} where 1 = 1",
            self.ctx.ident(self.ctx.table())
        )
    }

    /// Detail query, one placeholder for the key
    #[must_use]
    pub fn detail_sql(&self) -> String {
        format!(
            "select {} from {} where {} = ?",
            self.select_clause(FieldSet::Detail),
            self.ctx.ident(self.ctx.table()),
            self.ctx.column(self.ctx.pk())
        )
    }

    /// Whole-row query by key, for prefilling the update form
    #[must_use]
    pub fn row_sql(&self) -> String {
        self.row_sql_in(self.ctx.table())
    }

    /// Whole-row query by key against another table
    #[must_use]
    pub fn row_sql_in(&self, table: &str) -> String {
        format!(
            "select * from {} where {} = ?",
            self.ctx.ident(table),
            self.ctx.qualified(table, self.ctx.pk())
        )
    }

    /// `insert into` with one placeholder per column
    #[must_use]
    pub fn insert_sql(&self, table: &str, columns: &[String]) -> String {
        let values: Vec<(String, String)> = columns
            .iter()
            .map(|column| (column.clone(), "?".to_string()))
            .collect();
        self.insert_values_sql(table, &values)
    }

    /// `insert into ... values` with one SQL value per column
    #[must_use]
    pub fn insert_values_sql(&self, table: &str, values: &[(String, String)]) -> String {
        let names: Vec<String> = values.iter().map(|(column, _)| self.ctx.ident(column)).collect();
        let values: Vec<&str> = values.iter().map(|(_, value)| value.as_str()).collect();
        format!(
            "insert into {} ({}) values ({})",
            self.ctx.ident(table),
            names.join(", "),
            values.join(", ")
        )
    }

    /// `update ... set` with one placeholder per column, then `condition`
    #[must_use]
    pub fn update_sql(&self, table: &str, columns: &[String], condition: &str) -> String {
        let values: Vec<(String, String)> = columns
            .iter()
            .map(|column| (column.clone(), "?".to_string()))
            .collect();
        self.update_values_sql(table, &values, condition)
    }

    /// `update ... set` with one SQL value per column, then `condition`
    #[must_use]
    pub fn update_values_sql(
        &self,
        table: &str,
        values: &[(String, String)],
        condition: &str,
    ) -> String {
        let assignments: Vec<String> = values
            .iter()
            .map(|(column, value)| format!("{} = {value}", self.ctx.ident(column)))
            .collect();
        format!(
            "update {} set {} where {condition}",
            self.ctx.ident(table),
            assignments.join(", ")
        )
    }

    /// `update ... set` with literal assignments, then `condition`
    #[must_use]
    pub fn update_literal_sql(&self, table: &str, assignments: &[String], condition: &str) -> String {
        format!(
            "update {} set {} where {condition}",
            self.ctx.ident(table),
            assignments.join(", ")
        )
    }

    /// `delete from ... where condition`
    #[must_use]
    pub fn delete_sql(&self, table: &str, condition: &str) -> String {
        format!("delete from {} where {condition}", self.ctx.ident(table))
    }

    /// `<key> = ?` on the main table key
    #[must_use]
    pub fn key_condition(&self) -> String {
        format!("{} = ?", self.ctx.ident(self.ctx.pk()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::field_type::DataType;
    use crate::scaffold::options::GenerationOptions;
    use proptest::prelude::*;

    fn article_fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("article_id", DataType::Int).primary_key().detail(),
            FieldDescriptor::new("title", DataType::Text)
                .list()
                .filter(FilterKind::Text),
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .list()
                .filter(FilterKind::Select),
            FieldDescriptor::new("body", DataType::Text).element(ElementType::Textarea),
        ]
    }

    fn ctx(options: GenerationOptions) -> GenerationContext {
        GenerationContext::new("article", &article_fields(), options)
    }

    #[test]
    fn test_select_list_keeps_raw_key_next_to_label() {
        let ctx = ctx(GenerationOptions::default());
        let select = QueryBuilder::new(&ctx).select_list(FieldSet::List);
        assert_eq!(
            select,
            vec![
                "article.article_id".to_string(),
                "article.title".to_string(),
                "article.category_id".to_string(),
                "(select category.name from category where category.category_id = article.category_id) as category_id_label"
                    .to_string(),
            ]
        );
        assert!(!QueryBuilder::new(&ctx).list_sql().contains(" join "));
    }

    #[test]
    fn test_select_key_field_stays_addressable() {
        let fields = vec![
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .everywhere(),
            FieldDescriptor::new("title", DataType::Text).everywhere(),
        ];
        let ctx = GenerationContext::new("article", &fields, GenerationOptions::default());
        let builder = QueryBuilder::new(&ctx);
        let select = builder.select_list(FieldSet::Detail);
        assert_eq!(select[0], "article.category_id");
        assert!(select[1].ends_with(" as category_id_label"));
        assert_eq!(QueryBuilder::display_column(ctx.primary_key()), "category_id_label");
        assert_eq!(QueryBuilder::display_column(&fields[1]), "title");
    }

    #[test]
    fn test_select_list_with_approval_columns() {
        let ctx = ctx(GenerationOptions::default().with_approval());
        let select = QueryBuilder::new(&ctx).select_list(FieldSet::List);
        assert_eq!(
            &select[select.len() - 2..],
            &[
                "coalesce(article.article_apv_id, 0) as article_apv_id".to_string(),
                "coalesce(article.waiting_for, 0) as waiting_for".to_string(),
            ]
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        let ctx = ctx(GenerationOptions::default().quoted());
        let builder = QueryBuilder::new(&ctx);
        assert_eq!(builder.select_list(FieldSet::List)[1], "`article`.`title`");
        assert_eq!(builder.key_condition(), "`article_id` = ?");
    }

    #[test]
    fn test_filter_predicates() {
        let ctx = ctx(GenerationOptions::default());
        let filters = QueryBuilder::new(&ctx).filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].sql(), "lower(article.title) like lower(?)");
        assert_eq!(filters[0].bind("rust"), "%rust%");
        assert_eq!(filters[1].sql(), "article.category_id = ?");
        assert_eq!(filters[1].bind("3"), "3");
        assert_eq!(filters[1].sanitize, SanitizeFilter::NumberInt);
    }

    #[test]
    fn test_where_extension_skips_empty_values() {
        let ctx = ctx(GenerationOptions::default());
        let builder = QueryBuilder::new(&ctx);

        assert!(builder.where_extension(&FilterInput::new()).is_empty());

        let extension =
            builder.where_extension(&FilterInput::new().with("title", "").with("category_id", "4"));
        assert_eq!(extension.sql, " and article.category_id = ?");
        assert_eq!(extension.params, vec!["4"]);
    }

    #[test]
    fn test_where_extension_search() {
        let ctx = ctx(GenerationOptions::default());
        let extension = QueryBuilder::new(&ctx).where_extension(&FilterInput::new().search("news"));
        assert_eq!(extension.sql, " and (lower(article.title) like lower(?))");
        assert_eq!(extension.params, vec!["%news%"]);
    }

    #[test]
    fn test_order_by_priority() {
        let plain = ctx(GenerationOptions::default());
        assert_eq!(QueryBuilder::new(&plain).order_by(None), "article.article_id asc");

        let desc = ctx(GenerationOptions::default().descending());
        assert_eq!(QueryBuilder::new(&desc).order_by(None), "article.article_id desc");

        let both = ctx(GenerationOptions::default().descending().manual_sort());
        let builder = QueryBuilder::new(&both);
        assert_eq!(builder.order_by(None), "article.sort_order asc");
        assert_eq!(
            builder.order_by(Some(&SortRequest::new("title", true))),
            "title desc"
        );
        // unknown columns never reach the clause
        assert_eq!(
            builder.order_by(Some(&SortRequest::new("1; drop table article", false))),
            "article.sort_order asc"
        );
    }

    #[test]
    fn test_mutation_sql() {
        let ctx = ctx(GenerationOptions::default());
        let builder = QueryBuilder::new(&ctx);
        let columns = vec!["title".to_string(), "body".to_string()];
        assert_eq!(
            builder.insert_sql("article", &columns),
            "insert into article (title, body) values (?, ?)"
        );
        assert_eq!(
            builder.update_sql("article", &columns, &builder.key_condition()),
            "update article set title = ?, body = ? where article_id = ?"
        );
        assert_eq!(
            builder.delete_sql("article", &builder.key_condition()),
            "delete from article where article_id = ?"
        );
    }

    fn filter_kind() -> impl Strategy<Value = FilterKind> {
        prop_oneof![Just(FilterKind::Text), Just(FilterKind::Select)]
    }

    proptest! {
        #[test]
        fn test_filter_composition(
            specs in prop::collection::vec((filter_kind(), prop::option::of("[a-z0-9]{1,8}")), 0..8)
        ) {
            let fields: Vec<FieldDescriptor> = specs
                .iter()
                .enumerate()
                .map(|(i, (kind, _))| FieldDescriptor::new(format!("f{i}"), DataType::Int).list().filter(*kind))
                .collect();
            let ctx = GenerationContext::new("thing", &fields, GenerationOptions::default());

            let mut input = FilterInput::new();
            for (i, (_, value)) in specs.iter().enumerate() {
                input = input.with(format!("f{i}"), value.clone().unwrap_or_default());
            }
            let populated = specs.iter().filter(|(_, value)| value.is_some()).count();

            let extension = QueryBuilder::new(&ctx).where_extension(&input);
            prop_assert_eq!(extension.len(), populated);
            prop_assert_eq!(extension.params.len(), populated);
            prop_assert_eq!(extension.is_empty(), populated == 0);
        }
    }
}
