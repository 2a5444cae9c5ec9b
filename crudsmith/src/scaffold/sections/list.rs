//! List page section
//!
//! The default view of the page: a filter form, then one page of rows with
//! bulk action checkboxes, sortable column headers and pagination. The
//! WHERE extension is assembled at run time from the same predicates the
//! [`QueryBuilder`] derives, so only populated filters reach the query.

use super::{
    action_is, alert, permitted, record_url, waiting_badge, ROW, SELF_URL, STMT,
};
use crate::scaffold::ast::{Condition, Expr, Node, Stmt};
use crate::scaffold::context::GenerationContext;
use crate::scaffold::field_type::{ElementType, FieldDescriptor, FieldSet, FilterKind, SanitizeFilter};
use crate::scaffold::helpers::TemplateHelpers;
use crate::scaffold::query::{FilterPredicate, QueryBuilder, WAITING_FOR_COLUMN};

const WHERE: &str = "where";
const PARAMS: &str = "params";
const SEARCH: &str = "q";
const ORDER: &str = "order";
const ORDER_BY: &str = "orderBy";
const ORDER_METHOD: &str = "orderMethod";
const OFFSET: &str = "offset";
const TOTAL: &str = "total";
const COUNT_ROW: &str = "countRow";
const NUMBER: &str = "no";
const SHOW_ONLY: &str = "showOnly";

/// Build the list page, shown when no other `user_action` applies
#[must_use]
pub fn build(ctx: &GenerationContext) -> Vec<Node> {
    let shown = Expr::and(
        Expr::and(
            Expr::ne(Expr::var(super::USER_ACTION), Expr::str("insert")),
            Expr::ne(Expr::var(super::USER_ACTION), Expr::str("update")),
        ),
        Expr::not(action_is("detail")),
    );

    let mut body = filter_form(ctx);
    body.extend(where_clause(ctx));
    body.extend(ordering(ctx));
    body.push(Node::assign(
        OFFSET,
        Expr::to_int(Expr::get(OFFSET, Some(SanitizeFilter::NumberInt))),
    ));
    body.push(Node::when_runtime(
        Expr::lt(Expr::var(OFFSET), Expr::int(0)),
        vec![Node::assign(OFFSET, Expr::int(0))],
    ));
    body.push(Node::code(Stmt::Try {
        body: rows(ctx),
        on_error: vec![alert(
            "alert-danger",
            &ctx.runtime().messages.database_failure,
        )],
    }));

    vec![Node::when_runtime(shown, body)]
}

/// Filter descriptors paired with their predicates, in declaration order
fn filter_pairs(ctx: &GenerationContext) -> Vec<(&FieldDescriptor, FilterPredicate)> {
    ctx.fields()
        .iter()
        .flat_map(|field| field.list_filters.iter().map(move |_| field))
        .zip(QueryBuilder::new(ctx).filters())
        .collect()
}

fn filter_var(predicate: &FilterPredicate) -> String {
    format!("filter_{}", predicate.param)
}

fn filter_form(ctx: &GenerationContext) -> Vec<Node> {
    let mut nodes = vec![Node::markup(
        "<div class=\"filter-section\">\n<form name=\"filterform\" id=\"filterform\" action=\"\" method=\"get\">\n",
    )];

    for (field, predicate) in filter_pairs(ctx) {
        let value = Expr::get(&predicate.param, Some(predicate.sanitize));
        nodes.push(Node::markup(format!(
            "<span class=\"filter-group\">\n<span class=\"filter-label\">{}</span>\n",
            TemplateHelpers::escape_html(&field.caption())
        )));
        match predicate.kind {
            FilterKind::Text => {
                nodes.push(Node::markup(format!(
                    "<input type=\"text\" class=\"form-control\" name=\"{0}\" id=\"{0}\" autocomplete=\"off\" value=\"",
                    predicate.param
                )));
                nodes.push(Node::echo(Expr::escape(value)));
                nodes.push(Node::markup("\">\n"));
            }
            FilterKind::Select => {
                let relation = field.related();
                nodes.push(Node::markup(format!(
                    "<select class=\"form-control\" name=\"{0}\" id=\"{0}\">\n<option value=\"\">- All -</option>\n",
                    predicate.param
                )));
                nodes.push(Node::echo(Expr::cms(
                    "createDropDownMenu",
                    vec![
                        Expr::str(&relation.table),
                        Expr::str(&relation.key),
                        Expr::str(&relation.label),
                        value,
                    ],
                )));
                nodes.push(Node::markup("\n</select>\n"));
            }
        }
        nodes.push(Node::markup("</span>\n"));
    }

    if QueryBuilder::new(ctx).search_predicate().is_some() {
        nodes.push(Node::markup(
            "<span class=\"filter-group\">\n<input type=\"text\" class=\"form-control\" name=\"q\" id=\"q\" autocomplete=\"off\" value=\"",
        ));
        nodes.push(Node::echo(Expr::escape(Expr::get(
            SEARCH,
            Some(SanitizeFilter::SpecialChars),
        ))));
        nodes.push(Node::markup("\">\n</span>\n"));
    }

    nodes.push(Node::markup(
        "<span class=\"filter-group\">\n<input type=\"submit\" class=\"btn btn-success\" value=\"Show\">\n</span>\n",
    ));
    nodes.push(Node::when(
        Condition::Approval,
        vec![Node::markup(
            "<span class=\"filter-group\">\n<button type=\"submit\" class=\"btn btn-warning\" name=\"show-only\" value=\"need-approval\">Need Approval</button>\n</span>\n",
        )],
    ));
    nodes.push(Node::when_runtime(
        permitted("insert"),
        vec![
            Node::markup(
                "<span class=\"filter-group\">\n<input type=\"button\" class=\"btn btn-primary\" value=\"Add\" onclick=\"window.location='",
            ),
            Node::echo(Expr::var(SELF_URL)),
            Node::markup("?user_action=insert';\">\n</span>\n"),
        ],
    ));
    nodes.push(Node::markup("</form>\n</div>\n"));
    nodes
}

/// Run-time WHERE extension and its bound parameters
fn where_clause(ctx: &GenerationContext) -> Vec<Node> {
    let qb = QueryBuilder::new(ctx);
    let mut nodes = vec![
        Node::assign(WHERE, Expr::str("")),
        Node::assign(PARAMS, Expr::Array(Vec::new())),
    ];

    for predicate in qb.filters() {
        let var = filter_var(&predicate);
        let bound = match predicate.kind {
            FilterKind::Text => like(Expr::var(&var)),
            FilterKind::Select => Expr::var(&var),
        };
        nodes.push(Node::assign(
            &var,
            Expr::get(&predicate.param, Some(predicate.sanitize)),
        ));
        nodes.push(Node::when_runtime(
            Expr::non_empty(Expr::var(&var)),
            vec![
                Node::code(Stmt::append(
                    WHERE,
                    Expr::str(format!(" and {}", predicate.sql())),
                )),
                Node::code(Stmt::push(PARAMS, bound)),
            ],
        ));
    }

    if let Some(search) = qb.search_predicate() {
        let mut matched = vec![Node::code(Stmt::append(
            WHERE,
            Expr::str(format!(" and {search}")),
        ))];
        for _ in qb.search_columns() {
            matched.push(Node::code(Stmt::push(PARAMS, like(Expr::var(SEARCH)))));
        }
        nodes.push(Node::assign(
            SEARCH,
            Expr::get(SEARCH, Some(SanitizeFilter::SpecialChars)),
        ));
        nodes.push(Node::when_runtime(Expr::non_empty(Expr::var(SEARCH)), matched));
    }

    nodes.push(Node::when(
        Condition::Approval,
        vec![
            Node::assign(
                SHOW_ONLY,
                Expr::get("show-only", Some(SanitizeFilter::SpecialChars)),
            ),
            Node::when_runtime(
                Expr::eq(Expr::var(SHOW_ONLY), Expr::str("need-approval")),
                vec![Node::code(Stmt::append(
                    WHERE,
                    Expr::str(format!(
                        " and coalesce({}, 0) != 0",
                        ctx.column(&ctx.approval_column())
                    )),
                ))],
            ),
        ],
    ));
    nodes
}

fn like(value: Expr) -> Expr {
    Expr::concat(vec![Expr::str("%"), value, Expr::str("%")])
}

/// ORDER BY chosen at run time from the whitelisted list columns
///
/// `chooseOneFrom` yields an empty column for an unknown name and the
/// first method for an unknown direction.
fn ordering(ctx: &GenerationContext) -> Vec<Node> {
    let qb = QueryBuilder::new(ctx);
    let requested = if ctx.options().quote_identifiers {
        Expr::concat(vec![
            Expr::str("`"),
            Expr::var(ORDER_BY),
            Expr::str("` "),
            Expr::var(ORDER_METHOD),
        ])
    } else {
        Expr::concat(vec![
            Expr::var(ORDER_BY),
            Expr::str(" "),
            Expr::var(ORDER_METHOD),
        ])
    };

    vec![
        Node::assign(
            ORDER_BY,
            Expr::cms(
                "chooseOneFrom",
                vec![
                    Expr::str(qb.sortable_columns().join("|")),
                    Expr::get("orderby", Some(SanitizeFilter::SpecialChars)),
                    Expr::raw("false"),
                ],
            ),
        ),
        Node::assign(
            ORDER_METHOD,
            Expr::cms(
                "chooseOneFrom",
                vec![
                    Expr::str("asc|desc"),
                    Expr::get("ordermethod", Some(SanitizeFilter::SpecialChars)),
                    Expr::raw("true"),
                ],
            ),
        ),
        Node::assign(ORDER, Expr::str(qb.default_order())),
        Node::when_runtime(
            Expr::non_empty(Expr::var(ORDER_BY)),
            vec![Node::assign(ORDER, requested)],
        ),
    ]
}

fn rows(ctx: &GenerationContext) -> Vec<Node> {
    let qb = QueryBuilder::new(ctx);
    let messages = &ctx.runtime().messages;
    let page_size = i64::from(ctx.runtime().page_size);

    let list_sql = Expr::concat(vec![
        Expr::str(qb.list_sql()),
        Expr::var(WHERE),
        Expr::str(" order by "),
        Expr::var(ORDER),
        Expr::str(format!(" limit {page_size} offset ")),
        Expr::var(OFFSET),
    ]);

    let mut found = vec![
        Node::code(Stmt::select(STMT, list_sql, Expr::var(PARAMS))),
        Node::assign(NUMBER, Expr::var(OFFSET)),
        Node::markup("<form name=\"mainform\" id=\"mainform\" action=\"\" method=\"post\">\n"),
    ];
    found.extend(pagination(page_size));
    found.extend(table(ctx));
    found.extend(pagination(page_size));
    found.extend(buttons());
    found.push(Node::markup("</form>\n"));

    vec![
        Node::code(Stmt::select(
            STMT,
            Expr::concat(vec![Expr::str(qb.count_sql()), Expr::var(WHERE)]),
            Expr::var(PARAMS),
        )),
        Node::assign(COUNT_ROW, Expr::fetch(STMT)),
        Node::assign(TOTAL, Expr::int(0)),
        Node::when_runtime(
            Expr::ne(Expr::var(COUNT_ROW), Expr::Null),
            vec![Node::assign(
                TOTAL,
                Expr::to_int(Expr::index(Expr::var(COUNT_ROW), TOTAL)),
            )],
        ),
        Node::if_else(
            Expr::gt(Expr::var(TOTAL), Expr::int(0)),
            found,
            vec![alert("alert-warning", &messages.not_found)],
        ),
    ]
}

/// Pager placeholder filled in by the framework's client script
fn pagination(page_size: i64) -> Vec<Node> {
    vec![
        Node::markup("<div data-pagination=\"true\" data-self-name=\""),
        Node::echo(Expr::var(SELF_URL)),
        Node::markup("\" data-max-record=\""),
        Node::echo(Expr::var(TOTAL)),
        Node::markup(format!("\" data-record-per-page=\"{page_size}\" data-hide=\"")),
        Node::echo(Expr::ternary(
            Expr::gt(Expr::var(TOTAL), Expr::int(page_size)),
            Expr::str("false"),
            Expr::str("true"),
        )),
        Node::markup("\"></div>\n"),
    ]
}

fn table(ctx: &GenerationContext) -> Vec<Node> {
    let pk = ctx.pk().to_string();
    let mut nodes = vec![
        Node::markup(
            "<div class=\"row-table-container\">\n<table class=\"table table-striped\" border=\"0\" cellpadding=\"0\" cellspacing=\"0\" width=\"100%\" data-table-sort=\"true\">\n<thead>\n<tr>\n",
        ),
        Node::when(
            Condition::ManualSort,
            vec![Node::markup("<td class=\"drag-handler\"></td>\n")],
        ),
        Node::markup(format!(
            "<td width=\"16\" align=\"center\"><input type=\"checkbox\" class=\"checkbox-select-all\" data-selector=\".checkbox-{pk}\" value=\"1\"></td>\n\
             <td width=\"16\" align=\"center\"><span class=\"fa fa-edit\"></span></td>\n\
             <td width=\"16\" align=\"center\"><span class=\"fa fa-folder\"></span></td>\n\
             <td width=\"25\">No</td>\n"
        )),
        Node::field_loop(FieldSet::List, |field, _| {
            vec![Node::markup(format!(
                "<td class=\"col-sort\" data-col-name=\"{}\"><a href=\"#\">{}</a></td>\n",
                field.name,
                TemplateHelpers::escape_html(&field.caption())
            ))]
        }),
        Node::when(
            Condition::Approval,
            vec![Node::markup("<td>Status</td>\n")],
        ),
        Node::markup("</tr>\n</thead>\n"),
        Node::choose(
            Condition::ManualSort,
            vec![
                Node::markup("<tbody class=\"data-table-manual-sort\" data-offset=\""),
                Node::echo(Expr::var(OFFSET)),
                Node::markup("\">\n"),
            ],
            vec![Node::markup("<tbody>\n")],
        ),
    ];

    let key = Expr::row(&pk);
    let mut row = vec![
        Node::assign(NUMBER, Expr::add(Expr::var(NUMBER), Expr::int(1))),
        Node::markup("<tr data-id=\""),
        Node::echo(Expr::escape(key.clone())),
        Node::markup("\">\n"),
        Node::when(
            Condition::ManualSort,
            vec![Node::markup("<td class=\"drag-handler\"></td>\n")],
        ),
        Node::markup(format!(
            "<td width=\"16\" align=\"center\"><input type=\"checkbox\" class=\"checkbox-{pk}\" name=\"{pk}[]\" value=\""
        )),
        Node::echo(Expr::escape(key.clone())),
        Node::markup("\"></td>\n<td width=\"16\" align=\"center\"><a href=\""),
        Node::echo(record_url(ctx, "update", key.clone())),
        Node::markup("\" class=\"edit-control\"><span class=\"fa fa-edit\"></span></a></td>\n<td width=\"16\" align=\"center\"><a href=\""),
        Node::echo(record_url(ctx, "detail", key)),
        Node::markup("\" class=\"detail-control field-master\"><span class=\"fa fa-folder\"></span></a></td>\n<td align=\"right\" class=\"cell-no\">"),
        Node::echo(Expr::var(NUMBER)),
        Node::markup("</td>\n"),
        Node::field_loop(FieldSet::List, |field, _| {
            let value = Expr::row(QueryBuilder::display_column(field));
            let shown = if field.element_type == ElementType::Checkbox {
                Expr::ternary(
                    Expr::eq(value, Expr::str("1")),
                    Expr::str("Yes"),
                    Expr::str("No"),
                )
            } else {
                Expr::escape(value)
            };
            vec![
                Node::markup(format!("<td data-col-name=\"{}\">", field.name)),
                Node::echo(shown),
                Node::markup("</td>\n"),
            ]
        }),
    ];
    if ctx.options().with_approval {
        row.push(Node::markup("<td class=\"waiting-for\">"));
        row.extend(waiting_badge(
            ctx,
            Expr::to_int(Expr::row(WAITING_FOR_COLUMN)),
        ));
        row.push(Node::markup("</td>\n"));
    }
    row.push(Node::markup("</tr>\n"));

    nodes.push(Node::code(Stmt::FetchLoop {
        stmt: STMT.to_string(),
        row: ROW.to_string(),
        body: row,
    }));
    nodes.push(Node::markup("</tbody>\n</table>\n</div>\n"));
    nodes
}

fn buttons() -> Vec<Node> {
    vec![
        Node::markup("<div class=\"button-area\">\n"),
        Node::when_runtime(
            permitted("update"),
            vec![Node::markup(
                "<input type=\"submit\" class=\"btn btn-success\" name=\"data_activate\" value=\"Activate\">\n\
                 <input type=\"submit\" class=\"btn btn-warning\" name=\"data_deactivate\" value=\"Deactivate\">\n",
            )],
        ),
        Node::when_runtime(
            permitted("delete"),
            vec![Node::markup(
                "<input type=\"submit\" class=\"btn btn-danger\" name=\"data_delete\" value=\"Delete\" onclick=\"return confirm('Delete the selected rows?');\">\n",
            )],
        ),
        Node::when(
            Condition::ManualSort,
            vec![Node::when_runtime(
                permitted("update"),
                vec![Node::markup(
                    "<input type=\"button\" class=\"btn btn-primary\" id=\"save-current-order\" value=\"Save Current Order\" disabled=\"disabled\">\n",
                )],
            )],
        ),
        Node::markup("</div>\n"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::ast::Renderer;
    use crate::scaffold::field_type::DataType;
    use crate::scaffold::options::GenerationOptions;
    use crate::scaffold::target::{Jsp, Php};

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("article_id", DataType::Int).primary_key(),
            FieldDescriptor::new("title", DataType::Text)
                .list()
                .filter(FilterKind::Text),
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .list()
                .filter(FilterKind::Select),
            FieldDescriptor::new("active", DataType::Int)
                .element(ElementType::Checkbox)
                .list(),
        ]
    }

    fn render(options: GenerationOptions) -> String {
        let ctx = GenerationContext::new("article", &fields(), options);
        Renderer::new(&Php, &ctx).render(&build(&ctx))
    }

    #[test]
    fn test_filters_build_where_at_run_time() {
        let out = render(GenerationOptions::default());
        assert!(out.contains("$filter_title = filterInput(INPUT_GET, 'title', FILTER_SANITIZE_SPECIAL_CHARS, true);"));
        assert!(out.contains("if ($filter_title != '') {"));
        assert!(out.contains("$where .= ' and lower(article.title) like lower(?)';"));
        assert!(out.contains("$params[] = '%' . $filter_title . '%';"));
        assert!(out.contains("$where .= ' and article.category_id = ?';"));
        assert!(out.contains("$params[] = $filter_category_id;"));
        assert!(out.contains("<?php echo $cms->createDropDownMenu('category', 'category_id', 'name', filterInput(INPUT_GET, 'category_id', FILTER_SANITIZE_NUMBER_INT, true)); ?>"));
    }

    #[test]
    fn test_search_binds_one_value_per_column() {
        let out = render(GenerationOptions::default());
        assert!(out.contains("$where .= ' and (lower(article.title) like lower(?))';"));
        assert_eq!(out.matches("$params[] = '%' . $q . '%';").count(), 1);
        assert!(out.contains("name=\"q\""));
    }

    #[test]
    fn test_ordering_is_whitelisted() {
        let out = render(GenerationOptions::default().descending());
        assert!(out.contains("$orderBy = $cms->chooseOneFrom('article_id|title|category_id|active', filterInput(INPUT_GET, 'orderby', FILTER_SANITIZE_SPECIAL_CHARS, true), false);"));
        assert!(out.contains("$orderMethod = $cms->chooseOneFrom('asc|desc', filterInput(INPUT_GET, 'ordermethod', FILTER_SANITIZE_SPECIAL_CHARS, true), true);"));
        assert!(out.contains("$order = 'article.article_id desc';"));
        assert!(out.contains("if ($orderBy != '') {"));
        assert!(out.contains("$order = $orderBy . ' ' . $orderMethod;"));
    }

    #[test]
    fn test_paged_queries() {
        let out = render(GenerationOptions::default());
        assert!(out.contains("$stmt = $database1->prepare('select count(*) as total from article where 1 = 1' . $where);"));
        assert!(out.contains("$countRow = $stmt->fetch();"));
        assert!(out.contains("if ($countRow != null) {"));
        assert!(out.contains("' order by ' . $order . ' limit 20 offset ' . $offset"));
        assert!(out.contains("if ($offset < 0) {"));
        assert!(out.contains("while ($row = $stmt->fetch()) {"));
        assert!(out.contains("<div class=\"alert alert-warning\">Data not found</div>"));
        assert!(out.contains("<div class=\"alert alert-danger\">Database access failed</div>"));
    }

    #[test]
    fn test_pagination_is_left_to_the_client() {
        let out = render(GenerationOptions::default());
        let pager = "<div data-pagination=\"true\" data-self-name=\"<?php echo $selfUrl; ?>\" data-max-record=\"<?php echo $total; ?>\" data-record-per-page=\"20\" data-hide=\"<?php echo ($total > 20 ? 'false' : 'true'); ?>\"></div>";
        assert_eq!(out.matches(pager).count(), 2);
        assert!(!out.contains("$query1->pagination"));
    }

    #[test]
    fn test_rows() {
        let out = render(GenerationOptions::default());
        assert!(out.contains("name=\"article_id[]\" value=\"<?php echo $cms->escapeHTML($row['article_id']); ?>\""));
        assert!(out.contains("<?php echo $selfUrl . '?user_action=update&article_id=' . $row['article_id']; ?>"));
        assert!(out.contains("<?php echo ($row['active'] == '1' ? 'Yes' : 'No'); ?>"));
        assert!(out.contains("<td class=\"col-sort\" data-col-name=\"title\"><a href=\"#\">Title</a></td>"));
        assert!(out.contains("name=\"data_activate\""));
        assert!(out.contains("name=\"data_delete\""));
        assert!(!out.contains("waiting-for"));
        assert!(!out.contains("drag-handler"));
    }

    #[test]
    fn test_select_cells_show_label() {
        let out = render(GenerationOptions::default());
        assert!(out.contains("<td data-col-name=\"category_id\"><?php echo $cms->escapeHTML($row['category_id_label']); ?></td>"));
        assert!(out.contains("article.category_id, (select category.name from category"));
    }

    #[test]
    fn test_approval_columns_and_filter() {
        let out = render(GenerationOptions::default().with_approval());
        assert!(out.contains("coalesce(article.article_apv_id, 0) as article_apv_id"));
        assert!(out.contains("if ($showOnly == 'need-approval') {"));
        assert!(out.contains("<td class=\"waiting-for\">"));
        assert!(out.contains("Waiting for update approval"));
    }

    #[test]
    fn test_manual_sort() {
        let out = render(GenerationOptions::default().manual_sort());
        assert!(out.contains("$order = 'article.sort_order asc';"));
        assert!(out.contains("data-offset=\"<?php echo $offset; ?>\""));
        assert!(out.contains("save-current-order"));
    }

    #[test]
    fn test_jsp_list() {
        let ctx = GenerationContext::new("article", &fields(), GenerationOptions::default());
        let out = Renderer::new(&Jsp, &ctx).render(&build(&ctx));
        assert!(out.contains("java.util.List<Object> params = new java.util.ArrayList<Object>();"));
        assert!(out.contains("params.add(\"%\" + filter_title + \"%\");"));
        assert!(out.contains("java.sql.ResultSet stmt = database1.executeQuery("));
        assert!(out.contains("java.sql.ResultSet countRow = (stmt.next() ? stmt : null);"));
        assert!(out.contains("long total = 0;"));
        assert!(out.contains("for (java.sql.ResultSet row = stmt; row.next(); ) {"));
        assert!(out.contains("String orderBy = chooseOneFrom(\"article_id|title|category_id|active\""));
        assert!(out.contains("data-max-record=\"<%= total %>\""));
    }
}
