//! Detail page section
//!
//! Shows the detail field set of one record. With approval on, a pending
//! update also loads the shadow row so the proposed values appear next to
//! the current ones, and approvers get approve/reject buttons.

use super::{
    action_is, alert, key_input, link_button, permitted, record_url, waiting_badge, ID, ROW,
    SELF_URL, STMT, TABLE_CLOSE, TABLE_OPEN,
};
use crate::scaffold::approval::WaitingFor;
use crate::scaffold::ast::{Condition, Expr, Node, Stmt};
use crate::scaffold::context::GenerationContext;
use crate::scaffold::field_type::FieldSet;
use crate::scaffold::helpers::TemplateHelpers;
use crate::scaffold::query::{QueryBuilder, WAITING_FOR_COLUMN};

/// Run-time variable holding the pending shadow row
pub const SHADOW: &str = "shadow";

/// Run-time variable holding the shadow row statement
const SHADOW_STMT: &str = "shadowStmt";

/// Build the detail page, shown for `user_action=detail`
#[must_use]
pub fn build(ctx: &GenerationContext) -> Vec<Node> {
    let messages = &ctx.runtime().messages;

    let mut found = vec![Node::when(Condition::Approval, load_shadow(ctx))];
    found.push(Node::markup(
        "<form name=\"detailform\" id=\"detailform\" action=\"\" method=\"post\">\n",
    ));
    found.push(Node::markup(TABLE_OPEN));
    found.push(Node::field_loop(FieldSet::Detail, |field, ctx| {
        let mut nodes = vec![
            Node::markup(format!(
                "<tr>\n<td>{}</td>\n<td>",
                TemplateHelpers::escape_html(&field.caption())
            )),
            Node::echo(Expr::escape(Expr::row(QueryBuilder::display_column(field)))),
            Node::markup("</td>\n"),
        ];
        if ctx.options().with_approval {
            nodes.push(Node::when_runtime(
                Expr::ne(Expr::var(SHADOW), Expr::Null),
                vec![
                    Node::markup("<td class=\"proposed-value\">"),
                    Node::echo(Expr::escape(Expr::index(
                        Expr::var(SHADOW),
                        &field.name,
                    ))),
                    Node::markup("</td>\n"),
                ],
            ));
        }
        nodes.push(Node::markup("</tr>\n"));
        nodes
    }));
    found.push(Node::markup(TABLE_CLOSE));
    found.push(Node::when(Condition::Approval, review(ctx)));
    found.push(Node::markup(TABLE_OPEN));
    found.push(Node::markup("<tr>\n<td></td>\n<td>\n"));
    found.push(Node::when_runtime(
        permitted("update"),
        link_button(
            "btn-primary",
            "Edit",
            record_url(ctx, "update", Expr::var(ID)),
        ),
    ));
    found.extend(link_button("btn-primary", "Back", Expr::var(SELF_URL)));
    found.push(Node::markup("</td>\n</tr>\n"));
    found.push(Node::markup(TABLE_CLOSE));
    found.push(Node::markup("</form>\n"));

    let body = vec![
        Node::assign(ID, key_input(ctx, false)),
        Node::code(Stmt::Try {
            body: vec![
                Node::code(Stmt::select(
                    STMT,
                    Expr::str(QueryBuilder::new(ctx).detail_sql()),
                    Expr::Array(vec![Expr::var(ID)]),
                )),
                Node::assign(ROW, Expr::fetch(STMT)),
                Node::if_else(
                    Expr::ne(Expr::var(ROW), Expr::Null),
                    found,
                    vec![alert("alert-warning", &messages.not_found)],
                ),
            ],
            on_error: vec![alert("alert-danger", &messages.database_failure)],
        }),
    ];
    vec![Node::when_runtime(action_is("detail"), body)]
}

fn load_shadow(ctx: &GenerationContext) -> Vec<Node> {
    let shadow = ctx.shadow_table();
    let sql = format!(
        "select * from {} where {} = ?",
        ctx.ident(&shadow),
        ctx.qualified(&shadow, &ctx.approval_column())
    );
    vec![
        Node::assign(SHADOW, Expr::Null),
        Node::when_runtime(
            Expr::eq(
                Expr::to_int(Expr::row(WAITING_FOR_COLUMN)),
                Expr::int(WaitingFor::Update.code()),
            ),
            vec![
                Node::code(Stmt::select(
                    SHADOW_STMT,
                    Expr::str(sql),
                    Expr::Array(vec![Expr::to_int(Expr::row(ctx.approval_column()))]),
                )),
                Node::assign(SHADOW, Expr::fetch(SHADOW_STMT)),
            ],
        ),
    ]
}

fn review(ctx: &GenerationContext) -> Vec<Node> {
    let waiting = Expr::to_int(Expr::row(WAITING_FOR_COLUMN));

    let mut buttons = vec![
        Node::markup(format!(
            "<input type=\"hidden\" name=\"{}\" value=\"",
            ctx.pk()
        )),
        Node::echo(Expr::escape(Expr::row(ctx.pk()))),
        Node::markup("\">\n"),
    ];
    buttons.push(Node::when(
        Condition::Note,
        vec![Node::markup(
            "<textarea class=\"form-control\" name=\"apv_note\" id=\"apv_note\" placeholder=\"Note\"></textarea>\n",
        )],
    ));
    buttons.push(Node::markup(
        "<input type=\"submit\" class=\"btn btn-success\" name=\"data_approve\" id=\"data_approve\" value=\"Approve\">\n\
         <input type=\"submit\" class=\"btn btn-danger\" name=\"data_reject\" id=\"data_reject\" value=\"Reject\">\n",
    ));

    let mut pending = vec![Node::markup("<div class=\"alert alert-info\">\n")];
    pending.extend(waiting_badge(ctx, waiting));
    pending.push(Node::markup("</div>\n"));
    pending.push(Node::when_runtime(permitted("approve"), buttons));

    vec![Node::when_runtime(
        Expr::ne(
            Expr::to_int(Expr::row(ctx.approval_column())),
            Expr::int(0),
        ),
        pending,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::ast::Renderer;
    use crate::scaffold::field_type::{DataType, ElementType, FieldDescriptor};
    use crate::scaffold::options::GenerationOptions;
    use crate::scaffold::target::{Jsp, Php};

    fn ctx(options: GenerationOptions) -> GenerationContext {
        let fields = vec![
            FieldDescriptor::new("article_id", DataType::Int).primary_key().detail(),
            FieldDescriptor::new("title", DataType::Text).detail(),
            FieldDescriptor::new("category_id", DataType::Int)
                .element(ElementType::Select)
                .detail(),
        ];
        GenerationContext::new("article", &fields, options)
    }

    #[test]
    fn test_detail_without_approval() {
        let ctx = ctx(GenerationOptions::default());
        let out = Renderer::new(&Php, &ctx).render(&build(&ctx));
        assert!(out.contains("'select article.article_id, article.title, article.category_id, (select category.name from category where category.category_id = article.category_id) as category_id_label from article where article.article_id = ?'"));
        assert!(out.contains("$row = $stmt->fetch();"));
        assert!(out.contains("if ($row != null) {"));
        assert!(out.contains("<tr>\n<td>Title</td>\n<td><?php echo $cms->escapeHTML($row['title']); ?></td>\n</tr>\n"));
        assert!(out.contains("<?php echo $cms->escapeHTML($row['category_id_label']); ?>"));
        assert!(out.contains("if (stripos($permission, 'update') !== false) {"));
        assert!(!out.contains("data_approve"));
        assert!(!out.contains("$shadow"));
    }

    #[test]
    fn test_detail_with_approval() {
        let ctx = ctx(GenerationOptions::default().with_approval().with_note());
        let out = Renderer::new(&Php, &ctx).render(&build(&ctx));
        assert!(out.contains("$shadow = null;"));
        assert!(out.contains("$shadowStmt = $database1->prepare('select * from article_apv where article_apv.article_apv_id = ?');"));
        assert!(out.contains("$shadow = $shadowStmt->fetch();"));
        assert!(out.contains("if ($shadow != null) {"));
        assert!(out.contains("<?php echo $cms->escapeHTML($shadow['title']); ?>"));
        assert!(out.contains("if (stripos($permission, 'approve') !== false) {"));
        assert!(out.contains("name=\"data_approve\""));
        assert!(out.contains("name=\"data_reject\""));
        assert!(out.contains("name=\"apv_note\""));
        assert!(out.contains("<input type=\"hidden\" name=\"article_id\" value=\"<?php echo $cms->escapeHTML($row['article_id']); ?>\">"));
    }

    #[test]
    fn test_detail_jsp() {
        let ctx = ctx(GenerationOptions::default().with_approval());
        let out = Renderer::new(&Jsp, &ctx).render(&build(&ctx));
        assert!(out.contains("java.sql.ResultSet row = (stmt.next() ? stmt : null);"));
        assert!(out.contains("if (row != null) {"));
        assert!(out.contains("java.sql.ResultSet shadow = null;"));
        assert!(out.contains("java.sql.ResultSet shadowStmt = database1.executeQuery("));
        assert!(out.contains("<%= escapeHTML(String.valueOf(row.getString(\"title\"))) %>"));
        assert!(!out.contains("apv_note"));
    }
}
