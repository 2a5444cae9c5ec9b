//! Update form section
//!
//! Loads the record named by the key in the query string and renders its
//! values into the synthesized controls. With approval on, a record that
//! already has a pending change shows its badge instead of the form.

use super::{
    action_is, alert, field_row, key_input, link_button, note_row, record_url, require,
    waiting_badge, ID, ROW, SELF_URL, STMT, TABLE_CLOSE, TABLE_OPEN,
};
use crate::scaffold::ast::{Condition, Expr, Node, Stmt};
use crate::scaffold::context::GenerationContext;
use crate::scaffold::control::{synthesize, FormMode};
use crate::scaffold::field_type::FieldSet;
use crate::scaffold::query::{QueryBuilder, WAITING_FOR_COLUMN};

/// Build the update form, shown for `user_action=update`
#[must_use]
pub fn build(ctx: &GenerationContext) -> Vec<Node> {
    let messages = &ctx.runtime().messages;
    let loaded = vec![Node::choose(
        Condition::Approval,
        vec![Node::if_else(
            Expr::ne(
                Expr::to_int(Expr::row(ctx.approval_column())),
                Expr::int(0),
            ),
            pending(ctx),
            form(ctx),
        )],
        form(ctx),
    )];

    let body = vec![
        require(ctx, "update"),
        Node::assign(ID, key_input(ctx, false)),
        Node::code(Stmt::Try {
            body: vec![
                Node::code(Stmt::select(
                    STMT,
                    Expr::str(QueryBuilder::new(ctx).row_sql()),
                    Expr::Array(vec![Expr::var(ID)]),
                )),
                Node::assign(ROW, Expr::fetch(STMT)),
                Node::if_else(
                    Expr::ne(Expr::var(ROW), Expr::Null),
                    loaded,
                    vec![alert("alert-warning", &messages.not_found)],
                ),
            ],
            on_error: vec![alert("alert-danger", &messages.database_failure)],
        }),
    ];
    vec![Node::when_runtime(action_is("update"), body)]
}

fn pending(ctx: &GenerationContext) -> Vec<Node> {
    let mut nodes = vec![Node::markup("<div class=\"alert alert-info\">\n")];
    nodes.extend(waiting_badge(
        ctx,
        Expr::to_int(Expr::row(WAITING_FOR_COLUMN)),
    ));
    nodes.push(Node::markup("</div>\n"));
    nodes.extend(link_button(
        "btn-primary",
        "Back",
        record_url(ctx, "detail", Expr::var(ID)),
    ));
    nodes
}

fn form(ctx: &GenerationContext) -> Vec<Node> {
    let mut nodes = vec![
        Node::markup("<form name=\"editform\" id=\"editform\" action=\"\" method=\"post\">\n"),
        Node::markup(TABLE_OPEN),
        Node::field_loop(FieldSet::Update, |field, ctx| {
            // the key is read from the query string, never edited
            if field.name == ctx.pk() {
                return Vec::new();
            }
            let existing = Expr::row(&field.name);
            field_row(
                field,
                synthesize(field, FormMode::Update, Some(existing)).nodes(),
            )
        }),
        note_row(ctx),
        Node::markup(TABLE_CLOSE),
        Node::markup(TABLE_OPEN),
        Node::markup("<tr>\n<td></td>\n<td>\n"),
        Node::markup(
            "<input type=\"submit\" class=\"btn btn-success\" name=\"button_save\" id=\"button_save\" value=\"Save\">\n",
        ),
    ];
    nodes.extend(link_button("btn-primary", "Cancel", Expr::var(SELF_URL)));
    nodes.push(Node::markup("</td>\n</tr>\n"));
    nodes.push(Node::markup(TABLE_CLOSE));
    nodes.push(Node::markup("</form>\n"));
    nodes
}
