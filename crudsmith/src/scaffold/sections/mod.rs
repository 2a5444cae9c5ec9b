//! Section emitters
//!
//! A generated page is six sections in a fixed order. Each emitter is a pure
//! function from the [`GenerationContext`] to a list of AST [`Node`]s; the
//! generator renders every section for every target.

pub mod controller;
pub mod detail;
pub mod insert;
pub mod list;
pub mod update;

use super::ast::{Condition, Expr, Node, Stmt};
use super::context::GenerationContext;
use super::field_type::{DataType, FieldDescriptor, FieldSet, SanitizeFilter};
use super::helpers::TemplateHelpers;

/// Run-time variable holding the user's permission string
pub const PERMISSION: &str = "permission";

/// Run-time variable holding the page URL
pub const SELF_URL: &str = "selfUrl";

/// Run-time variable holding the host module name
pub const MODULE: &str = "moduleName";

/// Run-time variable holding the database clock as a SQL literal
pub const NOW: &str = "now";

/// Host global: the signed-in user's level
pub const USER_LEVEL: &str = "_userLevel";

/// Host global: the signed-in user's id
pub const USER_ID: &str = "_userID";

/// Host global: the client address
pub const REMOTE_ADDRESS: &str = "_remoteAddress";

/// Run-time variable holding the `user_action` query parameter
pub const USER_ACTION: &str = "userAction";

/// Run-time variable holding the current record key
pub const ID: &str = "id";

/// Run-time variable holding the current row
pub const ROW: &str = "row";

/// Run-time variable holding the current statement
pub const STMT: &str = "stmt";

/// Section of a generated page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Framework authentication include
    AuthInclude,
    /// Mutation handler
    Controller,
    /// Insert form
    InsertUi,
    /// Update form
    UpdateUi,
    /// Detail page
    DetailUi,
    /// List page
    ListUi,
}

impl SectionKind {
    /// Sections in page order
    pub const ORDER: [Self; 6] = [
        Self::AuthInclude,
        Self::Controller,
        Self::InsertUi,
        Self::UpdateUi,
        Self::DetailUi,
        Self::ListUi,
    ];

    /// Section name used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AuthInclude => "auth-include",
            Self::Controller => "controller",
            Self::InsertUi => "insert-ui",
            Self::UpdateUi => "update-ui",
            Self::DetailUi => "detail-ui",
            Self::ListUi => "list-ui",
        }
    }

    /// Build the section AST
    #[must_use]
    pub fn build(self, ctx: &GenerationContext) -> Vec<Node> {
        match self {
            Self::AuthInclude => vec![Node::Include(ctx.runtime().auth_include.clone())],
            Self::Controller => controller::build(ctx),
            Self::InsertUi => insert::build(ctx),
            Self::UpdateUi => update::build(ctx),
            Self::DetailUi => detail::build(ctx),
            Self::ListUi => list::build(ctx),
        }
    }
}

/// Whether the permission string grants `capability`
pub(crate) fn permitted(capability: &str) -> Expr {
    Expr::contains(Expr::var(PERMISSION), Expr::str(capability))
}

/// Forbidden fragment followed by a stop
pub(crate) fn forbidden(ctx: &GenerationContext) -> Vec<Node> {
    vec![
        alert(
            "alert-warning",
            &ctx.runtime().messages.forbidden,
        ),
        Node::code(Stmt::Exit),
    ]
}

/// Render the forbidden fragment and stop unless `capability` is granted
pub(crate) fn require(ctx: &GenerationContext, capability: &str) -> Node {
    Node::when_runtime(Expr::not(permitted(capability)), forbidden(ctx))
}

/// Static alert box
pub(crate) fn alert(class: &str, message: &str) -> Node {
    Node::markup(format!(
        "<div class=\"alert {class}\">{}</div>\n",
        TemplateHelpers::escape_html(message)
    ))
}

/// Sanitized read of the key from the query string or form body
pub(crate) fn key_input(ctx: &GenerationContext, post: bool) -> Expr {
    let pk = ctx.primary_key();
    if post {
        Expr::post(&pk.name, Some(pk.sanitize_filter()))
    } else {
        Expr::get(&pk.name, Some(pk.sanitize_filter()))
    }
}

/// Convert a list element to a key value
pub(crate) fn key_from(ctx: &GenerationContext, value: Expr) -> Expr {
    if ctx.primary_key().data_type == DataType::Int {
        Expr::to_int(value)
    } else {
        value
    }
}

/// Sanitized read of a plain text request parameter
pub(crate) fn text_param(name: &str, post: bool) -> Expr {
    let filter = Some(SanitizeFilter::SpecialChars);
    if post {
        Expr::post(name, filter)
    } else {
        Expr::get(name, filter)
    }
}

/// Whether the page was requested with `user_action=<action>`
pub(crate) fn action_is(action: &str) -> Expr {
    Expr::eq(Expr::var(USER_ACTION), Expr::str(action))
}

/// `<selfUrl>?user_action=<action>&<pk>=<id>`
pub(crate) fn record_url(ctx: &GenerationContext, action: &str, id: Expr) -> Expr {
    Expr::concat(vec![
        Expr::var(SELF_URL),
        Expr::str(format!("?user_action={action}&{}=", ctx.pk())),
        id,
    ])
}

/// Business columns of a field set; the key is never updated
pub(crate) fn business_fields(ctx: &GenerationContext, set: FieldSet) -> Vec<&FieldDescriptor> {
    ctx.fields_in(set)
        .filter(|field| set != FieldSet::Update || field.name != ctx.pk())
        .collect()
}

/// Run-time variable holding a submitted field value
pub(crate) fn input_var(field: &FieldDescriptor) -> String {
    format!("input_{}", field.name)
}

/// Opening of a two-column form table
pub(crate) const TABLE_OPEN: &str = "<table class=\"responsive responsive-two-cols\" border=\"0\" cellpadding=\"0\" cellspacing=\"0\" width=\"100%\">\n<tbody>\n";

/// Closing of a form table
pub(crate) const TABLE_CLOSE: &str = "</tbody>\n</table>\n";

/// Caption cell followed by a value cell holding `value`
pub(crate) fn field_row(field: &FieldDescriptor, value: Vec<Node>) -> Vec<Node> {
    let mut nodes = vec![Node::markup(format!(
        "<tr>\n<td>{}</td>\n<td>",
        TemplateHelpers::escape_html(&field.caption())
    ))];
    nodes.extend(value);
    nodes.push(Node::markup("</td>\n</tr>\n"));
    nodes
}

/// Note field row, rendered only when approval notes are on
pub(crate) fn note_row(ctx: &GenerationContext) -> Node {
    Node::when(
        Condition::All(vec![Condition::Approval, Condition::Note]),
        vec![Node::markup(format!(
            "<tr>\n<td>{}</td>\n<td><textarea id=\"apv_note\" name=\"apv_note\" class=\"form-control\"></textarea></td>\n</tr>\n",
            TemplateHelpers::escape_html(&ctx.runtime().messages.note)
        ))],
    )
}

/// Button sending the browser to `url`
pub(crate) fn link_button(class: &str, caption: &str, url: Expr) -> Vec<Node> {
    vec![
        Node::markup(format!(
            "<input type=\"button\" class=\"btn {class}\" value=\"{caption}\" onclick=\"window.location='"
        )),
        Node::echo(url),
        Node::markup("';\">\n"),
    ]
}

/// Fold branches into one `if` / `else if` chain
pub(crate) fn chain(branches: Vec<(Expr, Vec<Node>)>) -> Option<Node> {
    branches
        .into_iter()
        .rev()
        .fold(None, |otherwise, (cond, then)| {
            Some(Node::if_else(cond, then, otherwise.into_iter().collect()))
        })
}

/// Badge naming the pending change of the current row
pub(crate) fn waiting_badge(ctx: &GenerationContext, waiting_for: Expr) -> Option<Node> {
    use super::approval::WaitingFor;

    let messages = &ctx.runtime().messages;
    let branches = WaitingFor::PENDING
        .iter()
        .map(|kind| {
            let text = match kind {
                WaitingFor::Create | WaitingFor::Nothing => &messages.waiting_create,
                WaitingFor::Update => &messages.waiting_update,
                WaitingFor::Activate => &messages.waiting_activate,
                WaitingFor::Deactivate => &messages.waiting_deactivate,
                WaitingFor::Delete => &messages.waiting_delete,
            };
            (
                Expr::eq(waiting_for.clone(), Expr::int(kind.code())),
                vec![Node::markup(format!(
                    "<span class=\"badge badge-warning\">{}</span>\n",
                    TemplateHelpers::escape_html(text)
                ))],
            )
        })
        .collect();
    chain(branches)
}
