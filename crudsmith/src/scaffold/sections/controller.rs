//! Controller section
//!
//! Handles every mutation the page accepts. The request is logged with the
//! host before anything else runs. Each request shape maps to one branch of
//! a single `if` / `else if` chain; a branch first checks the capability it
//! needs, then runs the side effects the approval state machine lists for
//! the action inside a catch-all handler that logs and redirects back to
//! the page.
//!
//! Statements talk to the host library only: permission lookup, request
//! logging, key lists, flag and delete helpers go through `cms`, and SQL
//! the library has no helper for is bound through `database1`.

use super::{
    action_is, business_fields, chain, input_var, key_from, key_input, record_url, require,
    text_param, ID, MODULE, NOW, PERMISSION, REMOTE_ADDRESS, SELF_URL, STMT, USER_ACTION,
    USER_ID, USER_LEVEL,
};
use crate::scaffold::approval::{
    pending_dispatch, transition, Action, ApprovalPolicy, ApvLink, RecordState, SideEffect,
    FLAG_ONLY_ID,
};
use crate::scaffold::ast::{Expr, Node, Stmt, QUERY};
use crate::scaffold::context::GenerationContext;
use crate::scaffold::field_type::{ElementType, FieldSet, SanitizeFilter};
use crate::scaffold::query::{
    QueryBuilder, ACTIVE_COLUMN, DRAFT_COLUMN, SORT_ORDER_COLUMN, WAITING_FOR_COLUMN,
};

/// Run-time variable holding the linked shadow row id
pub const APV_ID: &str = "apvId";

/// Run-time variable holding the stored pending kind
pub const WAITING_FOR: &str = "waitingFor";

/// Run-time variable holding the submitted note
pub const NOTE: &str = "apvNote";

/// Shadow row column storing the submitter's note
pub const NOTE_CREATE_COLUMN: &str = "note_create";

/// Shadow row column storing the reviewer's note
pub const NOTE_APPROVE_COLUMN: &str = "note_approve";

/// Marks where the database clock is spliced into generated SQL
const NOW_SQL: &str = "{now}";

const STATE: &str = "state";
const KEYS: &str = "keys";
const KEY: &str = "key";
const INDEX: &str = "i";
const OFFSET: &str = "offset";

/// Build the controller section
#[must_use]
pub fn build(ctx: &GenerationContext) -> Vec<Node> {
    let policy = ApprovalPolicy::from(ctx.options());

    let module = ctx.module_name();
    let mut nodes = vec![
        Node::code(Stmt::Expr(Expr::cms(
            "createUserLog",
            vec![
                Expr::Request,
                Expr::var(USER_ID),
                Expr::str(&module),
                text_param("user_action", false),
            ],
        ))),
        Node::assign(SELF_URL, Expr::SelfPage),
        Node::assign(MODULE, Expr::str(module)),
        Node::assign(NOW, Expr::method(Expr::var(QUERY), "now", Vec::new())),
        Node::assign(USER_ACTION, text_param("user_action", false)),
        Node::assign(
            PERMISSION,
            Expr::cms("getPermission", vec![Expr::var(USER_LEVEL), Expr::var(MODULE)]),
        ),
    ];

    let saving = Expr::non_empty(text_param("button_save", true));
    let mut branches = Vec::new();
    if ctx.options().manual_sort_order {
        branches.push((
            Expr::eq(
                text_param("special_action", true),
                Expr::str("save-order"),
            ),
            save_order(ctx),
        ));
    }
    branches.push((
        Expr::and(action_is("insert"), saving.clone()),
        create(ctx, policy),
    ));
    branches.push((Expr::and(action_is("update"), saving), update(ctx, policy)));
    for (param, action, capability) in [
        ("data_activate", Action::SetActive(true), "update"),
        ("data_deactivate", Action::SetActive(false), "update"),
        ("data_delete", Action::Delete, "delete"),
    ] {
        branches.push((
            Expr::non_empty(text_param(param, true)),
            bulk(ctx, policy, action, capability),
        ));
    }
    if policy.with_approval {
        for (param, action) in [("data_approve", Action::Approve), ("data_reject", Action::Reject)] {
            branches.push((
                Expr::non_empty(text_param(param, true)),
                review(ctx, policy, action),
            ));
        }
    }

    nodes.extend(chain(branches));
    nodes
}

/// Capability check, then `body` and a redirect to `success` under a
/// handler that logs the failure and returns to the page
fn mutation(ctx: &GenerationContext, capability: &str, body: Vec<Node>, success: Expr) -> Vec<Node> {
    let mut guarded = body;
    guarded.push(Node::code(Stmt::Redirect(success)));
    vec![
        require(ctx, capability),
        Node::code(Stmt::Try {
            body: guarded,
            on_error: vec![
                Node::code(Stmt::LogError(Expr::concat(vec![
                    Expr::str(format!("{}: ", ctx.entity())),
                    Expr::CaughtError,
                ]))),
                Node::code(Stmt::Redirect(Expr::var(SELF_URL))),
            ],
        }),
    ]
}

fn create(ctx: &GenerationContext, policy: ApprovalPolicy) -> Vec<Node> {
    let mut body = read_inputs(ctx, FieldSet::Insert);
    body.extend(read_note(policy));
    body.extend(compile_effects(
        ctx,
        &transition(policy, RecordState::NONE, Action::Create).effects,
    ));
    mutation(ctx, "insert", body, record_url(ctx, "detail", Expr::var(ID)))
}

fn update(ctx: &GenerationContext, policy: ApprovalPolicy) -> Vec<Node> {
    let mut body = vec![Node::assign(ID, key_input(ctx, false))];
    body.extend(read_inputs(ctx, FieldSet::Update));
    body.extend(read_note(policy));
    let effects = compile_effects(
        ctx,
        &transition(policy, RecordState::NONE, Action::Update).effects,
    );
    if policy.with_approval {
        // queue only records at rest
        body.extend(read_state(ctx));
        body.push(Node::when_runtime(
            Expr::eq(Expr::var(APV_ID), Expr::int(0)),
            effects,
        ));
    } else {
        body.extend(effects);
    }
    mutation(ctx, "update", body, record_url(ctx, "detail", Expr::var(ID)))
}

fn bulk(ctx: &GenerationContext, policy: ApprovalPolicy, action: Action, capability: &str) -> Vec<Node> {
    let mut each = vec![Node::assign(ID, key_from(ctx, Expr::var(KEY)))];
    each.extend(compile_effects(
        ctx,
        &transition(policy, RecordState::NONE, action).effects,
    ));
    let body = vec![
        Node::assign(
            KEYS,
            Expr::cms("getRequestArray", vec![Expr::Request, Expr::str(ctx.pk())]),
        ),
        Node::code(Stmt::ForEach {
            list: Expr::var(KEYS),
            index: INDEX.to_string(),
            item: KEY.to_string(),
            body: each,
        }),
    ];
    mutation(ctx, capability, body, Expr::var(SELF_URL))
}

fn review(ctx: &GenerationContext, policy: ApprovalPolicy, action: Action) -> Vec<Node> {
    let mut body = vec![Node::assign(ID, key_input(ctx, true))];
    body.extend(read_note(policy));
    body.extend(read_state(ctx));

    let dispatch = pending_dispatch(policy, action)
        .into_iter()
        .map(|(kind, step)| {
            (
                Expr::eq(Expr::var(WAITING_FOR), Expr::int(kind.code())),
                compile_effects(ctx, &step.effects),
            )
        })
        .collect();
    body.push(Node::when_runtime(
        Expr::ne(Expr::var(APV_ID), Expr::int(0)),
        chain(dispatch).into_iter().collect(),
    ));

    let success = Expr::concat(vec![
        Expr::var(SELF_URL),
        Expr::str("?show-only=need-approval"),
    ]);
    mutation(ctx, "approve", body, success)
}

fn save_order(ctx: &GenerationContext) -> Vec<Node> {
    let qb = QueryBuilder::new(ctx);
    let position = Expr::add(
        Expr::add(Expr::var(OFFSET), Expr::var(INDEX)),
        Expr::int(1),
    );
    let body = vec![
        Node::assign(KEYS, Expr::split(text_param("sort_data", true), ",")),
        Node::assign(
            OFFSET,
            Expr::to_int(Expr::post(OFFSET, Some(SanitizeFilter::NumberInt))),
        ),
        Node::code(Stmt::ForEach {
            list: Expr::var(KEYS),
            index: INDEX.to_string(),
            item: KEY.to_string(),
            body: vec![
                Node::assign(ID, key_from(ctx, Expr::var(KEY))),
                execute(
                    qb.update_sql(
                        ctx.table(),
                        &[SORT_ORDER_COLUMN.to_string()],
                        &qb.key_condition(),
                    ),
                    vec![position.clone(), Expr::var(ID)],
                ),
            ],
        }),
    ];
    mutation(ctx, "update", body, Expr::var(SELF_URL))
}

/// Sanitized reads of the submitted business values of a field set
fn read_inputs(ctx: &GenerationContext, set: FieldSet) -> Vec<Node> {
    business_fields(ctx, set)
        .into_iter()
        .map(|field| {
            let value = Expr::post(&field.name, Some(field.sanitize_filter()));
            let value = if field.element_type == ElementType::Checkbox {
                Expr::to_int(value)
            } else {
                value
            };
            Node::assign(input_var(field), value)
        })
        .collect()
}

/// Submitted note, read only when notes are on
fn read_note(policy: ApprovalPolicy) -> Option<Node> {
    (policy.with_approval && policy.with_note)
        .then(|| Node::assign(NOTE, text_param("apv_note", true)))
}

/// Load the stored approval link and pending kind of the current record
fn read_state(ctx: &GenerationContext) -> Vec<Node> {
    let apv = ctx.approval_column();
    let columns = format!(
        "coalesce({0}, 0) as {0}, coalesce({1}, 0) as {1}",
        ctx.ident(&apv),
        ctx.ident(WAITING_FOR_COLUMN)
    );
    vec![
        Node::assign(
            STATE,
            Expr::cms(
                "getValues",
                vec![
                    Expr::str(ctx.table()),
                    Expr::str(ctx.pk()),
                    Expr::var(ID),
                    Expr::str(columns),
                ],
            ),
        ),
        Node::assign(APV_ID, Expr::int(0)),
        Node::assign(WAITING_FOR, Expr::int(0)),
        Node::when_runtime(
            Expr::ne(Expr::var(STATE), Expr::Null),
            vec![
                Node::assign(APV_ID, Expr::to_int(Expr::index(Expr::var(STATE), apv))),
                Node::assign(
                    WAITING_FOR,
                    Expr::to_int(Expr::index(Expr::var(STATE), WAITING_FOR_COLUMN)),
                ),
            ],
        ),
    ]
}

/// Bound write; `{now}` in `sql` becomes the page's database clock
fn execute(sql: String, params: Vec<Expr>) -> Node {
    Node::code(Stmt::execute(STMT, splice_now(&sql), Expr::Array(params)))
}

fn splice_now(sql: &str) -> Expr {
    let mut parts = Vec::new();
    for (n, piece) in sql.split(NOW_SQL).enumerate() {
        if n > 0 {
            parts.push(Expr::var(NOW));
        }
        if !piece.is_empty() {
            parts.push(Expr::str(piece));
        }
    }
    match parts.len() {
        1 => parts.remove(0),
        _ => Expr::concat(parts),
    }
}

/// Host library call run for its effect
fn host(function: &str, args: Vec<Expr>) -> Node {
    Node::code(Stmt::Expr(Expr::cms(function, args)))
}

fn last_insert_id() -> Expr {
    Expr::cms("getLastID", Vec::new())
}

fn link_value(link: ApvLink) -> Expr {
    match link {
        ApvLink::None => Expr::int(0),
        ApvLink::FlagOnly => Expr::int(FLAG_ONLY_ID),
        ApvLink::Shadow => Expr::var(APV_ID),
    }
}

/// Columns bound to placeholders, with their parameters
#[derive(Default)]
struct Assignments {
    values: Vec<(String, String)>,
    params: Vec<Expr>,
}

impl Assignments {
    fn bind(&mut self, column: impl Into<String>, param: Expr) {
        self.values.push((column.into(), "?".to_string()));
        self.params.push(param);
    }

    /// Who, when and from where, under `<column>_<suffix>`
    fn audit(&mut self, suffix: &str) {
        self.bind(format!("admin_{suffix}"), Expr::var(USER_ID));
        self.values.push((format!("time_{suffix}"), NOW_SQL.to_string()));
        self.bind(format!("ip_{suffix}"), Expr::var(REMOTE_ADDRESS));
    }
}

/// Compile side effects into statements
///
/// Statements read the record key from `id` and the shadow row id from
/// `apvId`, and set both when they create the row.
#[must_use]
pub fn compile_effects(ctx: &GenerationContext, effects: &[SideEffect]) -> Vec<Node> {
    effects
        .iter()
        .flat_map(|effect| compile_effect(ctx, *effect))
        .collect()
}

fn compile_effect(ctx: &GenerationContext, effect: SideEffect) -> Vec<Node> {
    let qb = QueryBuilder::new(ctx);
    let apv = ctx.approval_column();
    let shadow = ctx.shadow_table();
    let by_key = qb.key_condition();
    let by_shadow = format!("{} = ?", ctx.ident(&apv));
    let id = || Expr::var(ID);

    match effect {
        SideEffect::InsertShadow { columns, kind } => {
            let mut row = Assignments::default();
            for field in business_fields(ctx, columns) {
                row.bind(&field.name, Expr::var(input_var(field)));
            }
            if columns == FieldSet::Update {
                row.bind(ctx.pk(), id());
            }
            row.audit("create");
            row.bind("status_data", Expr::int(kind.code()));
            if ctx.options().with_note {
                row.bind(NOTE_CREATE_COLUMN, Expr::var(NOTE));
            }
            vec![
                execute(qb.insert_values_sql(&shadow, &row.values), row.params),
                Node::assign(APV_ID, last_insert_id()),
            ]
        }
        SideEffect::InsertMain {
            columns,
            draft,
            waiting_for,
            link,
        } => {
            let fields = business_fields(ctx, columns);
            let mut names: Vec<String> = fields.iter().map(|field| field.name.clone()).collect();
            let mut params: Vec<Expr> =
                fields.iter().map(|field| Expr::var(input_var(field))).collect();
            if link != ApvLink::None {
                names.extend([
                    DRAFT_COLUMN.to_string(),
                    apv,
                    WAITING_FOR_COLUMN.to_string(),
                ]);
                params.extend([
                    Expr::int(i64::from(draft)),
                    link_value(link),
                    Expr::int(waiting_for.code()),
                ]);
            }
            let key = fields
                .iter()
                .find(|field| field.name == ctx.pk())
                .map_or_else(last_insert_id, |field| Expr::var(input_var(field)));
            vec![
                execute(qb.insert_sql(ctx.table(), &names), params),
                Node::assign(ID, key),
            ]
        }
        SideEffect::BindShadowKey => vec![execute(
            qb.update_sql(&shadow, &[ctx.pk().to_string()], &by_shadow),
            vec![id(), Expr::var(APV_ID)],
        )],
        SideEffect::UpdateMain { columns } => {
            let fields = business_fields(ctx, columns);
            if fields.is_empty() {
                return Vec::new();
            }
            let names: Vec<String> = fields.iter().map(|field| field.name.clone()).collect();
            let mut params: Vec<Expr> =
                fields.iter().map(|field| Expr::var(input_var(field))).collect();
            params.push(id());
            vec![execute(qb.update_sql(ctx.table(), &names, &by_key), params)]
        }
        SideEffect::MarkPending { waiting_for, link } => {
            let guarded = format!("{by_key} and {} = 0", ctx.ident(&apv));
            vec![execute(
                qb.update_sql(
                    ctx.table(),
                    &[apv, WAITING_FOR_COLUMN.to_string()],
                    &guarded,
                ),
                vec![link_value(link), Expr::int(waiting_for.code()), id()],
            )]
        }
        SideEffect::CopyFromShadow { columns } => {
            let fields = business_fields(ctx, columns);
            if fields.is_empty() {
                return Vec::new();
            }
            let names: Vec<String> = fields.iter().map(|field| ctx.ident(&field.name)).collect();
            vec![host(
                "copyData",
                vec![
                    Expr::str(&shadow),
                    Expr::str(ctx.table()),
                    Expr::str(names.join(", ")),
                    Expr::str(&apv),
                    Expr::var(APV_ID),
                    Expr::str(ctx.pk()),
                    id(),
                ],
            )]
        }
        SideEffect::SetActive(active) => vec![host(
            "setRecordValue",
            vec![
                Expr::str(ctx.table()),
                Expr::str(ctx.pk()),
                id(),
                Expr::str(ACTIVE_COLUMN),
                Expr::str(if active { "1" } else { "0" }),
            ],
        )],
        SideEffect::ClearPending { draft } => {
            let mut assignments = vec![
                format!("{} = 0", ctx.ident(&apv)),
                format!("{} = 0", ctx.ident(WAITING_FOR_COLUMN)),
            ];
            if draft {
                assignments.push(format!("{} = 0", ctx.ident(DRAFT_COLUMN)));
            }
            vec![execute(
                qb.update_literal_sql(ctx.table(), &assignments, &by_key),
                vec![id()],
            )]
        }
        SideEffect::StampShadow(verdict) => {
            let mut row = Assignments::default();
            row.bind("status_approve", Expr::int(verdict.code()));
            row.audit("approve");
            if ctx.options().with_note {
                row.bind(NOTE_APPROVE_COLUMN, Expr::var(NOTE));
            }
            row.params.push(Expr::var(APV_ID));
            vec![execute(
                qb.update_values_sql(&shadow, &row.values, &by_shadow),
                row.params,
            )]
        }
        SideEffect::DeleteMain => vec![host(
            "deleteRecord",
            vec![Expr::str(ctx.table()), Expr::str(ctx.pk()), id()],
        )],
        SideEffect::ArchiveToTrash => vec![host(
            "updateTrashInfo",
            vec![
                Expr::str(ctx.trash_table()),
                Expr::str(ctx.pk()),
                id(),
                Expr::str(ctx.trash_key_column()),
                Expr::var(USER_ID),
                Expr::var(REMOTE_ADDRESS),
            ],
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::approval::{Verdict, WaitingFor};
    use crate::scaffold::ast::Renderer;
    use crate::scaffold::field_type::{DataType, FieldDescriptor};
    use crate::scaffold::options::GenerationOptions;
    use crate::scaffold::target::{Jsp, Php};

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("article_id", DataType::Int)
                .primary_key()
                .detail()
                .list(),
            FieldDescriptor::new("title", DataType::Text)
                .required()
                .everywhere(),
            FieldDescriptor::new("featured", DataType::Int)
                .element(ElementType::Checkbox)
                .insert()
                .update(),
        ]
    }

    fn php(options: GenerationOptions) -> String {
        let ctx = GenerationContext::new("article", &fields(), options);
        Renderer::new(&Php, &ctx).render(&build(&ctx))
    }

    fn effect_php(options: GenerationOptions, effect: SideEffect) -> String {
        let ctx = GenerationContext::new("article", &fields(), options);
        Renderer::new(&Php, &ctx).render(&compile_effects(&ctx, &[effect]))
    }

    #[test]
    fn test_request_is_logged_before_anything_else() {
        let out = php(GenerationOptions::default());
        assert!(out.starts_with(
            "<?php\n$cms->createUserLog($_POST, $_userID, 'article', filterInput(INPUT_GET, 'user_action', FILTER_SANITIZE_SPECIAL_CHARS, true));\n$selfUrl = 'article.php';\n$moduleName = 'article';\n$now = $query1->now();\n"
        ));
        assert!(out.contains("$permission = $cms->getPermission($_userLevel, $moduleName);\n"));
    }

    #[test]
    fn test_module_name_follows_table() {
        let ctx = GenerationContext::new("article", &fields(), GenerationOptions::default())
            .with_table("news_item");
        let out = Renderer::new(&Php, &ctx).render(&build(&ctx));
        assert!(out.contains("$cms->createUserLog($_POST, $_userID, 'news-item', "));
        assert!(out.contains("$selfUrl = 'news-item.php';"));
    }

    #[test]
    fn test_direct_controller() {
        let out = php(GenerationOptions::default());
        assert!(out.contains("if (($userAction == 'insert') && (filterInput(INPUT_POST, 'button_save', FILTER_SANITIZE_SPECIAL_CHARS, true) != '')) {"));
        assert!(out.contains("$input_featured = intval(filterInput(INPUT_POST, 'featured', FILTER_SANITIZE_NUMBER_INT, true));"));
        assert!(out.contains("'insert into article (title, featured) values (?, ?)'"));
        assert!(out.contains("$id = $cms->getLastID();"));
        assert!(out.contains("'update article set title = ?, featured = ? where article_id = ?'"));
        assert!(out.contains("$keys = $cms->getRequestArray($_POST, 'article_id');"));
        assert!(out.contains("$cms->setRecordValue('article', 'article_id', $id, 'active', '1');"));
        assert!(out.contains("$cms->setRecordValue('article', 'article_id', $id, 'active', '0');"));
        assert!(out.contains("$cms->deleteRecord('article', 'article_id', $id);"));
        assert!(!out.contains("updateTrashInfo"));
        assert!(!out.contains("data_approve"));
        assert!(!out.contains("article_apv"));
        assert!(!out.contains("apv_note"));
        assert!(out.ends_with("}\n?>\n"));
    }

    #[test]
    fn test_capability_checks() {
        let out = php(GenerationOptions::default().with_approval());
        for capability in ["insert", "update", "delete", "approve"] {
            assert!(
                out.contains(&format!("if (!(stripos($permission, '{capability}') !== false)) {{")),
                "{capability}"
            );
        }
        assert!(out.contains("exit();"));
    }

    #[test]
    fn test_failures_are_logged_and_redirected() {
        let out = php(GenerationOptions::default());
        assert!(out.contains("} catch (Exception $e) {\n\t\terror_log('article: ' . $e->getMessage());\n\t\theader('Location: ' . $selfUrl);"));
    }

    #[test]
    fn test_moderated_create() {
        let out = php(GenerationOptions::default().with_approval());
        assert!(out.contains("'insert into article_apv (title, featured, admin_create, time_create, ip_create, status_data) values (?, ?, ?, ' . $now . ', ?, ?)'"));
        assert!(out.contains("$stmt->execute(array($input_title, $input_featured, $_userID, $_remoteAddress, 1));"));
        assert!(out.contains("'insert into article (title, featured, draft, article_apv_id, waiting_for) values (?, ?, ?, ?, ?)'"));
        assert!(out.contains("$stmt->execute(array($input_title, $input_featured, 1, $apvId, 1));"));
        assert!(out.contains("'update article_apv set article_id = ? where article_apv_id = ?'"));
    }

    #[test]
    fn test_moderated_update_requires_rest() {
        let out = php(GenerationOptions::default().with_approval());
        assert!(out.contains("$state = $cms->getValues('article', 'article_id', $id, 'coalesce(article_apv_id, 0) as article_apv_id, coalesce(waiting_for, 0) as waiting_for');"));
        assert!(out.contains("if ($state != null) {"));
        assert!(out.contains("if ($apvId == 0) {"));
        assert!(out.contains("'insert into article_apv (title, featured, article_id, admin_create, time_create, ip_create, status_data) values (?, ?, ?, ?, ' . $now . ', ?, ?)'"));
    }

    #[test]
    fn test_submitter_note_goes_to_shadow() {
        let out = php(GenerationOptions::default().with_approval().with_note());
        assert!(out.contains("$apvNote = filterInput(INPUT_POST, 'apv_note', FILTER_SANITIZE_SPECIAL_CHARS, true);"));
        assert!(out.contains("'insert into article_apv (title, featured, admin_create, time_create, ip_create, status_data, note_create) values (?, ?, ?, ' . $now . ', ?, ?, ?)'"));
        assert!(out.contains("$stmt->execute(array($input_title, $input_featured, $_userID, $_remoteAddress, 1, $apvNote));"));

        let plain = php(GenerationOptions::default().with_note());
        assert!(!plain.contains("apvNote"));
    }

    #[test]
    fn test_flags_always_guarded() {
        for kind in [WaitingFor::Activate, WaitingFor::Deactivate, WaitingFor::Delete] {
            let out = effect_php(
                GenerationOptions::default().with_approval(),
                SideEffect::MarkPending {
                    waiting_for: kind,
                    link: ApvLink::FlagOnly,
                },
            );
            assert!(out.contains(
                "'update article set article_apv_id = ?, waiting_for = ? where article_id = ? and article_apv_id = 0'"
            ));
            assert!(out.contains(&format!("array(-1, {}, $id)", kind.code())));
        }
    }

    #[test]
    fn test_review_dispatches_on_waiting_for() {
        let out = php(GenerationOptions::default().with_approval());
        assert!(out.contains("if ($apvId != 0) {"));
        for code in 1..=5 {
            assert!(out.contains(&format!("$waitingFor == {code}")), "{code}");
        }
        assert!(out.contains("header('Location: ' . $selfUrl . '?show-only=need-approval');"));
    }

    #[test]
    fn test_copy_from_shadow() {
        let out = effect_php(
            GenerationOptions::default().with_approval(),
            SideEffect::CopyFromShadow {
                columns: FieldSet::Update,
            },
        );
        assert!(out.contains("$cms->copyData('article_apv', 'article', 'title, featured', 'article_apv_id', $apvId, 'article_id', $id);"));
    }

    #[test]
    fn test_stamp_with_note() {
        let out = effect_php(
            GenerationOptions::default().with_approval().with_note(),
            SideEffect::StampShadow(Verdict::Rejected),
        );
        assert!(out.contains("'update article_apv set status_approve = ?, admin_approve = ?, time_approve = ' . $now . ', ip_approve = ?, note_approve = ? where article_apv_id = ?'"));
        assert!(out.contains("array(-1, $_userID, $_remoteAddress, $apvNote, $apvId)"));
    }

    #[test]
    fn test_trash_is_stamped_after_delete() {
        let out = php(GenerationOptions::default().with_trash());
        let delete = out
            .find("$cms->deleteRecord('article', 'article_id', $id);")
            .unwrap();
        let stamp = out
            .find("$cms->updateTrashInfo('article_trash', 'article_id', $id, 'article_trash_id', $_userID, $_remoteAddress);")
            .unwrap();
        assert!(delete < stamp);
        assert!(!out.contains("insert into article_trash"));
    }

    #[test]
    fn test_save_order_only_with_manual_sort() {
        assert!(!php(GenerationOptions::default()).contains("save-order"));
        let out = php(GenerationOptions::default().manual_sort());
        assert!(out.contains("'update article set sort_order = ? where article_id = ?'"));
        assert!(out.contains("array(($offset + $i) + 1, $id)"));
        assert!(out.contains("$keys = explode(',', filterInput(INPUT_POST, 'sort_data', FILTER_SANITIZE_SPECIAL_CHARS, true));"));
    }

    #[test]
    fn test_jsp_controller() {
        let ctx = GenerationContext::new("article", &fields(), GenerationOptions::default());
        let out = Renderer::new(&Jsp, &ctx).render(&build(&ctx));
        assert!(out.starts_with("<%\ncreateUserLog(request, _userID, \"article\", filterInput(request, \"user_action\", \"FILTER_SANITIZE_SPECIAL_CHARS\", true));\nString selfUrl = \"article.jsp\";\n"));
        assert!(out.contains("String permission = getPermission(_userLevel, moduleName);"));
        assert!(out.contains("database1.execute(\"insert into article (title, featured) values (?, ?)\", new java.util.ArrayList<Object>(java.util.Arrays.asList(input_title, input_featured)));"));
        assert!(out.contains("long id = database1.getLastID();"));
        assert!(out.contains("String[] keys = getRequestArray(request, \"article_id\");"));
        assert!(out.contains("for (int i = 0; i < keys.length; i++) {"));
        assert!(out.contains("cms.deleteRecord(\"article\", \"article_id\", id);"));
        assert!(out.contains("response.sendRedirect(selfUrl);"));
        assert!(out.ends_with("}\n%>\n"));
    }

    #[test]
    fn test_jsp_review_reads_state_once() {
        let ctx = GenerationContext::new(
            "article",
            &fields(),
            GenerationOptions::default().with_approval(),
        );
        let out = Renderer::new(&Jsp, &ctx).render(&build(&ctx));
        assert!(out.contains("java.sql.ResultSet state = cms.getValues(\"article\", \"article_id\", id, "));
        assert!(out.contains("long apvId = 0;"));
        assert!(out.contains("if (state != null) {"));
        assert!(out.contains("String.valueOf(waitingFor).equals(String.valueOf(1))"));
        assert!(out.contains("cms.copyData(\"article_apv\", \"article\", \"title, featured\", \"article_apv_id\", apvId, \"article_id\", id);"));
    }
}
