//! Section AST and renderer
//!
//! Section emitters never write target syntax. They build a tree of
//! [`Node`]s: markup literals, inline echoes, statements, loops over a
//! [`FieldSet`], and generation-time [`Condition`]s on the options. The
//! [`Renderer`] interprets that tree once per [`EmissionTarget`], switching
//! between markup and code mode as needed.
//!
//! ```
//! use crudsmith::scaffold::ast::{Expr, Node, Renderer, Stmt};
//! use crudsmith::scaffold::{GenerationContext, GenerationOptions, Jsp, Php};
//!
//! let ctx = GenerationContext::new("article", &[], GenerationOptions::default());
//! let nodes = vec![
//!     Node::code(Stmt::assign("greeting", Expr::str("hello"))),
//!     Node::markup("<p>"),
//!     Node::echo(Expr::escape(Expr::var("greeting"))),
//!     Node::markup("</p>\n"),
//! ];
//!
//! let php = Renderer::new(&Php, &ctx).render(&nodes);
//! assert!(php.contains("$greeting = 'hello';"));
//! assert!(php.contains("<p><?php echo $cms->escapeHTML($greeting); ?></p>"));
//!
//! let jsp = Renderer::new(&Jsp, &ctx).render(&nodes);
//! assert!(jsp.contains("String greeting = \"hello\";"));
//! assert!(jsp.contains("<p><%= escapeHTML(String.valueOf(greeting)) %></p>"));
//! ```

use std::collections::HashMap;

use super::context::GenerationContext;
use super::field_type::{FieldDescriptor, FieldSet, SanitizeFilter};
use super::helpers::TemplateHelpers;
use super::options::GenerationOptions;
use super::target::{EmissionTarget, IncludeForm, InputSource, ValueKind};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Loose equality
    Eq,
    /// Loose inequality
    Ne,
    /// Less than
    Lt,
    /// Greater than
    Gt,
    /// Logical and
    And,
    /// Logical or
    Or,
    /// Numeric addition
    Add,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::And => "&&",
            Self::Or => "||",
            Self::Add => "+",
        }
    }
}

/// Target-independent expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Null literal
    Null,
    /// Variable reference
    Var(String),
    /// Verbatim text, identical in every target
    Raw(String),
    /// String concatenation
    Concat(Vec<Expr>),
    /// Call into the host framework library
    Host {
        /// Library function name
        function: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// The submitted request, as handed to the host library
    Request,
    /// File name of the page being generated
    SelfPage,
    /// Next row of an executed statement, null when exhausted
    Fetch(String),
    /// Method call on an object
    Method {
        /// Receiver
        object: Box<Expr>,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Sanitized request parameter
    Input {
        /// Query string or form body
        source: InputSource,
        /// Parameter name
        name: String,
        /// Sanitize filter, none for a raw read
        filter: Option<SanitizeFilter>,
    },
    /// HTML-escaped value
    Escape(Box<Expr>),
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Logical negation
    Not(Box<Expr>),
    /// Case-insensitive substring test
    Contains {
        /// Searched text
        haystack: Box<Expr>,
        /// Searched-for text
        needle: Box<Expr>,
    },
    /// Keyed element of a row or array
    Index {
        /// Row or array
        base: Box<Expr>,
        /// Key
        key: String,
    },
    /// Array literal
    Array(Vec<Expr>),
    /// Split a string into a list
    Split {
        /// Joined text
        value: Box<Expr>,
        /// Separator
        separator: String,
    },
    /// Integer conversion
    ToInt(Box<Expr>),
    /// Number of list elements
    Length(Box<Expr>),
    /// Message of the error caught by the enclosing handler
    CaughtError,
    /// Conditional expression
    Ternary {
        /// Condition
        cond: Box<Expr>,
        /// Value when it holds
        then: Box<Expr>,
        /// Value otherwise
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// String literal
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Integer literal
    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Variable reference
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// Verbatim text
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    /// Concatenation of parts
    #[must_use]
    pub fn concat(parts: Vec<Self>) -> Self {
        Self::Concat(parts)
    }

    /// Method call
    pub fn method(object: Self, method: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Method {
            object: Box::new(object),
            method: method.into(),
            args,
        }
    }

    /// Call into the host framework library
    pub fn cms(function: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Host {
            function: function.into(),
            args,
        }
    }

    /// Next row of the statement held in `stmt`
    pub fn fetch(stmt: impl Into<String>) -> Self {
        Self::Fetch(stmt.into())
    }

    /// Query string parameter
    pub fn get(name: impl Into<String>, filter: Option<SanitizeFilter>) -> Self {
        Self::Input {
            source: InputSource::Get,
            name: name.into(),
            filter,
        }
    }

    /// Form body parameter
    pub fn post(name: impl Into<String>, filter: Option<SanitizeFilter>) -> Self {
        Self::Input {
            source: InputSource::Post,
            name: name.into(),
            filter,
        }
    }

    /// HTML-escaped value
    #[must_use]
    pub fn escape(value: Self) -> Self {
        Self::Escape(Box::new(value))
    }

    /// Binary operation
    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left == right`
    #[must_use]
    pub fn eq(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    /// `left != right`
    #[must_use]
    pub fn ne(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Ne, left, right)
    }

    /// `left > right`
    #[must_use]
    pub fn gt(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Gt, left, right)
    }

    /// `left < right`
    #[must_use]
    pub fn lt(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Lt, left, right)
    }

    /// `left && right`
    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    /// `left || right`
    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    /// `left + right`
    #[must_use]
    pub fn add(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    /// Logical negation
    #[must_use]
    pub fn not(value: Self) -> Self {
        Self::Not(Box::new(value))
    }

    /// Case-insensitive substring test
    #[must_use]
    pub fn contains(haystack: Self, needle: Self) -> Self {
        Self::Contains {
            haystack: Box::new(haystack),
            needle: Box::new(needle),
        }
    }

    /// Keyed element
    pub fn index(base: Self, key: impl Into<String>) -> Self {
        Self::Index {
            base: Box::new(base),
            key: key.into(),
        }
    }

    /// Column of the current `row`
    pub fn row(column: impl Into<String>) -> Self {
        Self::index(Self::var("row"), column)
    }

    /// Split on a separator
    pub fn split(value: Self, separator: impl Into<String>) -> Self {
        Self::Split {
            value: Box::new(value),
            separator: separator.into(),
        }
    }

    /// Integer conversion
    #[must_use]
    pub fn to_int(value: Self) -> Self {
        Self::ToInt(Box::new(value))
    }

    /// Number of list elements
    #[must_use]
    pub fn length(list: Self) -> Self {
        Self::Length(Box::new(list))
    }

    /// `cond ? then : otherwise`
    #[must_use]
    pub fn ternary(cond: Self, then: Self, otherwise: Self) -> Self {
        Self::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// `value != ''`
    #[must_use]
    pub fn non_empty(value: Self) -> Self {
        Self::ne(value, Self::str(""))
    }

    const fn needs_parens(&self) -> bool {
        matches!(
            self,
            Self::Binary { .. } | Self::Not(_) | Self::Contains { .. } | Self::Concat(_)
        )
    }
}

/// Name of the runtime object providing database helpers
pub const QUERY: &str = "query1";

/// Target-independent statement
#[derive(Debug)]
pub enum Stmt {
    /// `var = value`
    Assign {
        /// Variable name
        var: String,
        /// Value
        value: Expr,
    },
    /// Append to a string variable
    Append {
        /// Variable name
        var: String,
        /// Appended value
        value: Expr,
    },
    /// Append to a list variable
    Push {
        /// List variable name
        list: String,
        /// Element
        value: Expr,
    },
    /// Expression statement
    Expr(Expr),
    /// Write to the response
    Echo(Expr),
    /// Run-time conditional
    If {
        /// Condition
        cond: Expr,
        /// Taken branch
        then: Vec<Node>,
        /// Other branch
        otherwise: Vec<Node>,
    },
    /// Loop over a list
    ForEach {
        /// List
        list: Expr,
        /// Index variable
        index: String,
        /// Element variable
        item: String,
        /// Loop body
        body: Vec<Node>,
    },
    /// Loop over the rows of an executed statement
    FetchLoop {
        /// Statement variable
        stmt: String,
        /// Row variable
        row: String,
        /// Loop body
        body: Vec<Node>,
    },
    /// Catch every failure of `body`
    Try {
        /// Guarded body
        body: Vec<Node>,
        /// Handler
        on_error: Vec<Node>,
    },
    /// Prepare and execute a parameterized query
    Query {
        /// Statement variable
        stmt: String,
        /// SQL text
        sql: Expr,
        /// Bound parameters
        params: Expr,
        /// Whether the query returns rows
        reads: bool,
    },
    /// Redirect and stop
    Redirect(Expr),
    /// Line comment
    Comment(String),
    /// Write to the server error log
    LogError(Expr),
    /// Stop processing
    Exit,
}

impl Stmt {
    /// `var = value`
    pub fn assign(var: impl Into<String>, value: Expr) -> Self {
        Self::Assign {
            var: var.into(),
            value,
        }
    }

    /// Append to a string variable
    pub fn append(var: impl Into<String>, value: Expr) -> Self {
        Self::Append {
            var: var.into(),
            value,
        }
    }

    /// Append to a list variable
    pub fn push(list: impl Into<String>, value: Expr) -> Self {
        Self::Push {
            list: list.into(),
            value,
        }
    }

    /// Prepare and execute a write through `stmt`
    pub fn execute(stmt: impl Into<String>, sql: Expr, params: Expr) -> Self {
        Self::Query {
            stmt: stmt.into(),
            sql,
            params,
            reads: false,
        }
    }

    /// Prepare and execute a row-returning query into `stmt`
    pub fn select(stmt: impl Into<String>, sql: Expr, params: Expr) -> Self {
        Self::Query {
            stmt: stmt.into(),
            sql,
            params,
            reads: true,
        }
    }
}

/// Generation-time condition on the options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Approval workflow on
    Approval,
    /// Trash archiving on
    Trash,
    /// Approval notes on
    Note,
    /// Manual sort order on
    ManualSort,
    /// Negation
    Not(Box<Condition>),
    /// Conjunction
    All(Vec<Condition>),
}

impl Condition {
    /// Evaluate against the options
    #[must_use]
    pub fn holds(&self, options: &GenerationOptions) -> bool {
        match self {
            Self::Approval => options.with_approval,
            Self::Trash => options.with_trash,
            Self::Note => options.with_note,
            Self::ManualSort => options.manual_sort_order,
            Self::Not(inner) => !inner.holds(options),
            Self::All(all) => all.iter().all(|condition| condition.holds(options)),
        }
    }

    /// Negation
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Body of a [`Node::FieldLoop`], expanded once per descriptor
pub type FieldBody = Box<dyn Fn(&FieldDescriptor, &GenerationContext) -> Vec<Node> + Send + Sync>;

/// Section AST node
pub enum Node {
    /// Markup copied verbatim
    Markup(String),
    /// Expression echoed from markup
    Echo(Expr),
    /// Framework include, path without extension
    Include(String),
    /// Statement
    Code(Stmt),
    /// Repeat a body for every descriptor of a field set
    FieldLoop {
        /// Field set
        set: FieldSet,
        /// Body factory
        body: FieldBody,
    },
    /// Choose a branch from the options
    Conditional {
        /// Condition
        when: Condition,
        /// Branch when it holds
        then: Vec<Node>,
        /// Branch otherwise
        otherwise: Vec<Node>,
    },
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markup(text) => f.debug_tuple("Markup").field(text).finish(),
            Self::Echo(expr) => f.debug_tuple("Echo").field(expr).finish(),
            Self::Include(path) => f.debug_tuple("Include").field(path).finish(),
            Self::Code(stmt) => f.debug_tuple("Code").field(stmt).finish(),
            Self::FieldLoop { set, .. } => f.debug_struct("FieldLoop").field("set", set).finish(),
            Self::Conditional {
                when,
                then,
                otherwise,
            } => f
                .debug_struct("Conditional")
                .field("when", when)
                .field("then", then)
                .field("otherwise", otherwise)
                .finish(),
        }
    }
}

impl Node {
    /// Markup literal
    pub fn markup(text: impl Into<String>) -> Self {
        Self::Markup(text.into())
    }

    /// Inline echo
    #[must_use]
    pub const fn echo(expr: Expr) -> Self {
        Self::Echo(expr)
    }

    /// Statement
    #[must_use]
    pub const fn code(stmt: Stmt) -> Self {
        Self::Code(stmt)
    }

    /// `var = value`
    pub fn assign(var: impl Into<String>, value: Expr) -> Self {
        Self::Code(Stmt::assign(var, value))
    }

    /// Line comment
    pub fn comment(text: impl Into<String>) -> Self {
        Self::Code(Stmt::Comment(text.into()))
    }

    /// Run-time `if`
    #[must_use]
    pub fn when_runtime(cond: Expr, then: Vec<Self>) -> Self {
        Self::Code(Stmt::If {
            cond,
            then,
            otherwise: Vec::new(),
        })
    }

    /// Run-time `if` / `else`
    #[must_use]
    pub fn if_else(cond: Expr, then: Vec<Self>, otherwise: Vec<Self>) -> Self {
        Self::Code(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    /// Generation-time branch without an alternative
    #[must_use]
    pub fn when(when: Condition, then: Vec<Self>) -> Self {
        Self::Conditional {
            when,
            then,
            otherwise: Vec::new(),
        }
    }

    /// Generation-time branch
    #[must_use]
    pub fn choose(when: Condition, then: Vec<Self>, otherwise: Vec<Self>) -> Self {
        Self::Conditional {
            when,
            then,
            otherwise,
        }
    }

    /// Loop over a field set
    pub fn field_loop<F>(set: FieldSet, body: F) -> Self
    where
        F: Fn(&FieldDescriptor, &GenerationContext) -> Vec<Self> + Send + Sync + 'static,
    {
        Self::FieldLoop {
            set,
            body: Box::new(body),
        }
    }
}

/// Interprets section ASTs for one target
///
/// Variables are tracked per block so that the first assignment in a scope
/// is rendered as a declaration.
pub struct Renderer<'a> {
    target: &'a dyn EmissionTarget,
    ctx: &'a GenerationContext,
    out: String,
    in_code: bool,
    depth: usize,
    scopes: Vec<HashMap<String, ValueKind>>,
}

impl<'a> Renderer<'a> {
    /// Create a renderer
    #[must_use]
    pub fn new(target: &'a dyn EmissionTarget, ctx: &'a GenerationContext) -> Self {
        Self {
            target,
            ctx,
            out: String::new(),
            in_code: false,
            depth: 0,
            scopes: vec![HashMap::new()],
        }
    }

    /// Render nodes; the output starts and ends in markup mode
    #[must_use]
    pub fn render(mut self, nodes: &[Node]) -> String {
        self.nodes(nodes);
        self.enter_markup();
        self.out
    }

    /// Render one expression
    #[must_use]
    pub fn expr(&self, expr: &Expr) -> String {
        let t = self.target;
        match expr {
            Expr::Str(value) => t.string_literal(value),
            Expr::Int(value) => value.to_string(),
            Expr::Null => t.null_literal().to_string(),
            Expr::Var(name) => t.variable(name),
            Expr::Raw(text) => text.clone(),
            Expr::Concat(parts) => match parts.as_slice() {
                [] => t.string_literal(""),
                parts => parts
                    .iter()
                    .map(|part| self.operand(part))
                    .collect::<Vec<_>>()
                    .join(&format!(" {} ", t.concat_operator())),
            },
            Expr::Host { function, args } => {
                let args: Vec<String> = args.iter().map(|arg| self.expr(arg)).collect();
                t.host_call(function, &args)
            }
            Expr::Request => t.request_body().to_string(),
            Expr::SelfPage => t.string_literal(&TemplateHelpers::page_file_name(
                &self.ctx.module_name(),
                t.extension(),
            )),
            Expr::Fetch(stmt) => t.fetch_row(&t.variable(stmt)),
            Expr::Method {
                object,
                method,
                args,
            } => format!(
                "{}{}{method}({})",
                self.operand(object),
                t.member_access(),
                self.args(args)
            ),
            Expr::Input {
                source,
                name,
                filter,
            } => t.sanitize_input(*source, name, *filter),
            Expr::Escape(value) => t.html_escape(&self.expr(value)),
            Expr::Binary {
                op: op @ (BinaryOp::Eq | BinaryOp::Ne),
                left,
                right,
            } => t.equality(
                &self.operand(left),
                &self.operand(right),
                *op == BinaryOp::Ne,
                matches!(**left, Expr::Null) || matches!(**right, Expr::Null),
            ),
            Expr::Binary { op, left, right } => format!(
                "{} {} {}",
                self.operand(left),
                op.symbol(),
                self.operand(right)
            ),
            Expr::Not(value) => format!("!{}", self.operand(value)),
            Expr::Contains { haystack, needle } => {
                t.contains(&self.operand(haystack), &self.operand(needle))
            }
            Expr::Index { base, key } => t.index(&self.operand(base), key),
            Expr::Array(items) => {
                let items: Vec<String> = items.iter().map(|item| self.expr(item)).collect();
                t.array_literal(&items)
            }
            Expr::Split { value, separator } => t.split(&self.expr(value), separator),
            Expr::ToInt(value) => t.to_int(&self.expr(value)),
            Expr::Length(list) => t.length(&self.operand(list)),
            Expr::CaughtError => t.caught_error(),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => format!(
                "({} ? {} : {})",
                self.expr(cond),
                self.operand(then),
                self.operand(otherwise)
            ),
        }
    }

    /// Static shape of an expression
    fn kind_of(&self, expr: &Expr) -> ValueKind {
        match expr {
            Expr::Str(_)
            | Expr::Concat(_)
            | Expr::Input { .. }
            | Expr::Escape(_)
            | Expr::Index { .. }
            | Expr::CaughtError
            | Expr::SelfPage
            | Expr::Method { .. } => ValueKind::Text,
            Expr::Int(_) | Expr::ToInt(_) | Expr::Length(_) => ValueKind::Int,
            Expr::Binary {
                op: BinaryOp::Add, ..
            } => ValueKind::Int,
            Expr::Binary { .. } | Expr::Not(_) | Expr::Contains { .. } => ValueKind::Bool,
            // null only starts an optional row
            Expr::Null | Expr::Fetch(_) => ValueKind::Rows,
            Expr::Var(name) => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.get(name).copied())
                .unwrap_or(ValueKind::Any),
            Expr::Array(_) => ValueKind::Values,
            Expr::Split { .. } => ValueKind::Strings,
            Expr::Ternary { then, .. } => self.kind_of(then),
            Expr::Host { function, .. } => match function.as_str() {
                "getLastID" => ValueKind::Int,
                "getValues" => ValueKind::Rows,
                "getRequestArray" => ValueKind::Strings,
                "getPermission" | "chooseOneFrom" | "createDropDownMenu" | "escapeHTML" => {
                    ValueKind::Text
                }
                _ => ValueKind::Any,
            },
            Expr::Raw(_) | Expr::Request => ValueKind::Any,
        }
    }

    /// Left side of an assignment, declaring `name` on first use in scope
    fn bind(&mut self, name: &str, kind: ValueKind) -> String {
        if self.scopes.iter().any(|scope| scope.contains_key(name)) {
            return self.target.variable(name);
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), kind);
        }
        self.target.declaration(name, kind)
    }

    fn operand(&self, expr: &Expr) -> String {
        if expr.needs_parens() {
            format!("({})", self.expr(expr))
        } else {
            self.expr(expr)
        }
    }

    fn args(&self, args: &[Expr]) -> String {
        args.iter()
            .map(|arg| self.expr(arg))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Markup(text) => {
                self.enter_markup();
                self.out.push_str(text);
            }
            Node::Echo(expr) => {
                self.enter_markup();
                let echo = self.target.inline_echo(&self.expr(expr));
                self.out.push_str(&echo);
            }
            Node::Include(path) => match self.target.include(path) {
                IncludeForm::Statement(statement) => self.statement(&statement),
                IncludeForm::Directive(directive) => {
                    self.enter_markup();
                    self.out.push_str(&directive);
                    self.out.push('\n');
                }
            },
            Node::Code(stmt) => self.stmt(stmt),
            Node::FieldLoop { set, body } => {
                let ctx = self.ctx;
                for field in ctx.fields_in(*set) {
                    let expanded = body(field, ctx);
                    self.nodes(&expanded);
                }
            }
            Node::Conditional {
                when,
                then,
                otherwise,
            } => {
                if when.holds(self.ctx.options()) {
                    self.nodes(then);
                } else {
                    self.nodes(otherwise);
                }
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        let t = self.target;
        match stmt {
            Stmt::Assign { var, value } => {
                let value_text = self.expr(value);
                let kind = self.kind_of(value);
                let line = format!("{} = {value_text}", self.bind(var, kind));
                self.statement(&line);
            }
            Stmt::Append { var, value } => {
                let line = format!(
                    "{} {} {}",
                    t.variable(var),
                    t.append_operator(),
                    self.expr(value)
                );
                self.statement(&line);
            }
            Stmt::Push { list, value } => {
                let line = t.push(&t.variable(list), &self.expr(value));
                self.statement(&line);
            }
            Stmt::Expr(expr) => {
                let line = self.expr(expr);
                self.statement(&line);
            }
            Stmt::Echo(expr) => {
                let line = t.echo(&self.expr(expr));
                self.statement(&line);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => self.if_chain(cond, then, otherwise),
            Stmt::ForEach {
                list,
                index,
                item,
                body,
            } => {
                let open = t.foreach_open(&self.expr(list), index, item);
                for line in open {
                    self.line(&line);
                }
                self.scoped(
                    [(index, ValueKind::Int), (item, ValueKind::Text)],
                    body,
                );
                self.line("}");
            }
            Stmt::FetchLoop { stmt, row, body } => {
                let open = t.fetch_loop_open(stmt, row);
                self.line(&open);
                self.scoped([(row, ValueKind::Rows)], body);
                self.line("}");
            }
            Stmt::Try { body, on_error } => {
                self.line("try {");
                self.indented(body);
                self.line(&t.catch_clause());
                self.block(on_error);
            }
            Stmt::Query {
                stmt,
                sql,
                params,
                reads,
            } => {
                let sql = self.expr(sql);
                let params = self.expr(params);
                let binding = (*reads || t.binds_writes()).then(|| self.bind(stmt, ValueKind::Rows));
                let lines =
                    t.prepare_execute(binding.as_deref(), &t.variable(stmt), &sql, &params, *reads);
                for line in lines {
                    self.statement(&line);
                }
            }
            Stmt::Redirect(url) => {
                for line in t.redirect(&self.expr(url)) {
                    self.statement(&line);
                }
            }
            Stmt::Comment(text) => {
                let line = t.comment(text);
                self.line(&line);
            }
            Stmt::LogError(message) => {
                let line = t.log_error(&self.expr(message));
                self.statement(&line);
            }
            Stmt::Exit => {
                let line = t.exit();
                self.statement(&line);
            }
        }
    }

    fn if_chain(&mut self, cond: &Expr, then: &[Node], otherwise: &[Node]) {
        let open = format!("if ({}) {{", self.expr(cond));
        self.line(&open);
        self.indented(then);

        let mut otherwise = otherwise;
        loop {
            match otherwise {
                [] => break,
                [Node::Code(Stmt::If {
                    cond,
                    then,
                    otherwise: next,
                })] => {
                    let line = format!("}} else if ({}) {{", self.expr(cond));
                    self.line(&line);
                    self.indented(then);
                    otherwise = next.as_slice();
                }
                nodes => {
                    self.line("} else {");
                    self.indented(nodes);
                    break;
                }
            }
        }
        self.line("}");
    }

    fn block(&mut self, body: &[Node]) {
        self.indented(body);
        self.line("}");
    }

    fn indented(&mut self, body: &[Node]) {
        self.scoped([], body);
    }

    fn scoped<const N: usize>(&mut self, bound: [(&String, ValueKind); N], body: &[Node]) {
        self.depth += 1;
        self.scopes.push(
            bound
                .into_iter()
                .map(|(name, kind)| (name.clone(), kind))
                .collect(),
        );
        self.nodes(body);
        self.scopes.pop();
        self.depth -= 1;
    }

    fn statement(&mut self, text: &str) {
        let line = format!("{text}{}", self.target.terminator());
        self.line(&line);
    }

    fn line(&mut self, text: &str) {
        self.enter_code();
        for _ in 0..self.depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn enter_code(&mut self) {
        if !self.in_code {
            if !self.out.is_empty() && !self.out.ends_with('\n') {
                self.out.push('\n');
            }
            self.out.push_str(self.target.open_tag());
            self.out.push('\n');
            self.in_code = true;
        }
    }

    fn enter_markup(&mut self) {
        if self.in_code {
            self.out.push_str(self.target.close_tag());
            self.out.push('\n');
            self.in_code = false;
        }
    }
}
