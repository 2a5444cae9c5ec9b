//! Emission targets
//!
//! An [`EmissionTarget`] is a dialect of the host framework's page language.
//! It knows how to spell statements (terminators, concatenation, variable
//! prefixes, declarations) and a fixed set of named statement templates
//! (sanitized request input, redirect, prepare + execute, HTML escaping,
//! host library calls). Section emitters never format target syntax
//! themselves; they build a section AST and the
//! [`Renderer`](super::ast::Renderer) asks the target for every piece.
//!
//! Two targets are registered: [`Php`] and [`Jsp`]. Adding a third is an
//! `impl EmissionTarget` plus one [`TargetRegistry::register`] call.

use super::field_type::SanitizeFilter;
use crate::error::{CrudsmithError, Result};

/// Request parameter source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Query string
    Get,
    /// Form body
    Post,
}

/// How a target spells an include
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeForm {
    /// A code statement (rendered in code mode)
    Statement(String),
    /// A markup directive (rendered in markup mode)
    Directive(String),
}

/// Static shape of a page variable, used by typed dialects to declare it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Text value
    Text,
    /// Integer value
    Int,
    /// Condition
    Bool,
    /// Database cursor or fetched row
    Rows,
    /// List of request strings
    Strings,
    /// Positional query parameters
    Values,
    /// Anything else
    Any,
}

/// Name of the framework filter constant
const fn filter_constant(filter: Option<SanitizeFilter>) -> &'static str {
    match filter {
        Some(SanitizeFilter::SpecialChars) => "FILTER_SANITIZE_SPECIAL_CHARS",
        Some(SanitizeFilter::NumberInt) => "FILTER_SANITIZE_NUMBER_INT",
        Some(SanitizeFilter::NumberFloat) => "FILTER_SANITIZE_NUMBER_FLOAT",
        Some(SanitizeFilter::Default) | None => "FILTER_DEFAULT",
    }
}

/// A page-language dialect
///
/// Statement-returning methods return the statement text without its
/// terminator; the renderer appends [`EmissionTarget::terminator`].
pub trait EmissionTarget: Send + Sync {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Page file extension
    fn extension(&self) -> &'static str;

    /// Opens a code block inside markup
    fn open_tag(&self) -> &'static str;

    /// Closes a code block
    fn close_tag(&self) -> &'static str;

    /// Echo an expression from markup mode
    fn inline_echo(&self, expr: &str) -> String;

    /// Statement terminator
    fn terminator(&self) -> &'static str {
        ";"
    }

    /// String concatenation operator
    fn concat_operator(&self) -> &'static str;

    /// Prefix of variable names
    fn variable_prefix(&self) -> &'static str {
        ""
    }

    /// Member access operator
    fn member_access(&self) -> &'static str {
        "."
    }

    /// Compound append operator
    fn append_operator(&self) -> &'static str {
        "+="
    }

    /// Variable reference
    fn variable(&self, name: &str) -> String {
        format!("{}{name}", self.variable_prefix())
    }

    /// Left side of the first assignment to a variable in its scope
    fn declaration(&self, name: &str, _kind: ValueKind) -> String {
        self.variable(name)
    }

    /// String literal
    fn string_literal(&self, value: &str) -> String {
        let mut literal = String::with_capacity(value.len() + 2);
        literal.push('"');
        for c in value.chars() {
            match c {
                '\\' => literal.push_str("\\\\"),
                '"' => literal.push_str("\\\""),
                '\n' => literal.push_str("\\n"),
                '\r' => literal.push_str("\\r"),
                '\t' => literal.push_str("\\t"),
                _ => literal.push(c),
            }
        }
        literal.push('"');
        literal
    }

    /// Null literal
    fn null_literal(&self) -> &'static str {
        "null"
    }

    /// Equality test; `nullable` is set when one side is the null literal
    fn equality(&self, left: &str, right: &str, negated: bool, _nullable: bool) -> String {
        format!("{left} {} {right}", if negated { "!=" } else { "==" })
    }

    /// Read a request parameter through a sanitize filter
    fn sanitize_input(&self, source: InputSource, name: &str, filter: Option<SanitizeFilter>)
        -> String;

    /// HTML-escape an expression
    fn html_escape(&self, expr: &str) -> String;

    /// Call into the host framework library
    fn host_call(&self, function: &str, args: &[String]) -> String;

    /// The submitted request, as passed to host library calls
    fn request_body(&self) -> &'static str;

    /// Write an expression to the response
    fn echo(&self, expr: &str) -> String;

    /// Redirect and stop processing
    fn redirect(&self, url: &str) -> Vec<String>;

    /// Whether a write statement is bound to a statement variable
    fn binds_writes(&self) -> bool {
        true
    }

    /// Run `sql` with `params` on the page database handle
    ///
    /// `binding` is the statement variable as written on the left of the
    /// assignment (a declaration on first use); it is `None` for writes when
    /// [`EmissionTarget::binds_writes`] is false.
    fn prepare_execute(
        &self,
        binding: Option<&str>,
        stmt: &str,
        sql: &str,
        params: &str,
        reads: bool,
    ) -> Vec<String>;

    /// Next row of an executed statement, null when exhausted
    fn fetch_row(&self, stmt: &str) -> String;

    /// Include a framework file given without extension
    fn include(&self, path: &str) -> IncludeForm;

    /// Array literal
    fn array_literal(&self, items: &[String]) -> String;

    /// Keyed element of an array or row
    fn index(&self, base: &str, key: &str) -> String {
        format!("{base}[{}]", self.string_literal(key))
    }

    /// Case-insensitive substring test
    fn contains(&self, haystack: &str, needle: &str) -> String;

    /// Append an element to a list
    fn push(&self, list: &str, value: &str) -> String;

    /// Split a string on a separator literal
    fn split(&self, value: &str, separator: &str) -> String;

    /// Convert to an integer, zero when not numeric
    fn to_int(&self, value: &str) -> String;

    /// Number of list elements
    fn length(&self, list: &str) -> String;

    /// Opens a loop over a list, binding a numeric index and the element
    fn foreach_open(&self, list: &str, index: &str, item: &str) -> Vec<String>;

    /// Opens a loop over the rows of an executed statement
    fn fetch_loop_open(&self, stmt: &str, row: &str) -> String;

    /// Closes a `try` body and opens its handler
    fn catch_clause(&self) -> String;

    /// Name of the caught error inside a handler
    fn caught_error(&self) -> String;

    /// Write a message to the server error log
    fn log_error(&self, message: &str) -> String;

    /// Stop processing the request
    fn exit(&self) -> String;

    /// Line comment
    fn comment(&self, text: &str) -> String {
        format!("// {text}")
    }
}

/// PHP pages (`<?php ... ?>`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Php;

impl EmissionTarget for Php {
    fn name(&self) -> &'static str {
        "php"
    }

    fn extension(&self) -> &'static str {
        "php"
    }

    fn open_tag(&self) -> &'static str {
        "<?php"
    }

    fn close_tag(&self) -> &'static str {
        "?>"
    }

    fn inline_echo(&self, expr: &str) -> String {
        format!("<?php echo {expr}; ?>")
    }

    fn concat_operator(&self) -> &'static str {
        "."
    }

    fn variable_prefix(&self) -> &'static str {
        "$"
    }

    fn member_access(&self) -> &'static str {
        "->"
    }

    fn append_operator(&self) -> &'static str {
        ".="
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn sanitize_input(
        &self,
        source: InputSource,
        name: &str,
        filter: Option<SanitizeFilter>,
    ) -> String {
        let source = match source {
            InputSource::Get => "INPUT_GET",
            InputSource::Post => "INPUT_POST",
        };
        format!(
            "filterInput({source}, {}, {}, {})",
            self.string_literal(name),
            filter_constant(filter),
            filter.is_some()
        )
    }

    fn html_escape(&self, expr: &str) -> String {
        self.host_call("escapeHTML", &[expr.to_string()])
    }

    fn host_call(&self, function: &str, args: &[String]) -> String {
        format!("$cms->{function}({})", args.join(", "))
    }

    fn request_body(&self) -> &'static str {
        "$_POST"
    }

    fn echo(&self, expr: &str) -> String {
        format!("echo {expr}")
    }

    fn redirect(&self, url: &str) -> Vec<String> {
        vec![format!("header('Location: ' . {url})"), "exit()".to_string()]
    }

    fn prepare_execute(
        &self,
        binding: Option<&str>,
        stmt: &str,
        sql: &str,
        params: &str,
        _reads: bool,
    ) -> Vec<String> {
        vec![
            format!("{} = $database1->prepare({sql})", binding.unwrap_or(stmt)),
            format!("{stmt}->execute({params})"),
        ]
    }

    fn fetch_row(&self, stmt: &str) -> String {
        format!("{stmt}->fetch()")
    }

    fn include(&self, path: &str) -> IncludeForm {
        IncludeForm::Statement(format!(
            "include_once dirname(__FILE__) . {}",
            self.string_literal(&format!("/{path}.php"))
        ))
    }

    fn array_literal(&self, items: &[String]) -> String {
        format!("array({})", items.join(", "))
    }

    fn contains(&self, haystack: &str, needle: &str) -> String {
        format!("stripos({haystack}, {needle}) !== false")
    }

    fn push(&self, list: &str, value: &str) -> String {
        format!("{list}[] = {value}")
    }

    fn split(&self, value: &str, separator: &str) -> String {
        format!("explode({}, {value})", self.string_literal(separator))
    }

    fn to_int(&self, value: &str) -> String {
        format!("intval({value})")
    }

    fn length(&self, list: &str) -> String {
        format!("count({list})")
    }

    fn foreach_open(&self, list: &str, index: &str, item: &str) -> Vec<String> {
        vec![format!(
            "foreach ({list} as {} => {}) {{",
            self.variable(index),
            self.variable(item)
        )]
    }

    fn fetch_loop_open(&self, stmt: &str, row: &str) -> String {
        format!(
            "while ({} = {}->fetch()) {{",
            self.variable(row),
            self.variable(stmt)
        )
    }

    fn catch_clause(&self) -> String {
        "} catch (Exception $e) {".to_string()
    }

    fn caught_error(&self) -> String {
        "$e->getMessage()".to_string()
    }

    fn log_error(&self, message: &str) -> String {
        format!("error_log({message})")
    }

    fn exit(&self) -> String {
        "exit()".to_string()
    }
}

/// Java server pages (`<% ... %>`)
///
/// Scriptlets share one service method, so every local is declared with its
/// Java type on first assignment. The host library is split between
/// page-level helper functions, the `cms` object and the `database1`
/// connection wrapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jsp;

impl Jsp {
    /// Host helpers included as page-level functions rather than `cms` methods
    const PAGE_FUNCTIONS: [&'static str; 5] = [
        "getPermission",
        "createUserLog",
        "getRequestArray",
        "chooseOneFrom",
        "escapeHTML",
    ];

    /// Host helpers that live on the connection wrapper
    const DATABASE_FUNCTIONS: [&'static str; 1] = ["getLastID"];

    fn text(value: &str) -> String {
        format!("String.valueOf({value})")
    }
}

impl EmissionTarget for Jsp {
    fn name(&self) -> &'static str {
        "jsp"
    }

    fn extension(&self) -> &'static str {
        "jsp"
    }

    fn open_tag(&self) -> &'static str {
        "<%"
    }

    fn close_tag(&self) -> &'static str {
        "%>"
    }

    fn inline_echo(&self, expr: &str) -> String {
        format!("<%= {expr} %>")
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn declaration(&self, name: &str, kind: ValueKind) -> String {
        let ty = match kind {
            ValueKind::Text => "String",
            ValueKind::Int => "long",
            ValueKind::Bool => "boolean",
            ValueKind::Rows => "java.sql.ResultSet",
            ValueKind::Strings => "String[]",
            ValueKind::Values => "java.util.List<Object>",
            ValueKind::Any => "Object",
        };
        format!("{ty} {name}")
    }

    fn equality(&self, left: &str, right: &str, negated: bool, nullable: bool) -> String {
        if nullable {
            return format!("{left} {} {right}", if negated { "!=" } else { "==" });
        }
        format!(
            "{}{}.equals({})",
            if negated { "!" } else { "" },
            Self::text(left),
            Self::text(right)
        )
    }

    fn sanitize_input(
        &self,
        _source: InputSource,
        name: &str,
        filter: Option<SanitizeFilter>,
    ) -> String {
        format!(
            "filterInput(request, {}, {}, {})",
            self.string_literal(name),
            self.string_literal(filter_constant(filter)),
            filter.is_some()
        )
    }

    fn html_escape(&self, expr: &str) -> String {
        self.host_call("escapeHTML", &[Self::text(expr)])
    }

    fn host_call(&self, function: &str, args: &[String]) -> String {
        let args = args.join(", ");
        if Self::PAGE_FUNCTIONS.contains(&function) {
            format!("{function}({args})")
        } else if Self::DATABASE_FUNCTIONS.contains(&function) {
            format!("database1.{function}({args})")
        } else {
            format!("cms.{function}({args})")
        }
    }

    fn request_body(&self) -> &'static str {
        "request"
    }

    fn echo(&self, expr: &str) -> String {
        format!("out.print({expr})")
    }

    fn redirect(&self, url: &str) -> Vec<String> {
        vec![format!("response.sendRedirect({url})"), "return".to_string()]
    }

    fn binds_writes(&self) -> bool {
        false
    }

    fn prepare_execute(
        &self,
        binding: Option<&str>,
        stmt: &str,
        sql: &str,
        params: &str,
        reads: bool,
    ) -> Vec<String> {
        match binding {
            Some(binding) if reads => {
                vec![format!("{binding} = database1.executeQuery({sql}, {params})")]
            }
            _ if reads => vec![format!("{stmt} = database1.executeQuery({sql}, {params})")],
            _ => vec![format!("database1.execute({sql}, {params})")],
        }
    }

    fn fetch_row(&self, stmt: &str) -> String {
        format!("({stmt}.next() ? {stmt} : null)")
    }

    fn include(&self, path: &str) -> IncludeForm {
        IncludeForm::Directive(format!("<%@ include file=\"{path}.jsp\" %>"))
    }

    fn array_literal(&self, items: &[String]) -> String {
        if items.is_empty() {
            "new java.util.ArrayList<Object>()".to_string()
        } else {
            format!(
                "new java.util.ArrayList<Object>(java.util.Arrays.asList({}))",
                items.join(", ")
            )
        }
    }

    fn index(&self, base: &str, key: &str) -> String {
        format!("{base}.getString({})", self.string_literal(key))
    }

    fn contains(&self, haystack: &str, needle: &str) -> String {
        format!(
            "{}.toLowerCase().contains({}.toLowerCase())",
            Self::text(haystack),
            Self::text(needle)
        )
    }

    fn push(&self, list: &str, value: &str) -> String {
        format!("{list}.add({value})")
    }

    fn split(&self, value: &str, separator: &str) -> String {
        format!(
            "{}.split(java.util.regex.Pattern.quote({}))",
            Self::text(value),
            self.string_literal(separator)
        )
    }

    fn to_int(&self, value: &str) -> String {
        let text = Self::text(value);
        format!("({text}.matches(\"-?\\\\d+\") ? Long.parseLong({text}) : 0L)")
    }

    fn length(&self, list: &str) -> String {
        format!("{list}.length")
    }

    fn foreach_open(&self, list: &str, index: &str, item: &str) -> Vec<String> {
        vec![
            format!("for (int {index} = 0; {index} < {list}.length; {index}++) {{"),
            format!("\tString {item} = {list}[{index}];"),
        ]
    }

    fn fetch_loop_open(&self, stmt: &str, row: &str) -> String {
        format!("for (java.sql.ResultSet {row} = {stmt}; {row}.next(); ) {{")
    }

    fn catch_clause(&self) -> String {
        "} catch (Exception e) {".to_string()
    }

    fn caught_error(&self) -> String {
        "e.getMessage()".to_string()
    }

    fn log_error(&self, message: &str) -> String {
        format!("application.log({message})")
    }

    fn exit(&self) -> String {
        "return".to_string()
    }
}

/// Registered emission targets, resolved by name
pub struct TargetRegistry {
    targets: Vec<Box<dyn EmissionTarget>>,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TargetRegistry {
    /// Registry without targets
    #[must_use]
    pub fn empty() -> Self {
        Self {
            targets: Vec::new(),
        }
    }

    /// Registry with the built-in targets
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Php));
        registry.register(Box::new(Jsp));
        registry
    }

    /// Register a target, replacing one with the same name
    pub fn register(&mut self, target: Box<dyn EmissionTarget>) {
        self.targets.retain(|existing| existing.name() != target.name());
        self.targets.push(target);
    }

    /// Resolve a target by name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns [`CrudsmithError::UnknownTarget`] if no target has this name.
    pub fn get(&self, name: &str) -> Result<&dyn EmissionTarget> {
        self.targets
            .iter()
            .find(|target| target.name().eq_ignore_ascii_case(name.trim()))
            .map(AsRef::as_ref)
            .ok_or_else(|| CrudsmithError::UnknownTarget {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.targets.iter().map(|target| target.name()).collect()
    }

    /// Iterate over registered targets
    pub fn iter(&self) -> impl Iterator<Item = &dyn EmissionTarget> {
        self.targets.iter().map(AsRef::as_ref)
    }
}
