//! Field descriptor model
//!
//! A [`FieldDescriptor`] is the normalized metadata for one table column. Every
//! generation decision (which control to render, which sanitize filter to
//! apply, which sections show the column, how the list page filters it) is
//! derived from it.
//!
//! # Compact spec strings
//!
//! Descriptors can be written in the scaffold style used on the command line:
//!
//! ```text
//! name:dataType[:elementType][:modifier]*
//! ```
//!
//! | Modifier             | Meaning                                        |
//! |----------------------|------------------------------------------------|
//! | `pk`                 | primary key                                    |
//! | `required`           | required form control                          |
//! | `insert` / `update`  | include in the insert / update form            |
//! | `detail` / `list`    | include in the detail page / list table        |
//! | `all`                | all four of the above                          |
//! | `filter-text`        | case-insensitive LIKE filter on the list page  |
//! | `filter-select`      | exact-match drop-down filter on the list page  |
//! | `sanitize=KIND`      | override the sanitize filter                   |
//! | `ref=table.key.label`| relation for `select` controls                 |
//! | `caption=Text`       | caption (default: title-cased name)            |
//! | `choices=a\|b\|c`    | fixed choices for `radio` / `enum` controls    |
//!
//! ```text
//! article_id:int:pk:all
//! title:text:required:all:filter-text
//! category_id:int:select:all:filter-select:ref=category.category_id.name
//! published:int:checkbox:insert:update:list
//! ```

use super::helpers::TemplateHelpers;
use crate::error::{CrudsmithError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// Free text
    #[default]
    Text,
    /// E-mail address
    Email,
    /// Password
    Password,
    /// Integer
    Int,
    /// Floating point number
    Float,
    /// Date
    Date,
    /// Time of day
    Time,
    /// Date and time
    DateTime,
    /// Color value
    Color,
    /// Telephone number
    Tel,
}

impl DataType {
    /// All data types, in declaration order
    pub const ALL: [Self; 10] = [
        Self::Text,
        Self::Email,
        Self::Password,
        Self::Int,
        Self::Float,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::Color,
        Self::Tel,
    ];

    /// Token used in metadata and spec strings
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Int => "int",
            Self::Float => "float",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Color => "color",
            Self::Tel => "tel",
        }
    }

    /// Parse a data type token, `None` if unknown
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "email" => Some(Self::Email),
            "password" => Some(Self::Password),
            "int" | "integer" | "number" => Some(Self::Int),
            "float" | "double" | "decimal" => Some(Self::Float),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "datetime" | "timestamp" => Some(Self::DateTime),
            "color" => Some(Self::Color),
            "tel" | "phone" => Some(Self::Tel),
            _ => None,
        }
    }

    /// Parse a data type token, falling back to [`DataType::Text`]
    #[must_use]
    pub fn from_token_lenient(token: &str) -> Self {
        Self::from_token(token).unwrap_or_else(|| {
            tracing::warn!(token, "unknown data type, falling back to text");
            Self::Text
        })
    }

    /// Sanitize filter applied to request input of this type
    #[must_use]
    pub const fn sanitize_filter(self) -> SanitizeFilter {
        match self {
            Self::Password => SanitizeFilter::Default,
            Self::Int => SanitizeFilter::NumberInt,
            Self::Float => SanitizeFilter::NumberFloat,
            Self::Text
            | Self::Email
            | Self::Date
            | Self::Time
            | Self::DateTime
            | Self::Color
            | Self::Tel => SanitizeFilter::SpecialChars,
        }
    }

    /// Whether values of this type are free text (searchable with LIKE)
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Email | Self::Tel)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(Self::from_token_lenient(&token))
    }
}

/// UI element requested for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementType {
    /// Single-line input
    #[default]
    Text,
    /// Multi-line text area
    Textarea,
    /// Drop-down populated from a related entity
    Select,
    /// Checkbox with boolean-as-int semantics
    Checkbox,
    /// Radio button group over fixed choices
    Radio,
    /// Drop-down over fixed choices
    Enum,
}

impl ElementType {
    /// Token used in metadata and spec strings
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Enum => "enum",
        }
    }

    /// Parse an element type token, `None` if unknown
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "text" | "input" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "select" => Some(Self::Select),
            "checkbox" => Some(Self::Checkbox),
            "radio" => Some(Self::Radio),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(Self::from_token(&token).unwrap_or_else(|| {
            tracing::warn!(token = %token, "unknown element type, falling back to text");
            Self::Text
        }))
    }
}

/// Kind of list-page filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Case-insensitive `LIKE %value%`
    Text,
    /// Exact equality, rendered as a drop-down
    Select,
}

impl FilterKind {
    /// Token used in metadata and request parameter suffixes
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Select => "select",
        }
    }
}

/// Input sanitize filter applied by the emitted controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanitizeFilter {
    /// Escape HTML special characters
    SpecialChars,
    /// No sanitizing
    Default,
    /// Keep digits and signs only
    NumberInt,
    /// Keep digits, signs and the decimal point
    NumberFloat,
}

impl SanitizeFilter {
    /// Canonical name (`SPECIAL_CHARS`, `DEFAULT`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpecialChars => "SPECIAL_CHARS",
            Self::Default => "DEFAULT",
            Self::NumberInt => "NUMBER_INT",
            Self::NumberFloat => "NUMBER_FLOAT",
        }
    }

    /// Parse a canonical name, case-insensitive
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().replace('-', "_").as_str() {
            "SPECIAL_CHARS" => Some(Self::SpecialChars),
            "DEFAULT" => Some(Self::Default),
            "NUMBER_INT" => Some(Self::NumberInt),
            "NUMBER_FLOAT" => Some(Self::NumberFloat),
            _ => None,
        }
    }
}

/// Related entity backing a `select` control
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// Related table
    pub table: String,
    /// Key column in the related table
    pub key: String,
    /// Label column in the related table
    pub label: String,
}

impl Relation {
    /// Create a relation
    pub fn new(table: impl Into<String>, key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            label: label.into(),
        }
    }

    /// Relation implied by a foreign-key column name
    ///
    /// ```
    /// # use crudsmith::scaffold::field_type::Relation;
    /// let relation = Relation::derive("category_id");
    /// assert_eq!(relation.table, "category");
    /// assert_eq!(relation.key, "category_id");
    /// assert_eq!(relation.label, "name");
    /// ```
    #[must_use]
    pub fn derive(column: &str) -> Self {
        let table = column
            .strip_suffix("_id")
            .filter(|stem| !stem.is_empty())
            .unwrap_or(column);
        Self::new(table, column, "name")
    }
}

/// Group of columns a section works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSet {
    /// Columns of the insert form
    Insert,
    /// Columns of the update form
    Update,
    /// Columns of the detail page
    Detail,
    /// Columns of the list table
    List,
    /// Every column
    All,
}

/// Normalized metadata for one table column
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Column name, unique within the entity
    pub name: String,

    /// Caption; `None` means the title-cased name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Data type
    #[serde(default)]
    pub data_type: DataType,

    /// UI element
    #[serde(default)]
    pub element_type: ElementType,

    /// Primary key flag
    #[serde(default, alias = "pk")]
    pub primary_key: bool,

    /// Required form control
    #[serde(default)]
    pub required: bool,

    /// Shown in the insert form
    #[serde(default, alias = "insert")]
    pub include_in_insert: bool,

    /// Shown in the update form
    #[serde(default, alias = "update")]
    pub include_in_update: bool,

    /// Shown on the detail page
    #[serde(default, alias = "detail")]
    pub include_in_detail: bool,

    /// Shown in the list table
    #[serde(default, alias = "list")]
    pub include_in_list: bool,

    /// List filters configured for this column
    #[serde(default, alias = "filters")]
    pub list_filters: Vec<FilterKind>,

    /// Explicit sanitize filter overriding the data-type default
    #[serde(default, alias = "sanitize", skip_serializing_if = "Option::is_none")]
    pub sanitize_override: Option<SanitizeFilter>,

    /// Related entity for `select` controls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,

    /// Fixed choices for `radio` and `enum` controls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl FieldDescriptor {
    /// Create a descriptor with no roles
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            caption: None,
            data_type,
            element_type: ElementType::Text,
            primary_key: false,
            required: false,
            include_in_insert: false,
            include_in_update: false,
            include_in_detail: false,
            include_in_list: false,
            list_filters: Vec::new(),
            sanitize_override: None,
            relation: None,
            choices: Vec::new(),
        }
    }

    /// Set the caption
    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the element type
    #[must_use]
    pub const fn element(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    /// Mark as primary key
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Include in the insert form
    #[must_use]
    pub const fn insert(mut self) -> Self {
        self.include_in_insert = true;
        self
    }

    /// Include in the update form
    #[must_use]
    pub const fn update(mut self) -> Self {
        self.include_in_update = true;
        self
    }

    /// Include on the detail page
    #[must_use]
    pub const fn detail(mut self) -> Self {
        self.include_in_detail = true;
        self
    }

    /// Include in the list table
    #[must_use]
    pub const fn list(mut self) -> Self {
        self.include_in_list = true;
        self
    }

    /// Include in insert, update, detail and list
    #[must_use]
    pub const fn everywhere(self) -> Self {
        self.insert().update().detail().list()
    }

    /// Add a list filter
    #[must_use]
    pub fn filter(mut self, kind: FilterKind) -> Self {
        self.add_filter(kind);
        self
    }

    fn add_filter(&mut self, kind: FilterKind) {
        if !self.list_filters.contains(&kind) {
            self.list_filters.push(kind);
        }
    }

    /// Override the sanitize filter
    #[must_use]
    pub const fn sanitize(mut self, filter: SanitizeFilter) -> Self {
        self.sanitize_override = Some(filter);
        self
    }

    /// Set the related entity of a `select` control
    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Set fixed choices for `radio` / `enum` controls
    #[must_use]
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Caption shown in forms and table headers
    ///
    /// ```
    /// # use crudsmith::scaffold::field_type::{DataType, FieldDescriptor};
    /// let field = FieldDescriptor::new("category_id", DataType::Int);
    /// assert_eq!(field.caption(), "Category Id");
    /// ```
    #[must_use]
    pub fn caption(&self) -> String {
        self.caption
            .clone()
            .filter(|caption| !caption.trim().is_empty())
            .unwrap_or_else(|| TemplateHelpers::to_title(&self.name))
    }

    /// Effective sanitize filter
    #[must_use]
    pub fn sanitize_filter(&self) -> SanitizeFilter {
        self.sanitize_override
            .unwrap_or_else(|| self.data_type.sanitize_filter())
    }

    /// Related entity of a `select` control, explicit or derived from the name
    #[must_use]
    pub fn related(&self) -> Relation {
        self.relation
            .clone()
            .unwrap_or_else(|| Relation::derive(&self.name))
    }

    /// Whether the column renders as a foreign-key drop-down
    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        self.element_type == ElementType::Select
    }

    /// Whether the column belongs to a field set
    #[must_use]
    pub const fn in_set(&self, set: FieldSet) -> bool {
        match set {
            FieldSet::Insert => self.include_in_insert,
            FieldSet::Update => self.include_in_update,
            FieldSet::Detail => self.include_in_detail,
            FieldSet::List => self.include_in_list,
            FieldSet::All => true,
        }
    }

    /// Request parameter carrying the value of one list filter
    ///
    /// The column name, or `<name>_<kind>` when the column has both filter kinds.
    #[must_use]
    pub fn filter_param(&self, kind: FilterKind) -> String {
        if self.list_filters.len() > 1 {
            format!("{}_{}", self.name, kind.as_str())
        } else {
            self.name.clone()
        }
    }

    /// Parse a compact field spec
    ///
    /// # Examples
    ///
    /// ```
    /// # use crudsmith::scaffold::field_type::{DataType, ElementType, FieldDescriptor};
    /// let field = FieldDescriptor::parse("title:text:required:all").unwrap();
    /// assert_eq!(field.name, "title");
    /// assert_eq!(field.data_type, DataType::Text);
    /// assert!(field.required);
    /// assert!(field.include_in_list);
    ///
    /// let field = FieldDescriptor::parse("body:text:textarea:insert:update").unwrap();
    /// assert_eq!(field.element_type, ElementType::Textarea);
    /// assert!(!field.include_in_list);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The spec has no name or the name is not an identifier
    /// - A modifier is unknown or malformed
    ///
    /// Unknown data types are not errors; they fall back to `text`.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();

        let name = parts[0];
        if name.is_empty() {
            return Err(CrudsmithError::field_spec(spec, "field name cannot be empty"));
        }
        if !name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(CrudsmithError::field_spec(
                spec,
                "field name must be alphanumeric with underscores",
            ));
        }

        let data_type = parts
            .get(1)
            .filter(|token| !token.is_empty())
            .map_or(DataType::Text, |token| DataType::from_token_lenient(token));
        let mut field = Self::new(name, data_type);

        let mut rest = parts.iter().skip(2).peekable();
        if let Some(element_type) = rest.peek().and_then(|token| ElementType::from_token(token)) {
            field.element_type = element_type;
            rest.next();
        }

        for modifier in rest {
            field.apply_modifier(spec, modifier)?;
        }

        Ok(field)
    }

    fn apply_modifier(&mut self, spec: &str, modifier: &str) -> Result<()> {
        if let Some((key, value)) = modifier.split_once('=') {
            match key.trim().to_lowercase().as_str() {
                "sanitize" => {
                    let filter = SanitizeFilter::from_token(value).ok_or_else(|| {
                        CrudsmithError::field_spec(spec, format!("unknown sanitize filter '{value}'"))
                    })?;
                    self.sanitize_override = Some(filter);
                }
                "ref" => {
                    let segments: Vec<&str> = value.split('.').map(str::trim).collect();
                    let relation = match segments.as_slice() {
                        [table] => Relation::new(*table, self.name.clone(), "name"),
                        [table, key] => Relation::new(*table, *key, "name"),
                        [table, key, label] => Relation::new(*table, *key, *label),
                        _ => {
                            return Err(CrudsmithError::field_spec(
                                spec,
                                "ref must be table[.key[.label]]",
                            ))
                        }
                    };
                    self.relation = Some(relation);
                }
                "caption" => self.caption = Some(value.to_string()),
                "choices" => {
                    self.choices = value
                        .split('|')
                        .map(str::trim)
                        .filter(|choice| !choice.is_empty())
                        .map(ToString::to_string)
                        .collect();
                }
                unknown => {
                    return Err(CrudsmithError::field_spec(
                        spec,
                        format!("unknown modifier '{unknown}='"),
                    ))
                }
            }
            return Ok(());
        }

        match modifier.to_lowercase().as_str() {
            "pk" | "primary" | "primary_key" => self.primary_key = true,
            "required" => self.required = true,
            "insert" => self.include_in_insert = true,
            "update" => self.include_in_update = true,
            "detail" => self.include_in_detail = true,
            "list" => self.include_in_list = true,
            "all" => {
                self.include_in_insert = true;
                self.include_in_update = true;
                self.include_in_detail = true;
                self.include_in_list = true;
            }
            "filter-text" => self.add_filter(FilterKind::Text),
            "filter-select" => self.add_filter(FilterKind::Select),
            "" => {}
            unknown => {
                return Err(CrudsmithError::field_spec(
                    spec,
                    format!(
                        "unknown modifier '{unknown}'. Valid modifiers: pk, required, insert, update, detail, list, all, filter-text, filter-select, sanitize=, ref=, caption=, choices="
                    ),
                ))
            }
        }
        Ok(())
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)?;
        if self.element_type != ElementType::Text {
            write!(f, ":{}", self.element_type)?;
        }
        if self.primary_key {
            write!(f, ":pk")?;
        }
        if self.required {
            write!(f, ":required")?;
        }
        for (on, token) in [
            (self.include_in_insert, "insert"),
            (self.include_in_update, "update"),
            (self.include_in_detail, "detail"),
            (self.include_in_list, "list"),
        ] {
            if on {
                write!(f, ":{token}")?;
            }
        }
        for kind in &self.list_filters {
            write!(f, ":filter-{}", kind.as_str())?;
        }
        Ok(())
    }
}

/// Index of the descriptor used as primary key
///
/// The first descriptor marked `primary_key`; when none is marked, the first
/// descriptor in list order. `None` only for an empty list.
#[must_use]
pub fn primary_key_index(fields: &[FieldDescriptor]) -> Option<usize> {
    let marked: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.primary_key)
        .map(|(index, _)| index)
        .collect();

    match marked.as_slice() {
        [] if fields.is_empty() => None,
        [] => {
            tracing::warn!(
                field = %fields[0].name,
                "no primary key marked, using the first field"
            );
            Some(0)
        }
        [only] => Some(*only),
        [first, ..] => {
            tracing::warn!(
                field = %fields[*first].name,
                count = marked.len(),
                "more than one primary key marked, using the first one"
            );
            Some(*first)
        }
    }
}
