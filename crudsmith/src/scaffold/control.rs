//! Form control synthesizer
//!
//! Maps a descriptor and a form mode to a [`Control`]: which element to
//! render, which sanitize filter the controller applies to its value, and
//! which value to prefill. The element type wins over the data type; the
//! data type picks the input subtype otherwise.
//!
//! Controls perform no validation. The controller sanitizes each request
//! value with [`Control::sanitize`].

use super::ast::{Expr, Node};
use super::field_type::{DataType, ElementType, FieldDescriptor, Relation, SanitizeFilter};
use super::helpers::TemplateHelpers;

/// Which form a control is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormMode {
    /// Empty insert form
    Insert,
    /// Update form prefilled from the stored row
    Update,
}

/// `<input>` subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputType {
    /// Plain text (default)
    #[default]
    Text,
    /// E-mail address
    Email,
    /// Masked password
    Password,
    /// Integer
    Number,
    /// Number with any fraction (`step="any"`)
    NumberAny,
    /// Telephone number
    Tel,
}

impl InputType {
    /// Value of the `type` attribute
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Number | Self::NumberAny => "number",
            Self::Tel => "tel",
        }
    }

    /// Input subtype for a data type
    #[must_use]
    pub const fn for_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Email => Self::Email,
            DataType::Password => Self::Password,
            DataType::Int => Self::Number,
            DataType::Float => Self::NumberAny,
            DataType::Tel => Self::Tel,
            DataType::Text
            | DataType::Date
            | DataType::Time
            | DataType::DateTime
            | DataType::Color => Self::Text,
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a drop-down takes its options from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectSource {
    /// Rows of a related entity, rendered by the runtime
    Related(Relation),
    /// Fixed choices
    Choices(Vec<String>),
}

/// Kind of control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// Single-line input
    Input(InputType),
    /// Multi-line text
    Textarea,
    /// Drop-down
    Select(SelectSource),
    /// Checkbox submitting `"1"` when checked
    Checkbox,
    /// Radio group over fixed choices
    Radio(Vec<String>),
}

/// Synthesized form control
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    /// Request field name
    pub name: String,
    /// Label
    pub caption: String,
    /// Kind
    pub kind: ControlKind,
    /// Carries the `required` marker
    pub required: bool,
    /// Filter the controller applies to the submitted value
    pub sanitize: SanitizeFilter,
    /// Prefilled value
    pub value: Option<Expr>,
}

/// Value submitted by a checked checkbox
pub const CHECKBOX_VALUE: &str = "1";

/// Synthesize the control for one descriptor
///
/// `existing` is the stored value in update mode; it is ignored in insert mode
/// and for passwords.
#[must_use]
pub fn synthesize(field: &FieldDescriptor, mode: FormMode, existing: Option<Expr>) -> Control {
    let kind = control_kind(field);
    let value = match (mode, &kind) {
        (FormMode::Insert, _) | (_, ControlKind::Input(InputType::Password)) => None,
        (FormMode::Update, _) => existing,
    };

    Control {
        name: field.name.clone(),
        caption: field.caption(),
        kind,
        required: field.required,
        sanitize: field.sanitize_filter(),
        value,
    }
}

fn control_kind(field: &FieldDescriptor) -> ControlKind {
    let fallback = || ControlKind::Input(InputType::for_data_type(field.data_type));
    match field.element_type {
        ElementType::Text => fallback(),
        ElementType::Textarea => ControlKind::Textarea,
        ElementType::Checkbox => ControlKind::Checkbox,
        ElementType::Select => {
            if field.relation.is_none() {
                tracing::warn!(
                    field = %field.name,
                    "select field without a relation, deriving one from the name"
                );
            }
            ControlKind::Select(SelectSource::Related(field.related()))
        }
        ElementType::Radio | ElementType::Enum if field.choices.is_empty() => {
            tracing::warn!(
                field = %field.name,
                element = %field.element_type,
                "choice field without choices, rendering a text input"
            );
            fallback()
        }
        ElementType::Radio => ControlKind::Radio(field.choices.clone()),
        ElementType::Enum => ControlKind::Select(SelectSource::Choices(field.choices.clone())),
    }
}

impl Control {
    fn attributes(&self) -> String {
        let mut attributes = format!("name=\"{0}\" id=\"{0}\"", self.name);
        if self.required {
            attributes.push_str(" required=\"required\"");
        }
        attributes
    }

    fn value_matches(&self, literal: &str) -> Option<Expr> {
        self.value
            .clone()
            .map(|value| Expr::eq(value, Expr::str(literal)))
    }

    /// Markup nodes rendering the control
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        match &self.kind {
            ControlKind::Input(input_type) => self.input_nodes(*input_type),
            ControlKind::Textarea => {
                let mut nodes = vec![Node::markup(format!(
                    "<textarea class=\"form-control\" {} spellcheck=\"false\">",
                    self.attributes()
                ))];
                if let Some(value) = &self.value {
                    nodes.push(Node::echo(Expr::escape(value.clone())));
                }
                nodes.push(Node::markup("</textarea>\n"));
                nodes
            }
            ControlKind::Select(source) => self.select_nodes(source),
            ControlKind::Checkbox => {
                let mut nodes = vec![Node::markup(format!(
                    "<label><input class=\"form-check-input\" type=\"checkbox\" {} value=\"{CHECKBOX_VALUE}\"",
                    self.attributes()
                ))];
                nodes.extend(self.marker(CHECKBOX_VALUE, " checked=\"checked\""));
                nodes.push(Node::markup(format!(
                    "> {}</label>\n",
                    TemplateHelpers::escape_html(&self.caption)
                )));
                nodes
            }
            ControlKind::Radio(choices) => choices
                .iter()
                .flat_map(|choice| {
                    let choice_html = TemplateHelpers::escape_html(choice);
                    let mut nodes = vec![Node::markup(format!(
                        "<label><input type=\"radio\" name=\"{}\" value=\"{choice_html}\"{}",
                        self.name,
                        if self.required { " required=\"required\"" } else { "" }
                    ))];
                    nodes.extend(self.marker(choice, " checked=\"checked\""));
                    nodes.push(Node::markup(format!("> {choice_html}</label>\n")));
                    nodes
                })
                .collect(),
        }
    }

    fn input_nodes(&self, input_type: InputType) -> Vec<Node> {
        let step = if input_type == InputType::NumberAny {
            " step=\"any\""
        } else {
            ""
        };
        let mut nodes = vec![Node::markup(format!(
            "<input type=\"{input_type}\"{step} class=\"form-control\" {} autocomplete=\"off\"",
            self.attributes()
        ))];
        if let Some(value) = &self.value {
            nodes.push(Node::markup(" value=\""));
            nodes.push(Node::echo(Expr::escape(value.clone())));
            nodes.push(Node::markup("\""));
        }
        nodes.push(Node::markup(">\n"));
        nodes
    }

    fn select_nodes(&self, source: &SelectSource) -> Vec<Node> {
        let mut nodes = vec![Node::markup(format!(
            "<select class=\"form-control\" {}>\n<option value=\"\">- Select One -</option>\n",
            self.attributes()
        ))];
        match source {
            SelectSource::Related(relation) => {
                nodes.push(Node::echo(Expr::cms(
                    "createDropDownMenu",
                    vec![
                        Expr::str(&relation.table),
                        Expr::str(&relation.key),
                        Expr::str(&relation.label),
                        self.value.clone().unwrap_or(Expr::Null),
                    ],
                )));
                nodes.push(Node::markup("\n"));
            }
            SelectSource::Choices(choices) => {
                for choice in choices {
                    let choice_html = TemplateHelpers::escape_html(choice);
                    nodes.push(Node::markup(format!("<option value=\"{choice_html}\"")));
                    nodes.extend(self.marker(choice, " selected=\"selected\""));
                    nodes.push(Node::markup(format!(">{choice_html}</option>\n")));
                }
            }
        }
        nodes.push(Node::markup("</select>\n"));
        nodes
    }

    fn marker(&self, literal: &str, attribute: &str) -> Option<Node> {
        self.value_matches(literal).map(|cond| {
            Node::echo(Expr::ternary(cond, Expr::str(attribute), Expr::str("")))
        })
    }
}
