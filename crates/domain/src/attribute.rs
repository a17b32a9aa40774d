use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use admindeck_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;
use crate::validation::ValidationRule;

/// Closed set of attribute types a page schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    /// Single-line text input.
    Text,
    /// Numeric input.
    Number,
    /// Single choice from an option list.
    Select,
    /// Multiple choices from an option list.
    MultiSelect,
    /// Date-only picker.
    Date,
    /// Date and time picker.
    DateTime,
    /// On/off switch.
    Toggle,
    /// Checkbox.
    Checkbox,
    /// Image upload tracked by storage reference.
    Image,
    /// Multi-line text input.
    Textarea,
    /// Value carried in the payload but never shown.
    Hidden,
    /// Section heading; carries no value.
    Title,
    /// Section divider; carries no value.
    Line,
}

impl FieldType {
    /// Every supported type, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Text,
        Self::Number,
        Self::Select,
        Self::MultiSelect,
        Self::Date,
        Self::DateTime,
        Self::Toggle,
        Self::Checkbox,
        Self::Image,
        Self::Textarea,
        Self::Hidden,
        Self::Title,
        Self::Line,
    ];

    /// Returns a stable storage value for the field type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Select => "select",
            Self::MultiSelect => "multiSelect",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Toggle => "toggle",
            Self::Checkbox => "checkbox",
            Self::Image => "image",
            Self::Textarea => "textarea",
            Self::Hidden => "hidden",
            Self::Title => "title",
            Self::Line => "line",
        }
    }

    /// Returns whether the type only marks layout and carries no value.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Title | Self::Line)
    }

    /// Returns whether the type draws its values from an option list.
    #[must_use]
    pub fn uses_options(&self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect)
    }

    /// Checks that a JSON value has the shape this type stores.
    pub fn validate_value(self, value: &Value) -> AppResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let is_valid = match self {
            Self::Text | Self::Textarea | Self::Date | Self::DateTime | Self::Image => {
                value.is_string()
            }
            Self::Number => value.is_number(),
            Self::Select => value.is_string() || value.is_number(),
            Self::MultiSelect => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| item.is_string() || item.is_number())),
            Self::Toggle | Self::Checkbox => value.is_boolean(),
            Self::Hidden => true,
            Self::Title | Self::Line => false,
        };

        if !is_valid {
            return Err(AppError::Validation(format!(
                "value does not match field type '{}'",
                self.as_str()
            )));
        }

        Ok(())
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "select" => Ok(Self::Select),
            "multiSelect" | "multi_select" => Ok(Self::MultiSelect),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "toggle" => Ok(Self::Toggle),
            "checkbox" => Ok(Self::Checkbox),
            "image" => Ok(Self::Image),
            "textarea" => Ok(Self::Textarea),
            "hidden" => Ok(Self::Hidden),
            "title" => Ok(Self::Title),
            "line" => Ok(Self::Line),
            _ => Err(AppError::Configuration(format!(
                "unknown field type '{value}'"
            ))),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_owned()
    }
}

/// Returns whether a value counts as "not provided".
///
/// `null`, blank strings, and empty lists are empty. Booleans and numbers never are.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Context an attribute can be shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityContext {
    /// Table rows and cards.
    View,
    /// Create form.
    Add,
    /// Update form.
    Update,
}

/// Per-context visibility flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeVisibility {
    /// Shown in table rows and cards.
    pub view: bool,
    /// Shown and submitted in the create form.
    pub add: bool,
    /// Shown and submitted in the update form.
    pub update: bool,
}

impl AttributeVisibility {
    /// Visible everywhere.
    #[must_use]
    pub fn all() -> Self {
        Self {
            view: true,
            add: true,
            update: true,
        }
    }

    /// Returns the flag for one context.
    #[must_use]
    pub fn allows(&self, context: VisibilityContext) -> bool {
        match context {
            VisibilityContext::View => self.view,
            VisibilityContext::Add => self.add,
            VisibilityContext::Update => self.update,
        }
    }
}

impl Default for AttributeVisibility {
    fn default() -> Self {
        Self::all()
    }
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Stored value.
    pub value: Value,
    /// Display label.
    pub label: String,
}

impl OptionItem {
    /// Creates an option.
    #[must_use]
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

fn default_value_key() -> String {
    "_id".to_owned()
}

fn default_label_key() -> String {
    "name".to_owned()
}

/// Where a select attribute gets its options from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "apiType")]
pub enum OptionSource {
    /// Options enumerated in the schema.
    #[serde(rename = "STATIC", alias = "static")]
    Static {
        /// Option list.
        options: Vec<OptionItem>,
    },
    /// Options fetched from a backend list endpoint.
    #[serde(rename = "API")]
    Api {
        /// Backend endpoint returning `{ success, data: [...] }`.
        endpoint: String,
        /// Key of the stored value in each fetched item.
        #[serde(rename = "valueKey", default = "default_value_key")]
        value_key: String,
        /// Key of the display label in each fetched item.
        #[serde(rename = "labelKey", default = "default_label_key")]
        label_key: String,
    },
}

impl OptionSource {
    /// Creates a static option source.
    #[must_use]
    pub fn fixed(options: Vec<OptionItem>) -> Self {
        Self::Static { options }
    }

    /// Creates an API option source with default `_id`/`name` keys.
    #[must_use]
    pub fn api(endpoint: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            value_key: default_value_key(),
            label_key: default_label_key(),
        }
    }
}

type RenderFn = dyn Fn(&Value, &Record, &AttributeDescriptor) -> String + Send + Sync;

/// Per-attribute cell render override.
///
/// Receives shared borrows only, so an override cannot mutate the record it renders.
#[derive(Clone)]
pub struct CellRenderer(Arc<RenderFn>);

impl CellRenderer {
    /// Wraps a render function.
    pub fn new(
        render: impl Fn(&Value, &Record, &AttributeDescriptor) -> String + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(render))
    }

    /// Renders one cell.
    #[must_use]
    pub fn render(&self, value: &Value, record: &Record, attribute: &AttributeDescriptor) -> String {
        (self.0)(value, record, attribute)
    }
}

impl Debug for CellRenderer {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("CellRenderer(..)")
    }
}

/// Declarative description of one form field and table column.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    name: NonEmptyString,
    field_type: FieldType,
    label: String,
    required: bool,
    visibility: AttributeVisibility,
    validation: ValidationRule,
    default_value: Option<Value>,
    options: Option<OptionSource>,
    placeholder: Option<String>,
    read_only: bool,
    render: Option<CellRenderer>,
}

impl AttributeDescriptor {
    /// Creates a descriptor visible everywhere, optional, without validation.
    ///
    /// An empty label falls back to the attribute name.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        label: impl Into<String>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)
            .map_err(|_| AppError::Configuration("attribute name must not be empty".to_owned()))?;
        let label = label.into().trim().to_owned();
        let label = if label.is_empty() {
            name.as_str().to_owned()
        } else {
            label
        };

        Ok(Self {
            name,
            field_type,
            label,
            required: false,
            visibility: AttributeVisibility::all(),
            validation: ValidationRule::default(),
            default_value: None,
            options: None,
            placeholder: None,
            read_only: false,
            render: None,
        })
    }

    /// Marks the attribute required on submit.
    pub fn with_required(mut self, required: bool) -> AppResult<Self> {
        if required && self.field_type.is_structural() {
            return Err(self.configuration_error("structural attributes cannot be required"));
        }
        self.required = required;
        Ok(self)
    }

    /// Replaces the visibility flags.
    #[must_use]
    pub fn with_visibility(mut self, visibility: AttributeVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Replaces the validation rule.
    pub fn with_validation(mut self, validation: ValidationRule) -> AppResult<Self> {
        validation.validate_definition(self.name.as_str())?;
        self.validation = validation;
        Ok(self)
    }

    /// Sets the value seeded into create forms.
    pub fn with_default(mut self, default_value: Value) -> AppResult<Self> {
        if self.field_type.is_structural() {
            return Err(self.configuration_error("structural attributes cannot have a default"));
        }
        self.field_type
            .validate_value(&default_value)
            .map_err(|error| self.configuration_error(error.message()))?;
        self.default_value = Some(default_value);
        Ok(self)
    }

    /// Sets the option source of a select attribute.
    pub fn with_options(mut self, options: OptionSource) -> AppResult<Self> {
        if !self.field_type.uses_options() {
            return Err(self.configuration_error("options are only allowed on select types"));
        }
        self.options = Some(options);
        Ok(self)
    }

    /// Sets the input placeholder hint.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        let placeholder = placeholder.into();
        self.placeholder = (!placeholder.trim().is_empty()).then_some(placeholder);
        self
    }

    /// Marks the control read-only in forms.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Attaches a cell render override.
    #[must_use]
    pub fn with_render(mut self, render: CellRenderer) -> Self {
        self.render = Some(render);
        self
    }

    /// Returns the attribute name, unique per schema.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the attribute type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns whether a value must be provided on submit.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns visibility flags.
    #[must_use]
    pub fn visibility(&self) -> AttributeVisibility {
        self.visibility
    }

    /// Returns whether the attribute is shown in a context.
    #[must_use]
    pub fn is_visible_in(&self, context: VisibilityContext) -> bool {
        self.visibility.allows(context)
    }

    /// Returns the validation rule.
    #[must_use]
    pub fn validation(&self) -> &ValidationRule {
        &self.validation
    }

    /// Returns the create-form default.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Returns the option source.
    #[must_use]
    pub fn options(&self) -> Option<&OptionSource> {
        self.options.as_ref()
    }

    /// Returns the placeholder hint.
    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// Returns whether forms show the control read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the render override.
    #[must_use]
    pub fn render(&self) -> Option<&CellRenderer> {
        self.render.as_ref()
    }

    /// Returns whether the attribute carries a value.
    #[must_use]
    pub fn carries_value(&self) -> bool {
        !self.field_type.is_structural()
    }

    /// Validates one value: type shape first, then the validation rule.
    pub fn validate_value(&self, value: &Value) -> AppResult<()> {
        self.field_type.validate_value(value).map_err(|_| {
            AppError::Validation(format!(
                "{} has an unsupported value for type '{}'",
                self.label,
                self.field_type.as_str()
            ))
        })?;
        self.validation.check(self.label.as_str(), value)
    }

    fn configuration_error(&self, message: &str) -> AppError {
        AppError::Configuration(format!("attribute '{}': {message}", self.name.as_str()))
    }
}

/// Wire form of an attribute descriptor, as written in page schema files.
///
/// The type is kept as a string so unknown types surface as a configuration
/// error naming the attribute when the schema is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescriptorInput {
    /// Attribute name.
    pub name: String,
    /// Attribute type spelling.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Required marker.
    #[serde(default)]
    pub required: bool,
    /// Visibility flags.
    #[serde(default)]
    pub visibility: AttributeVisibility,
    /// Validation rule.
    #[serde(default)]
    pub validation: ValidationRule,
    /// Create-form default.
    #[serde(default)]
    pub default: Option<Value>,
    /// Option source for select types.
    #[serde(default)]
    pub options: Option<OptionSource>,
    /// Placeholder hint.
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Read-only marker.
    #[serde(default)]
    pub read_only: bool,
}

impl TryFrom<AttributeDescriptorInput> for AttributeDescriptor {
    type Error = AppError;

    fn try_from(input: AttributeDescriptorInput) -> Result<Self, Self::Error> {
        let field_type = input.field_type.parse::<FieldType>().map_err(|_| {
            AppError::Configuration(format!(
                "attribute '{}' has unknown type '{}'",
                input.name, input.field_type
            ))
        })?;

        let mut descriptor =
            Self::new(input.name, field_type, input.label.unwrap_or_default())?
                .with_required(input.required)?
                .with_visibility(input.visibility)
                .with_validation(input.validation)?
                .with_read_only(input.read_only);

        if let Some(placeholder) = input.placeholder {
            descriptor = descriptor.with_placeholder(placeholder);
        }
        if let Some(default_value) = input.default {
            descriptor = descriptor.with_default(default_value)?;
        }
        match input.options {
            Some(options) => descriptor = descriptor.with_options(options)?,
            None if field_type.uses_options() => {
                return Err(
                    descriptor.configuration_error("select types require an option source")
                );
            }
            None => {}
        }

        Ok(descriptor)
    }
}
