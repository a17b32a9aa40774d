use std::collections::HashMap;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::{AttributeDescriptor, AttributeSchema, FieldType, OptionItem, OptionSource};
use serde_json::Value;
use tracing::warn;

use crate::form_orchestrator::FormState;

mod cells;
mod input;
mod options;


pub use cells::format_cell;
pub use input::{FieldInput, parse_input};
pub use options::{OptionsCatalog, OptionsResolver, UNAVAILABLE_OPTIONS_MESSAGE};

/// Availability of a select attribute's options.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsState {
    /// Options known.
    Ready(Vec<OptionItem>),
    /// Fetch not resolved yet.
    Loading,
    /// Fetch failed; the control shows the message inline.
    Unavailable {
        /// Inline message.
        message: String,
    },
}

impl OptionsState {
    /// Returns options when ready.
    #[must_use]
    pub fn items(&self) -> Option<&[OptionItem]> {
        match self {
            Self::Ready(items) => Some(items.as_slice()),
            Self::Loading | Self::Unavailable { .. } => None,
        }
    }

    /// Returns the label of the option stored as `value`.
    #[must_use]
    pub fn label_for(&self, value: &Value) -> Option<&str> {
        self.items()?
            .iter()
            .find(|item| option_value_matches(&item.value, value))
            .map(|item| item.label.as_str())
    }
}

/// Compares option values loosely so `"3"` and `3` select the same option.
pub(crate) fn option_value_matches(option_value: &Value, value: &Value) -> bool {
    option_value == value || value_key(option_value) == value_key(value)
}

pub(crate) fn value_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// UI control produced for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Single-line text input.
    TextInput,
    /// Numeric input.
    NumberInput,
    /// Multi-line text input.
    TextArea,
    /// Single-choice dropdown.
    Select {
        /// Option availability.
        options: OptionsState,
    },
    /// Multi-choice dropdown.
    MultiSelect {
        /// Option availability.
        options: OptionsState,
    },
    /// Date picker.
    DatePicker,
    /// Date and time picker.
    DateTimePicker,
    /// On/off switch.
    Toggle {
        /// Current state.
        on: bool,
    },
    /// Checkbox.
    Checkbox {
        /// Current state.
        checked: bool,
    },
    /// Image upload showing the stored reference.
    ImageUpload {
        /// Storage reference of the current image.
        reference: Option<String>,
    },
    /// Value carried without a visible control.
    Hidden,
    /// Section heading.
    SectionTitle,
    /// Section divider.
    Divider,
    /// Inline stand-in for a field that failed to render.
    Placeholder {
        /// Reason shown to the user.
        message: String,
    },
}

/// Inputs a renderer function sees.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// Attribute being rendered.
    pub attribute: &'a AttributeDescriptor,
    /// Current value, `null` when unset.
    pub value: &'a Value,
    /// Resolved options for select types.
    pub options: Option<&'a OptionsState>,
}

impl FieldContext<'_> {
    fn resolved_options(&self) -> OptionsState {
        if let Some(options) = self.options {
            return options.clone();
        }

        match self.attribute.options() {
            Some(OptionSource::Static { options }) => OptionsState::Ready(options.clone()),
            Some(OptionSource::Api { .. }) => OptionsState::Loading,
            None => OptionsState::Ready(Vec::new()),
        }
    }
}

/// Renderer function registered for one field type.
pub type RenderFieldFn = fn(&FieldContext<'_>) -> AppResult<Control>;

/// Form field ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField {
    /// Attribute name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Control to draw.
    pub control: Control,
    /// Current value.
    pub value: Value,
    /// Validation message for the field.
    pub error: Option<String>,
    /// Required marker.
    pub required: bool,
    /// Read-only marker.
    pub read_only: bool,
    /// Placeholder hint.
    pub placeholder: Option<String>,
}

/// Registry dispatching field types to renderer functions.
#[derive(Debug, Clone)]
pub struct FieldRendererRegistry {
    renderers: HashMap<FieldType, RenderFieldFn>,
}

impl FieldRendererRegistry {
    /// Creates a registry with no renderers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Creates a registry covering every built-in field type.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(FieldType::Text, |_| Ok(Control::TextInput));
        registry.register(FieldType::Number, |_| Ok(Control::NumberInput));
        registry.register(FieldType::Textarea, |_| Ok(Control::TextArea));
        registry.register(FieldType::Date, |_| Ok(Control::DatePicker));
        registry.register(FieldType::DateTime, |_| Ok(Control::DateTimePicker));
        registry.register(FieldType::Hidden, |_| Ok(Control::Hidden));
        registry.register(FieldType::Title, |_| Ok(Control::SectionTitle));
        registry.register(FieldType::Line, |_| Ok(Control::Divider));
        registry.register(FieldType::Select, render_select);
        registry.register(FieldType::MultiSelect, render_multi_select);
        registry.register(FieldType::Toggle, |context| {
            Ok(Control::Toggle {
                on: context.value.as_bool().unwrap_or(false),
            })
        });
        registry.register(FieldType::Checkbox, |context| {
            Ok(Control::Checkbox {
                checked: context.value.as_bool().unwrap_or(false),
            })
        });
        registry.register(FieldType::Image, |context| {
            Ok(Control::ImageUpload {
                reference: context
                    .value
                    .as_str()
                    .filter(|reference| !reference.trim().is_empty())
                    .map(str::to_owned),
            })
        });
        registry
    }

    /// Registers a renderer, returning the one it replaces.
    pub fn register(
        &mut self,
        field_type: FieldType,
        renderer: RenderFieldFn,
    ) -> Option<RenderFieldFn> {
        self.renderers.insert(field_type, renderer)
    }

    /// Removes the renderer of a field type.
    pub fn unregister(&mut self, field_type: FieldType) -> Option<RenderFieldFn> {
        self.renderers.remove(&field_type)
    }

    /// Returns whether a field type has a renderer.
    #[must_use]
    pub fn supports(&self, field_type: FieldType) -> bool {
        self.renderers.contains_key(&field_type)
    }

    /// Fails on the first attribute whose type has no renderer.
    pub fn validate_schema(&self, schema: &AttributeSchema) -> AppResult<()> {
        match schema
            .iter()
            .find(|attribute| !self.supports(attribute.field_type()))
        {
            Some(attribute) => Err(unsupported(attribute)),
            None => Ok(()),
        }
    }

    /// Renders one attribute.
    pub fn render_field(
        &self,
        attribute: &AttributeDescriptor,
        value: &Value,
        error: Option<&str>,
        options: Option<&OptionsState>,
    ) -> AppResult<RenderedField> {
        let renderer = self
            .renderers
            .get(&attribute.field_type())
            .ok_or_else(|| unsupported(attribute))?;

        let control = renderer(&FieldContext {
            attribute,
            value,
            options,
        })?;

        Ok(RenderedField {
            name: attribute.name().to_owned(),
            label: attribute.label().to_owned(),
            control,
            value: value.clone(),
            error: error.map(str::to_owned),
            required: attribute.is_required(),
            read_only: attribute.is_read_only(),
            placeholder: attribute.placeholder().map(str::to_owned),
        })
    }

    /// Renders every attribute visible in the form's mode, in schema order.
    ///
    /// A field that fails to render is logged and replaced by a placeholder.
    #[must_use]
    pub fn render_form(
        &self,
        schema: &AttributeSchema,
        state: &FormState,
        catalog: &OptionsCatalog,
    ) -> Vec<RenderedField> {
        schema
            .visible_in(state.mode().context())
            .map(|attribute| {
                let value = state.values().value_or_null(attribute.name());
                let error = state.error(attribute.name());
                self.render_field(attribute, value, error, catalog.get(attribute.name()))
                    .unwrap_or_else(|error| {
                        warn!(
                            attribute = %attribute.name(),
                            field_type = %attribute.field_type().as_str(),
                            error = %error,
                            "field render failed; showing placeholder"
                        );
                        RenderedField {
                            name: attribute.name().to_owned(),
                            label: attribute.label().to_owned(),
                            control: Control::Placeholder {
                                message: format!("{} cannot be displayed", attribute.label()),
                            },
                            value: value.clone(),
                            error: None,
                            required: attribute.is_required(),
                            read_only: true,
                            placeholder: None,
                        }
                    })
            })
            .collect()
    }
}

impl Default for FieldRendererRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn unsupported(attribute: &AttributeDescriptor) -> AppError {
    AppError::Configuration(format!(
        "attribute '{}' uses field type '{}' which has no renderer",
        attribute.name(),
        attribute.field_type().as_str()
    ))
}

fn render_select(context: &FieldContext<'_>) -> AppResult<Control> {
    Ok(Control::Select {
        options: context.resolved_options(),
    })
}

fn render_multi_select(context: &FieldContext<'_>) -> AppResult<Control> {
    if !context.value.is_null() && !context.value.is_array() {
        return Err(AppError::Configuration(format!(
            "multi-select attribute '{}' holds a non-list value",
            context.attribute.name()
        )));
    }

    Ok(Control::MultiSelect {
        options: context.resolved_options(),
    })
}
