use admindeck_core::{AppError, AppResult};
use admindeck_domain::{AttributeDescriptor, FieldType};
use serde_json::{Number, Value};

use super::cells::{parse_date, parse_datetime};
use super::{OptionsState, option_value_matches};

/// Raw value a control reports on change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    /// Typed or picked text.
    Text(String),
    /// Switch or checkbox state.
    Flag(bool),
    /// Picked option values of a multi-select.
    Choices(Vec<String>),
    /// Control cleared.
    Clear,
}

/// Converts control input into the JSON value stored for the attribute.
///
/// Select inputs are mapped back to the option's stored value when the
/// options are known, so numeric option values survive the round trip.
pub fn parse_input(
    attribute: &AttributeDescriptor,
    input: FieldInput,
    options: Option<&OptionsState>,
) -> AppResult<Value> {
    if attribute.field_type().is_structural() {
        return Err(AppError::Configuration(format!(
            "attribute '{}' is structural and carries no value",
            attribute.name()
        )));
    }

    let input = match input {
        FieldInput::Clear => return Ok(Value::Null),
        FieldInput::Text(text) if text.trim().is_empty() && !is_free_text(attribute) => {
            return Ok(Value::Null);
        }
        other => other,
    };

    match (attribute.field_type(), input) {
        (
            FieldType::Text | FieldType::Textarea | FieldType::Hidden | FieldType::Image,
            FieldInput::Text(text),
        ) => Ok(Value::String(text)),
        (FieldType::Number, FieldInput::Text(text)) => parse_number(attribute, text.trim()),
        (FieldType::Date, FieldInput::Text(text)) => match parse_date(&text) {
            Some(date) => Ok(Value::String(date.format("%Y-%m-%d").to_string())),
            None => Err(invalid(attribute, "must be a date (YYYY-MM-DD)")),
        },
        (FieldType::DateTime, FieldInput::Text(text)) => match parse_datetime(&text) {
            Some(_) => Ok(Value::String(text.trim().to_owned())),
            None => Err(invalid(attribute, "must be a date and time")),
        },
        (FieldType::Toggle | FieldType::Checkbox, FieldInput::Flag(flag)) => Ok(Value::Bool(flag)),
        (FieldType::Toggle | FieldType::Checkbox, FieldInput::Text(text)) => {
            match text.trim() {
                "true" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid(attribute, "must be on or off")),
            }
        }
        (FieldType::Select, FieldInput::Text(text)) => Ok(select_value(options, text)),
        (FieldType::MultiSelect, FieldInput::Choices(choices)) => Ok(Value::Array(
            choices
                .into_iter()
                .map(|choice| select_value(options, choice))
                .collect(),
        )),
        (FieldType::MultiSelect, FieldInput::Text(text)) => {
            Ok(Value::Array(vec![select_value(options, text)]))
        }
        (field_type, input) => Err(AppError::Validation(format!(
            "{} cannot accept {} input for type '{}'",
            attribute.label(),
            input_kind(&input),
            field_type.as_str()
        ))),
    }
}

fn is_free_text(attribute: &AttributeDescriptor) -> bool {
    matches!(
        attribute.field_type(),
        FieldType::Text | FieldType::Textarea | FieldType::Hidden
    )
}

fn parse_number(attribute: &AttributeDescriptor, text: &str) -> AppResult<Value> {
    if let Ok(integer) = text.parse::<i64>() {
        return Ok(Value::Number(integer.into()));
    }

    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| invalid(attribute, "must be a number"))
}

fn select_value(options: Option<&OptionsState>, text: String) -> Value {
    let candidate = Value::String(text);
    options
        .and_then(OptionsState::items)
        .and_then(|items| {
            items
                .iter()
                .find(|item| option_value_matches(&item.value, &candidate))
        })
        .map(|item| item.value.clone())
        .unwrap_or(candidate)
}

fn invalid(attribute: &AttributeDescriptor, reason: &str) -> AppError {
    AppError::Validation(format!("{} {reason}", attribute.label()))
}

fn input_kind(input: &FieldInput) -> &'static str {
    match input {
        FieldInput::Text(_) => "text",
        FieldInput::Flag(_) => "on/off",
        FieldInput::Choices(_) => "multiple-choice",
        FieldInput::Clear => "empty",
    }
}
