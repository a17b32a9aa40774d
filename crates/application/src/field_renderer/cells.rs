use admindeck_domain::{AttributeDescriptor, FieldType, OptionSource, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::{OptionsState, option_value_matches};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATETIME_LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Formats one table cell.
///
/// A render override on the attribute wins over the built-in formatting.
#[must_use]
pub fn format_cell(
    attribute: &AttributeDescriptor,
    record: &Record,
    options: Option<&OptionsState>,
) -> String {
    let value = record.value_or_null(attribute.name());
    if let Some(render) = attribute.render() {
        return render.render(value, record, attribute);
    }

    if value.is_null() {
        return String::new();
    }

    match attribute.field_type() {
        FieldType::Toggle | FieldType::Checkbox => match value.as_bool() {
            Some(true) => "Yes".to_owned(),
            Some(false) => "No".to_owned(),
            None => plain(value),
        },
        FieldType::Select => option_label(attribute, options, value),
        FieldType::MultiSelect => match value.as_array() {
            Some(items) => items
                .iter()
                .map(|item| option_label(attribute, options, item))
                .collect::<Vec<_>>()
                .join(", "),
            None => plain(value),
        },
        FieldType::Date => value
            .as_str()
            .and_then(parse_date)
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| plain(value)),
        FieldType::DateTime => value
            .as_str()
            .and_then(parse_datetime)
            .map(|moment| moment.format(DATETIME_DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|| plain(value)),
        FieldType::Title | FieldType::Line => String::new(),
        FieldType::Text
        | FieldType::Number
        | FieldType::Textarea
        | FieldType::Image
        | FieldType::Hidden => plain(value),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn option_label(
    attribute: &AttributeDescriptor,
    options: Option<&OptionsState>,
    value: &Value,
) -> String {
    if let Some(label) = options.and_then(|options| options.label_for(value)) {
        return label.to_owned();
    }

    if let Some(OptionSource::Static { options }) = attribute.options()
        && let Some(item) = options
            .iter()
            .find(|item| option_value_matches(&item.value, value))
    {
        return item.label.clone();
    }

    plain(value)
}

/// Parses `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(text).map(|moment| moment.date()))
}

/// Parses RFC 3339 (normalised to UTC) or a `datetime-local` style timestamp.
pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.with_timezone(&Utc).naive_utc());
    }

    DATETIME_LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}
