use std::str::FromStr;

use admindeck_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::is_empty_value;

/// Named value formats a text attribute may be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPattern {
    /// `local@domain.tld` address.
    Email,
    /// Absolute `http`/`https` URL.
    Url,
    /// Digits with an optional leading `+` and spaces or dashes between groups.
    Phone,
    /// ASCII digits only.
    Digits,
    /// Lowercase ASCII letters, digits, and single dashes.
    Slug,
}

impl FieldPattern {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Phone => "phone",
            Self::Digits => "digits",
            Self::Slug => "slug",
        }
    }

    /// Returns whether the text satisfies the format.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Email => matches_email(text),
            Self::Url => matches_url(text),
            Self::Phone => matches_phone(text),
            Self::Digits => !text.is_empty() && text.chars().all(|ch| ch.is_ascii_digit()),
            Self::Slug => matches_slug(text),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Email => "a valid email address",
            Self::Url => "a valid http or https URL",
            Self::Phone => "a valid phone number",
            Self::Digits => "digits only",
            Self::Slug => "lowercase letters, digits, and dashes",
        }
    }
}

impl FromStr for FieldPattern {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email" => Ok(Self::Email),
            "url" => Ok(Self::Url),
            "phone" => Ok(Self::Phone),
            "digits" => Ok(Self::Digits),
            "slug" => Ok(Self::Slug),
            _ => Err(AppError::Configuration(format!(
                "unknown validation pattern '{value}'"
            ))),
        }
    }
}

fn matches_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !text.chars().any(char::is_whitespace)
        && text.len() <= 254
}

fn matches_url(text: &str) -> bool {
    let rest = text
        .strip_prefix("https://")
        .or_else(|| text.strip_prefix("http://"));

    rest.is_some_and(|rest| {
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        !host.is_empty() && !rest.chars().any(char::is_whitespace)
    })
}

fn matches_phone(text: &str) -> bool {
    let body = text.strip_prefix('+').unwrap_or(text);
    let digit_count = body.chars().filter(char::is_ascii_digit).count();

    (6..=15).contains(&digit_count)
        && body
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch == ' ' || ch == '-')
        && body.starts_with(|ch: char| ch.is_ascii_digit())
}

fn matches_slug(text: &str) -> bool {
    !text.is_empty()
        && !text.starts_with('-')
        && !text.ends_with('-')
        && !text.contains("--")
        && text
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Client-side validation rule attached to an attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRule {
    /// Rejects empty values even when the attribute is not `required`.
    pub non_empty: bool,
    /// Minimum length in characters (or items, for lists).
    pub min_length: Option<usize>,
    /// Maximum length in characters (or items, for lists).
    pub max_length: Option<usize>,
    /// Named format the text value must satisfy.
    pub pattern: Option<FieldPattern>,
}

impl ValidationRule {
    /// Returns a rule that only requires a non-empty value.
    #[must_use]
    pub fn non_empty() -> Self {
        Self {
            non_empty: true,
            ..Self::default()
        }
    }

    /// Returns a copy with a length range.
    #[must_use]
    pub fn with_length(mut self, min_length: Option<usize>, max_length: Option<usize>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Returns a copy with a named pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: FieldPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Returns whether the rule has no constraint at all.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self == &Self::default()
    }

    /// Checks the rule definition itself.
    pub fn validate_definition(&self, attribute_name: &str) -> AppResult<()> {
        if let (Some(min_length), Some(max_length)) = (self.min_length, self.max_length)
            && min_length > max_length
        {
            return Err(AppError::Configuration(format!(
                "attribute '{attribute_name}' has minLength {min_length} greater than maxLength {max_length}"
            )));
        }

        Ok(())
    }

    /// Validates one value, naming the field by `label` in the error message.
    ///
    /// Empty values only fail when `non_empty` is set; presence of required
    /// values is checked by the caller.
    pub fn check(&self, label: &str, value: &Value) -> AppResult<()> {
        if is_empty_value(value) {
            if self.non_empty {
                return Err(AppError::Validation(format!("{label} must not be empty")));
            }
            return Ok(());
        }

        if let Some(length) = measured_length(value) {
            if let Some(min_length) = self.min_length
                && length < min_length
            {
                return Err(AppError::Validation(format!(
                    "{label} must be at least {min_length} characters"
                )));
            }

            if let Some(max_length) = self.max_length
                && length > max_length
            {
                return Err(AppError::Validation(format!(
                    "{label} must be at most {max_length} characters"
                )));
            }
        }

        if let Some(pattern) = self.pattern {
            let matches = value
                .as_str()
                .map(|text| pattern.matches(text.trim()))
                .unwrap_or(false);
            if !matches {
                return Err(AppError::Validation(format!(
                    "{label} must be {}",
                    pattern.describe()
                )));
            }
        }

        Ok(())
    }
}

fn measured_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}
