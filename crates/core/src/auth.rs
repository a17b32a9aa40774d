use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AppResult, NonEmptyString};

/// Signed-in operator held by the application context for the session lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    subject: NonEmptyString,
    display_name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    roles: BTreeSet<String>,
}

impl UserIdentity {
    /// Creates an identity from the provider's subject claim.
    pub fn new(subject: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            subject: NonEmptyString::new(subject)?,
            display_name: None,
            email: None,
            roles: BTreeSet::new(),
        })
    }

    /// Sets the display name; blank names are ignored.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = non_blank(display_name.into());
        self
    }

    /// Sets the email; blank values are ignored.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_blank(email.into());
        self
    }

    /// Grants roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().filter_map(|role| non_blank(role.into())));
        self
    }

    /// Returns the provider subject claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Name shown in the menu header: display name, then email, then subject.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(self.subject.as_str())
    }

    /// Returns whether the operator holds a role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}
