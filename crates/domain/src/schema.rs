use std::collections::HashSet;

use admindeck_core::{AppError, AppResult};

use crate::attribute::{AttributeDescriptor, AttributeDescriptorInput, CellRenderer, VisibilityContext};

/// Ordered, immutable attribute list configuring one page.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    attributes: Vec<AttributeDescriptor>,
}

impl AttributeSchema {
    /// Creates a schema, rejecting duplicate attribute names.
    pub fn new(attributes: Vec<AttributeDescriptor>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for attribute in &attributes {
            if !seen.insert(attribute.name()) {
                return Err(AppError::Configuration(format!(
                    "duplicate attribute name '{}' in schema",
                    attribute.name()
                )));
            }
        }

        Ok(Self { attributes })
    }

    /// Converts wire descriptors into a schema.
    pub fn from_inputs(inputs: Vec<AttributeDescriptorInput>) -> AppResult<Self> {
        let attributes = inputs
            .into_iter()
            .map(AttributeDescriptor::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Self::new(attributes)
    }

    /// Parses a JSON array of wire descriptors.
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let inputs: Vec<AttributeDescriptorInput> = serde_json::from_str(json).map_err(|error| {
            AppError::Configuration(format!("invalid attribute schema JSON: {error}"))
        })?;
        Self::from_inputs(inputs)
    }

    /// Returns a schema whose `name` attribute renders cells through `render`.
    pub fn with_render(mut self, name: &str, render: CellRenderer) -> AppResult<Self> {
        let position = self
            .attributes
            .iter()
            .position(|attribute| attribute.name() == name)
            .ok_or_else(|| {
                AppError::Configuration(format!("cannot attach renderer to unknown attribute '{name}'"))
            })?;
        let attribute = self.attributes.remove(position).with_render(render);
        self.attributes.insert(position, attribute);
        Ok(self)
    }

    /// Iterates all attributes in declaration order, structural ones included.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter()
    }

    /// Iterates attributes that carry a value.
    pub fn value_attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes
            .iter()
            .filter(|attribute| attribute.carries_value())
    }

    /// Iterates attributes shown in a context, structural ones included.
    pub fn visible_in(
        &self,
        context: VisibilityContext,
    ) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes
            .iter()
            .filter(move |attribute| attribute.is_visible_in(context))
    }

    /// Iterates value-carrying attributes submitted in a context.
    pub fn submitted_in(
        &self,
        context: VisibilityContext,
    ) -> impl Iterator<Item = &AttributeDescriptor> {
        self.visible_in(context)
            .filter(|attribute| attribute.carries_value())
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name() == name)
    }

    /// Returns the attribute count, structural ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns whether the schema declares no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
