//! Schema types describing the provider, resource, and data source structure.
//!
//! Schemas describe the shape of configuration the provider accepts. They
//! drive validation and give the host enough information to render plans and
//! documentation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 32-bit integer.
    Int32,
    /// A 64-bit integer.
    Int64,
    /// A 64-bit floating point number.
    Float64,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(HashMap<String, Attribute>),
    /// A dynamic value; the m3ter custom-fields attribute uses this.
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(value_type: AttributeType) -> Self {
        Self::Map(Box::new(value_type))
    }

    /// Create an object type from named attributes.
    pub fn object(attributes: impl IntoIterator<Item = (&'static str, Attribute)>) -> Self {
        Self::Object(
            attributes
                .into_iter()
                .map(|(name, attr)| (name.to_string(), attr))
                .collect(),
        )
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute must be set in configuration.
    pub required: bool,
    /// The attribute may be set in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider.
    pub computed: bool,
    /// The attribute is sensitive and must be hidden in logs/UI.
    pub sensitive: bool,
}

/// A value constraint attached to an attribute.
///
/// Constraints are enforced by [`crate::validation::validate`] before any
/// HTTP call is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// String length must be within the inclusive range.
    LengthBetween(usize, usize),
    /// String length must be at least the given value.
    LengthAtLeast(usize),
    /// String length must be at most the given value.
    LengthAtMost(usize),
    /// The string must be one of the listed values.
    OneOf(Vec<String>),
    /// The string must match the regex; the message explains the rule.
    Matches {
        /// The regular expression the value must match.
        pattern: String,
        /// Human-readable description of the rule.
        message: String,
    },
    /// The number must be one of the listed values.
    NumberOneOf(Vec<f64>),
    /// Every string element of the list must be one of the listed values.
    ElementsOneOf(Vec<String>),
    /// The number must be at least the given value.
    AtLeast(f64),
    /// List length must be within the inclusive range.
    SizeBetween(usize, usize),
    /// List length must be at most the given value.
    SizeAtMost(usize),
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// If set, changing this attribute forces entity replacement.
    #[serde(default)]
    pub force_new: bool,
    /// Value constraints enforced during validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl Attribute {
    fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            constraints: Vec::new(),
        }
    }

    /// Create a required attribute of the given type.
    pub fn required(attr_type: AttributeType) -> Self {
        Self::new(
            attr_type,
            AttributeFlags {
                required: true,
                ..Default::default()
            },
        )
    }

    /// Create an optional attribute of the given type.
    pub fn optional(attr_type: AttributeType) -> Self {
        Self::new(
            attr_type,
            AttributeFlags {
                optional: true,
                ..Default::default()
            },
        )
    }

    /// Create a computed attribute of the given type.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self::new(
            attr_type,
            AttributeFlags {
                computed: true,
                ..Default::default()
            },
        )
    }

    /// Create an optional attribute that has a server-side default.
    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Self::new(
            attr_type,
            AttributeFlags {
                optional: true,
                computed: true,
                ..Default::default()
            },
        )
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the attribute as forcing entity replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Attach a value constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Schema for a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The attributes of the schema.
    #[serde(default)]
    pub attributes: HashMap<String, Attribute>,
}

impl Schema {
    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }
}

/// Schema for the whole provider: its own configuration plus every
/// registered resource and data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for the provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Schemas for each data source type.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that does not prevent the operation.
    Warning,
}

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// An accumulating sink of diagnostics, shared by the mapper and the
/// per-entity read/write callbacks.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Append an error with a summary and detail.
    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.entries
            .push(Diagnostic::error(summary).with_detail(detail));
    }

    /// Whether any error diagnostics were recorded.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// The recorded diagnostics.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Consume the sink, returning the diagnostics.
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Join all error summaries into a single message.
    pub fn error_summary(&self) -> String {
        self.entries
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .map(|d| match &d.detail {
                Some(detail) => format!("{}: {}", d.summary, detail),
                None => d.summary.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
