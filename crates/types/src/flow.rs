//! Strongly typed flow schema definitions shared across the engine and hosts.
//!
//! A flow is an ordered set of steps, each carrying the field descriptors a
//! host renders for that screen. Everything here is declarative: descriptors
//! describe a question (type, label, constraints) and attach no behavior.
//! Authoring order is preserved so hosts render fields and steps in a
//! predictable sequence.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod validation;

/// Fixed mapping from descriptor type to the widget a host renders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Single-line text input.
    Text,
    /// Multi-line text input.
    Textarea,
    /// Numeric input; non-numeric edits are never written into state.
    Number,
    /// Single choice from declared options, rendered as a dropdown.
    Select,
    /// Single choice from declared options, rendered as radio buttons.
    Radio,
    /// Boolean toggle, or a multi-select when options are declared.
    Checkbox,
    /// File selection gated by an upload constraint.
    File,
}

/// One selectable choice for `select`, `radio`, and multi-`checkbox` fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldOption {
    /// Value written into form state when chosen. Unique within a field.
    pub value: String,
    /// Optional display label; falls back to the value when absent.
    #[serde(default)]
    pub label: Option<String>,
}

impl FieldOption {
    /// Returns the text a host should display for this option.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// Declarative format rules applied to a non-empty value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldRules {
    /// Minimum numeric value, inclusive.
    #[serde(default)]
    pub min: Option<f64>,
    /// Maximum numeric value, inclusive.
    #[serde(default)]
    pub max: Option<f64>,
    /// Regular expression the full text value must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Custom message overriding the generated one on any rule failure.
    #[serde(default)]
    pub message: Option<String>,
}

impl FieldRules {
    fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.pattern.is_none()
    }
}

/// Count, size, and type limits for a file field. Fixed per descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadConstraint {
    /// Hard cap on the number of selected files.
    pub max_files: usize,
    /// Per-file size limit in bytes.
    pub max_size_bytes: u64,
    /// Accepted MIME types (`image/*`, `application/pdf`) or extension
    /// globs (`*.jpg`, `.pdf`). Empty means every type is accepted.
    #[serde(default)]
    pub accepted: Vec<String>,
}

/// Declarative description of one form question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Identifier used as the form-state key. Unique within a step.
    pub id: String,
    /// Widget type the host renders for this field.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Label displayed alongside the widget.
    #[serde(default)]
    pub label: String,
    /// Whether an empty value blocks forward navigation.
    #[serde(default)]
    pub required: bool,
    /// Placeholder text rendered while the field is empty.
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Declared choices for `select`, `radio`, and multi-`checkbox` fields.
    #[serde(default)]
    pub options: Vec<FieldOption>,
    /// Format rules evaluated once the field is non-empty.
    #[serde(default)]
    pub rules: Option<FieldRules>,
    /// Upload limits; present exactly when `field_type` is `file`.
    #[serde(default)]
    pub upload: Option<UploadConstraint>,
}

impl FieldDescriptor {
    /// Returns true for single-choice fields whose value must be a declared option.
    pub fn is_choice(&self) -> bool {
        matches!(self.field_type, FieldType::Select | FieldType::Radio)
    }

    /// Returns true when this checkbox field collects multiple declared options.
    pub fn is_multi_checkbox(&self) -> bool {
        matches!(self.field_type, FieldType::Checkbox) && !self.options.is_empty()
    }

    /// Returns true when `value` is one of the declared option values.
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    /// Default form-state value for a field the user has not touched yet.
    pub fn default_value(&self) -> FieldValue {
        match self.field_type {
            FieldType::Checkbox if self.options.is_empty() => FieldValue::Bool(false),
            FieldType::Checkbox => FieldValue::Selection(Vec::new()),
            FieldType::File => FieldValue::Files(Vec::new()),
            _ => FieldValue::Empty,
        }
    }
}

/// One screen's worth of descriptors, navigable as a unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDefinition {
    /// Unique step identifier.
    pub id: String,
    /// Optional heading displayed above the step.
    #[serde(default)]
    pub title: Option<String>,
    /// Ordered descriptors rendered for this step. May be empty for purely
    /// informational screens.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Marks the post-submission confirmation step; it has no further "next".
    #[serde(default)]
    pub terminal: bool,
}

/// Top-level flow document supplied by the schema provider at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowDefinition {
    /// Canonical flow identifier (for example, `contact`).
    #[serde(default)]
    pub flow: String,
    /// Optional human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Optional descriptive copy shown by the host.
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered steps the user walks through.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl FlowDefinition {
    /// Iterates every descriptor across all steps in authoring order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }
}

/// A file picked by the user. The `handle` is an opaque token owned by the
/// host's file-picker subsystem; the engine only holds the reference and
/// drops it on removal or teardown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name as reported by the picker.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type when the picker reports one.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Opaque host-owned handle used when attaching the file at submission.
    pub handle: String,
}

/// Runtime value held in form state for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text, select, and radio values.
    Text(String),
    /// Parsed numeric value.
    Number(f64),
    /// Checkbox toggle value.
    Bool(bool),
    /// Chosen option values for multi-select checkboxes, in choice order.
    Selection(Vec<String>),
    /// Accepted files for a file field, in acceptance order.
    Files(Vec<SelectedFile>),
    /// No value entered yet.
    Empty,
}

impl FieldValue {
    /// Returns true when the field counts as empty for required checks:
    /// blank after trimming for text, no value for numbers, zero chosen
    /// options or files for the collection variants.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
            FieldValue::Selection(values) => values.is_empty(),
            FieldValue::Files(files) => files.is_empty(),
            FieldValue::Empty => true,
        }
    }

    /// Returns the text content for `Text` values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the selected files for `Files` values, empty otherwise.
    pub fn files(&self) -> &[SelectedFile] {
        match self {
            FieldValue::Files(files) => files,
            _ => &[],
        }
    }

    /// Serializes the value into the JSON submission payload shape. Files
    /// become objects carrying name, size, and the raw handle; everything
    /// else serializes as its raw value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Text(text) => JsonValue::String(text.clone()),
            FieldValue::Number(number) => serde_json::Number::from_f64(*number)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Bool(flag) => JsonValue::Bool(*flag),
            FieldValue::Selection(values) => {
                JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect())
            }
            FieldValue::Files(files) => JsonValue::Array(
                files
                    .iter()
                    .map(|file| serde_json::to_value(file).unwrap_or(JsonValue::Null))
                    .collect(),
            ),
            FieldValue::Empty => JsonValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_basic_flow() {
        let yaml_text = r#"
flow: contact
steps:
  - id: about_you
    fields:
      - id: name
        type: text
        label: Your name
        required: true
  - id: done
    terminal: true
"#;

        let definition: FlowDefinition = serde_yaml::from_str(yaml_text).expect("deserialize flow");

        assert_eq!(definition.flow, "contact");
        assert_eq!(definition.steps.len(), 2);
        assert_eq!(definition.steps[0].fields[0].id, "name");
        assert!(definition.steps[0].fields[0].required);
        assert!(definition.steps[1].terminal);
        assert!(definition.steps[1].fields.is_empty());
    }

    #[test]
    fn repository_sample_flow_parses() {
        let yaml_text = include_str!("../../../flows/contact.yaml");
        let definition: FlowDefinition = serde_yaml::from_str(yaml_text).expect("parse sample flow");
        assert_eq!(definition.flow, "contact");
        assert!(definition.steps.iter().any(|step| step.terminal));
        assert!(definition.descriptors().any(|descriptor| descriptor.id == "email"));
    }

    #[test]
    fn default_values_follow_field_type() {
        let mut descriptor = FieldDescriptor {
            id: "updates".into(),
            field_type: FieldType::Checkbox,
            label: "Updates".into(),
            required: false,
            placeholder: None,
            options: Vec::new(),
            rules: None,
            upload: None,
        };
        assert_eq!(descriptor.default_value(), FieldValue::Bool(false));

        descriptor.options = vec![FieldOption {
            value: "email".into(),
            label: None,
        }];
        assert_eq!(descriptor.default_value(), FieldValue::Selection(Vec::new()));

        descriptor.field_type = FieldType::File;
        descriptor.options.clear();
        assert_eq!(descriptor.default_value(), FieldValue::Files(Vec::new()));

        descriptor.field_type = FieldType::Text;
        assert_eq!(descriptor.default_value(), FieldValue::Empty);
    }

    #[test]
    fn emptiness_trims_whitespace() {
        assert!(FieldValue::Text("   ".into()).is_empty());
        assert!(!FieldValue::Text(" x ".into()).is_empty());
        assert!(FieldValue::Empty.is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
        assert!(!FieldValue::Bool(false).is_empty());
        assert!(FieldValue::Files(Vec::new()).is_empty());
    }

    #[test]
    fn files_serialize_with_handles() {
        let value = FieldValue::Files(vec![SelectedFile {
            name: "site.jpg".into(),
            size_bytes: 2048,
            media_type: Some("image/jpeg".into()),
            handle: "picker-17".into(),
        }]);

        let json = value.to_json();
        let entries = json.as_array().expect("array payload");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["name"], "site.jpg");
        assert_eq!(entries[0]["size_bytes"], 2048);
        assert_eq!(entries[0]["handle"], "picker-17");
    }
}
