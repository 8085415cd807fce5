//! Typed edit application: the headless half of a field renderer.
//!
//! A host widget reports raw edits; this module normalizes them per the
//! descriptor's type before anything is written into shared form state. The
//! mapping from descriptor type to widget is fixed, and so is the shape of
//! the value each widget may write. Binding never computes validity; error
//! annotations come from the validation engine alone.

use intake_types::{FieldDescriptor, FieldType, FieldValue};

/// A raw edit reported by a host widget.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    /// Text typed into a single- or multi-line input, or the raw contents of
    /// a numeric input before parsing.
    Text(String),
    /// A single choice picked in a select or radio group.
    Choice(String),
    /// A checkbox toggle.
    Toggle(bool),
    /// The full set of chosen values for a multi-select checkbox group, in
    /// the order the user chose them.
    MultiChoice(Vec<String>),
    /// The field was cleared.
    Clear,
}

/// Applies an edit to a descriptor, producing the value to write into form
/// state, or `None` when the edit must not be written at all (non-numeric
/// input in a number field, or an edit shape that does not match the
/// descriptor's widget).
pub fn apply_edit(descriptor: &FieldDescriptor, edit: FieldEdit) -> Option<FieldValue> {
    match (descriptor.field_type, edit) {
        (_, FieldEdit::Clear) => Some(descriptor.default_value()),
        (FieldType::Text | FieldType::Textarea, FieldEdit::Text(text)) => Some(FieldValue::Text(text)),
        (FieldType::Number, FieldEdit::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Some(FieldValue::Empty);
            }
            // Non-numeric input is not written into state.
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite()).map(FieldValue::Number)
        }
        (FieldType::Select | FieldType::Radio, FieldEdit::Choice(value)) => {
            if descriptor.has_option(&value) {
                Some(FieldValue::Text(value))
            } else {
                // Undeclared values are treated as unset, not as an error.
                Some(FieldValue::Empty)
            }
        }
        (FieldType::Checkbox, FieldEdit::Toggle(flag)) if descriptor.options.is_empty() => Some(FieldValue::Bool(flag)),
        (FieldType::Checkbox, FieldEdit::MultiChoice(values)) if !descriptor.options.is_empty() => {
            let declared: Vec<String> = values.into_iter().filter(|value| descriptor.has_option(value)).collect();
            Some(FieldValue::Selection(declared))
        }
        _ => None,
    }
}

const UNSET: &FieldValue = &FieldValue::Empty;

/// Normalizes a stored value for reading: a single-choice field holding a
/// value no longer among its declared options reads as unset. Dynamic flows
/// can shrink an option list after a value was stored, so this is applied on
/// every read rather than only at write time.
pub fn normalize<'a>(descriptor: &FieldDescriptor, value: &'a FieldValue) -> &'a FieldValue {
    if descriptor.is_choice()
        && let FieldValue::Text(text) = value
        && !descriptor.has_option(text)
    {
        return UNSET;
    }
    value
}
