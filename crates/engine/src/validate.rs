//! Per-field and per-step validation.
//!
//! Validation is step-local: advancing past a step only requires that step's
//! fields to be valid, and fields in steps not yet visited are never
//! consulted. A blocked step is a normal control-flow outcome surfaced as an
//! error map; nothing here returns an `Err`. Which fields are required is
//! driven entirely by the schema's `required` flags, never by step indices.

use indexmap::IndexMap;
use intake_types::{FieldDescriptor, FieldValue, StepDefinition, evaluate_rules};

use crate::binding::normalize;
use crate::form::FormState;

const REQUIRED_MESSAGE: &str = "This field is required";

/// Validates a single field: the required-empty check runs first, format
/// rules only once the value is non-empty. Returns the message for the first
/// failing check, or `None` when the field is valid.
pub fn validate_field(descriptor: &FieldDescriptor, value: Option<&FieldValue>) -> Option<String> {
    let value = value.map(|stored| normalize(descriptor, stored)).unwrap_or(&FieldValue::Empty);

    // An unticked toggle checkbox counts as unanswered, so a required
    // consent box blocks until it is ticked.
    if value.is_empty() || matches!(value, FieldValue::Bool(false)) {
        if descriptor.required {
            return Some(REQUIRED_MESSAGE.to_string());
        }
        return None;
    }

    if let Some(rules) = &descriptor.rules
        && let Err(message) = evaluate_rules(rules, value)
    {
        return Some(message);
    }

    None
}

/// Validates every field of a step against the current form state. The
/// returned map holds failing fields only, in descriptor order.
pub fn validate_step(step: &StepDefinition, state: &FormState) -> IndexMap<String, String> {
    let mut errors = IndexMap::new();
    for descriptor in &step.fields {
        if let Some(message) = validate_field(descriptor, state.get(&descriptor.id)) {
            errors.insert(descriptor.id.clone(), message);
        }
    }
    errors
}

/// Returns true when [`validate_step`] produces no errors. Steps with zero
/// descriptors are valid by construction.
pub fn is_step_valid(step: &StepDefinition, state: &FormState) -> bool {
    validate_step(step, state).is_empty()
}
