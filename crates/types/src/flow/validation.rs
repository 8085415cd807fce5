//! Schema validation and declarative rule evaluation.
//!
//! Construction-time checks catch authoring mistakes (duplicate identifiers,
//! choice fields without options, malformed patterns) before a wizard is ever
//! built over the flow; these fail fast and loudly. Rule evaluation covers
//! the per-field format checks applied once a value is non-empty.

use regex::Regex;
use thiserror::Error;

use super::{FieldDescriptor, FieldRules, FieldType, FieldValue, FlowDefinition};

/// Authoring errors detected when a flow definition is validated.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("flow has no steps")]
    EmptyFlow,

    #[error("duplicate step id: {id}")]
    DuplicateStep { id: String },

    #[error("duplicate field id '{id}' in step '{step}'")]
    DuplicateField { step: String, id: String },

    #[error("field '{id}' is a choice field but declares no options")]
    MissingOptions { id: String },

    #[error("field '{id}' declares duplicate option value '{value}'")]
    DuplicateOption { id: String, value: String },

    #[error("file field '{id}' has no upload constraint")]
    MissingUploadConstraint { id: String },

    #[error("field '{id}' is not a file field but carries an upload constraint")]
    UnexpectedUploadConstraint { id: String },

    #[error("field '{id}' upload constraint is invalid: {detail}")]
    InvalidUploadConstraint { id: String, detail: String },

    #[error("field '{id}' declares min {min} greater than max {max}")]
    InvalidRange { id: String, min: f64, max: f64 },

    #[error("field '{id}' has an invalid pattern '{pattern}': {detail}")]
    InvalidPattern { id: String, pattern: String, detail: String },
}

impl FlowDefinition {
    /// Validates the flow's authoring invariants.
    ///
    /// Wizard construction calls this before anything else; an invalid flow
    /// is a programmer error and must never be silently tolerated at runtime.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.steps.is_empty() {
            return Err(SchemaError::EmptyFlow);
        }

        let mut step_ids = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if step_ids.contains(&step.id.as_str()) {
                return Err(SchemaError::DuplicateStep { id: step.id.clone() });
            }
            step_ids.push(step.id.as_str());

            let mut field_ids = Vec::with_capacity(step.fields.len());
            for descriptor in &step.fields {
                if field_ids.contains(&descriptor.id.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        step: step.id.clone(),
                        id: descriptor.id.clone(),
                    });
                }
                field_ids.push(descriptor.id.as_str());

                validate_descriptor(descriptor)?;
            }
        }

        Ok(())
    }
}

fn validate_descriptor(descriptor: &FieldDescriptor) -> Result<(), SchemaError> {
    // Checkbox fields without options are plain toggles, so only
    // select/radio can be missing their options.
    if descriptor.is_choice() && descriptor.options.is_empty() {
        return Err(SchemaError::MissingOptions {
            id: descriptor.id.clone(),
        });
    }

    let mut seen_values = Vec::with_capacity(descriptor.options.len());
    for option in &descriptor.options {
        if seen_values.contains(&option.value.as_str()) {
            return Err(SchemaError::DuplicateOption {
                id: descriptor.id.clone(),
                value: option.value.clone(),
            });
        }
        seen_values.push(option.value.as_str());
    }

    match (descriptor.field_type, &descriptor.upload) {
        (FieldType::File, None) => {
            return Err(SchemaError::MissingUploadConstraint {
                id: descriptor.id.clone(),
            });
        }
        (FieldType::File, Some(constraint)) => {
            if constraint.max_files == 0 {
                return Err(SchemaError::InvalidUploadConstraint {
                    id: descriptor.id.clone(),
                    detail: "max_files must be greater than zero".into(),
                });
            }
            if constraint.max_size_bytes == 0 {
                return Err(SchemaError::InvalidUploadConstraint {
                    id: descriptor.id.clone(),
                    detail: "max_size_bytes must be greater than zero".into(),
                });
            }
        }
        (_, Some(_)) => {
            return Err(SchemaError::UnexpectedUploadConstraint {
                id: descriptor.id.clone(),
            });
        }
        (_, None) => {}
    }

    if let Some(rules) = &descriptor.rules {
        if let (Some(min), Some(max)) = (rules.min, rules.max)
            && min > max
        {
            return Err(SchemaError::InvalidRange {
                id: descriptor.id.clone(),
                min,
                max,
            });
        }

        if let Some(pattern) = &rules.pattern
            && let Err(error) = Regex::new(pattern)
        {
            return Err(SchemaError::InvalidPattern {
                id: descriptor.id.clone(),
                pattern: pattern.clone(),
                detail: error.to_string(),
            });
        }
    }

    Ok(())
}

/// Evaluate a non-empty candidate value against declarative format rules.
///
/// Patterns apply to text values, min/max to numbers. A custom `message`
/// replaces the generated one on any failure. Empty values are the caller's
/// concern; required checks happen before format checks.
pub fn evaluate_rules(rules: &FieldRules, value: &FieldValue) -> Result<(), String> {
    if rules.is_empty() {
        return Ok(());
    }

    let failure = match value {
        FieldValue::Text(text) => text_failure(rules, text),
        FieldValue::Number(number) => number_failure(rules, *number),
        _ => None,
    };

    match failure {
        Some(generated) => Err(rules.message.clone().unwrap_or(generated)),
        None => Ok(()),
    }
}

fn text_failure(rules: &FieldRules, text: &str) -> Option<String> {
    if let Some(pattern) = &rules.pattern {
        // A malformed pattern is rejected at schema validation; treat a
        // compile failure here the same as a mismatch.
        let matched = Regex::new(pattern).map(|regex| regex.is_match(text)).unwrap_or(false);
        if !matched {
            return Some(format!("value must match the pattern {}", pattern));
        }
    }
    None
}

fn number_failure(rules: &FieldRules, number: f64) -> Option<String> {
    if let Some(min) = rules.min
        && number < min
    {
        return Some(format!("value must be at least {}", min));
    }
    if let Some(max) = rules.max
        && number > max
    {
        return Some(format!("value must be at most {}", max));
    }
    None
}
