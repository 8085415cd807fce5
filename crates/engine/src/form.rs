//! Shared form state owned by one wizard instance.
//!
//! Every widget a host renders reads from and writes into this single owned
//! map through one mutation entry point, which keeps the "a value exists for
//! every active descriptor" invariant enforceable. Insertion order follows
//! the flow's authoring order because defaults are seeded step by step.

use indexmap::IndexMap;
use intake_types::{FieldValue, SelectedFile, StepDefinition};

/// Mapping from field id to its current value for one wizard instance.
///
/// Created with defaults when the wizard is built, mutated only through
/// [`FormState::set_field`], and kept alive across step navigation so that
/// going back never loses previously entered values.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: IndexMap<String, FieldValue>,
}

impl FormState {
    /// Builds state holding a default value for every descriptor in `steps`.
    pub fn new(steps: &[StepDefinition]) -> Self {
        let mut state = Self::default();
        state.seed_defaults(steps);
        state
    }

    /// Inserts defaults for any descriptor id not present yet. Existing
    /// values are never overwritten; this is what makes dynamic step
    /// recomputation safe to run repeatedly.
    pub fn seed_defaults(&mut self, steps: &[StepDefinition]) {
        for step in steps {
            for descriptor in &step.fields {
                self.values
                    .entry(descriptor.id.clone())
                    .or_insert_with(|| descriptor.default_value());
            }
        }
    }

    /// The single mutation entry point: writes `value` for `id` without
    /// touching unrelated keys.
    pub fn set_field(&mut self, id: &str, value: FieldValue) {
        self.values.insert(id.to_string(), value);
    }

    /// Returns the current value for `id`, if the field is known.
    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Returns the selected files for a file field, empty when unset.
    pub fn files(&self, id: &str) -> &[SelectedFile] {
        self.values.get(id).map(FieldValue::files).unwrap_or(&[])
    }

    /// Iterates `(id, value)` pairs in seeding order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    /// Number of tracked fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no fields are tracked.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_types::{FieldDescriptor, FieldType};

    fn step_with(fields: Vec<FieldDescriptor>) -> StepDefinition {
        StepDefinition {
            id: "step".into(),
            title: None,
            fields,
            terminal: false,
        }
    }

    fn descriptor(id: &str, field_type: FieldType) -> FieldDescriptor {
        FieldDescriptor {
            id: id.into(),
            field_type,
            label: id.into(),
            required: false,
            placeholder: None,
            options: Vec::new(),
            rules: None,
            upload: None,
        }
    }

    #[test]
    fn seeds_defaults_for_every_descriptor() {
        let steps = vec![step_with(vec![
            descriptor("name", FieldType::Text),
            descriptor("agree", FieldType::Checkbox),
        ])];

        let state = FormState::new(&steps);

        assert_eq!(state.len(), 2);
        assert_eq!(state.get("name"), Some(&FieldValue::Empty));
        assert_eq!(state.get("agree"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn reseeding_preserves_entered_values() {
        let steps = vec![step_with(vec![descriptor("name", FieldType::Text)])];
        let mut state = FormState::new(&steps);
        state.set_field("name", FieldValue::Text("Jane".into()));

        let mut wider = steps.clone();
        wider.push(StepDefinition {
            id: "extra".into(),
            title: None,
            fields: vec![descriptor("phone", FieldType::Text)],
            terminal: false,
        });
        state.seed_defaults(&wider);

        assert_eq!(state.get("name"), Some(&FieldValue::Text("Jane".into())));
        assert_eq!(state.get("phone"), Some(&FieldValue::Empty));
    }

    #[test]
    fn set_field_leaves_other_keys_untouched() {
        let steps = vec![step_with(vec![
            descriptor("name", FieldType::Text),
            descriptor("phone", FieldType::Text),
        ])];
        let mut state = FormState::new(&steps);

        state.set_field("phone", FieldValue::Text("555-0100".into()));

        assert_eq!(state.get("name"), Some(&FieldValue::Empty));
        assert_eq!(state.get("phone"), Some(&FieldValue::Text("555-0100".into())));
    }
}
