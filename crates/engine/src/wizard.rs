//! The wizard facade a rendering host drives.
//!
//! One `Wizard` owns the flow schema, the shared form state, the step
//! sequencer, the published error map, and the submission coordinator. The
//! host renders [`StepView`]s and calls `edit_field`/`next`/`back`/`finish`;
//! validation gating, dynamic step recomputation, and the submission state
//! machine all happen behind this facade.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use intake_types::{FieldDescriptor, FieldValue, FlowDefinition, SchemaError, SelectedFile};

use crate::binding::{self, FieldEdit};
use crate::form::FormState;
use crate::sequencer::{DeriveSteps, StepSequencer, StepSet};
use crate::submit::{
    AbortGuard, SubmissionCoordinator, SubmissionEvent, SubmissionStatus, SubmitEndpoint, serialize_payload,
};
use crate::upload;
use crate::validate;

/// Result of a forward navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The step validated and the sequencer moved forward.
    Advanced,
    /// Validation failed; the error map was published and the index is
    /// unchanged. This is normal control flow, not a failure.
    Blocked,
    /// The step validated and there is nothing left to advance into; the
    /// host should call `finish` to submit.
    Finish,
    /// Already on the terminal confirmation step.
    AtEnd,
}

/// Read view of one field for rendering: descriptor, normalized current
/// value, and the published error, if any.
#[derive(Debug)]
pub struct FieldView<'a> {
    /// Form-state key.
    pub id: &'a str,
    /// The declarative descriptor to render from.
    pub descriptor: &'a FieldDescriptor,
    /// Current value, with stale single-choice values reading as unset.
    pub value: &'a FieldValue,
    /// Error published by the last blocked navigation, if this field failed.
    pub error: Option<&'a str>,
}

/// Read view of the active step plus the derived booleans the host reflects
/// into its navigation controls.
#[derive(Debug)]
pub struct StepView<'a> {
    /// Active step id.
    pub step_id: &'a str,
    /// Optional step heading.
    pub title: Option<&'a str>,
    /// Zero-based index of the active step.
    pub index: usize,
    /// Number of currently active steps.
    pub total: usize,
    /// Fields to render, in descriptor order.
    pub fields: Vec<FieldView<'a>>,
    /// Whether backward navigation is currently available.
    pub can_go_back: bool,
    /// Whether forward navigation is currently available.
    pub can_go_next: bool,
    /// Whether a submission round trip is in flight.
    pub is_submitting: bool,
    /// Whether the active step is the terminal confirmation step.
    pub is_terminal: bool,
}

/// A configuration-driven multi-step form engine instance.
pub struct Wizard {
    flow: String,
    state: FormState,
    sequencer: StepSequencer,
    errors: IndexMap<String, String>,
    coordinator: SubmissionCoordinator,
}

impl Wizard {
    /// Builds a wizard over a fixed flow. The schema is validated first and
    /// an invalid flow fails construction immediately.
    pub fn new(flow: FlowDefinition) -> Result<Self, SchemaError> {
        flow.validate()?;
        let state = FormState::new(&flow.steps);
        let sequencer = StepSequencer::new(StepSet::Fixed(flow.steps), &state).ok_or(SchemaError::EmptyFlow)?;
        Ok(Self {
            flow: flow.flow,
            state,
            sequencer,
            errors: IndexMap::new(),
            coordinator: SubmissionCoordinator::new(),
        })
    }

    /// Builds a wizard whose step sequence is derived from form state and
    /// recomputed whenever one of `triggers` changes. The initially derived
    /// sequence is schema-validated the same way a fixed flow is.
    pub fn with_derived_steps(flow: &str, triggers: Vec<String>, derive: DeriveSteps) -> Result<Self, SchemaError> {
        let mut state = FormState::default();
        let set = StepSet::Derived { triggers, derive };
        let sequencer = StepSequencer::new(set, &state).ok_or(SchemaError::EmptyFlow)?;

        let initial = FlowDefinition {
            flow: flow.to_string(),
            title: None,
            description: None,
            steps: sequencer.steps().to_vec(),
        };
        initial.validate()?;

        state.seed_defaults(sequencer.steps());
        Ok(Self {
            flow: flow.to_string(),
            state,
            sequencer,
            errors: IndexMap::new(),
            coordinator: SubmissionCoordinator::new(),
        })
    }

    /// Flow identifier this wizard was built over.
    pub fn flow(&self) -> &str {
        &self.flow
    }

    /// Read access to the shared form state.
    pub fn form_state(&self) -> &FormState {
        &self.state
    }

    /// Error map published by the last blocked navigation.
    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    /// Current submission status.
    pub fn submission_status(&self) -> &SubmissionStatus {
        self.coordinator.status()
    }

    /// Timestamped submission lifecycle events, oldest first.
    pub fn submission_events(&self) -> &[SubmissionEvent] {
        self.coordinator.events()
    }

    /// Teardown handle; see [`Wizard::abort`].
    pub fn abort_guard(&self) -> AbortGuard {
        self.coordinator.abort_guard()
    }

    /// Signals that the hosting UI is being torn down. An in-flight
    /// submission result arriving afterwards is discarded instead of
    /// mutating state.
    pub fn abort(&self) {
        self.coordinator.abort_guard().abort();
    }

    /// Applies a raw widget edit to the named field. Returns true when a
    /// value was written; non-numeric number input and edit shapes that do
    /// not match the field's widget are dropped without touching state.
    pub fn edit_field(&mut self, id: &str, edit: FieldEdit) -> bool {
        let Some(descriptor) = self.descriptor_for(id).cloned() else {
            warn!(field = %id, "edit for unknown field ignored");
            return false;
        };
        match binding::apply_edit(&descriptor, edit) {
            Some(value) => {
                self.write_field(id, value);
                true
            }
            None => false,
        }
    }

    /// Writes an already-typed value for the named field. Hosts that keep
    /// typed values themselves can skip the binding layer.
    pub fn set_field(&mut self, id: &str, value: FieldValue) {
        self.write_field(id, value);
    }

    /// Offers newly picked files for a file field. Accepted files are
    /// written into state; the returned reasons describe every rejection in
    /// evaluation order. Reasons do not block navigation by themselves.
    pub fn offer_files(&mut self, id: &str, offered: Vec<SelectedFile>) -> Vec<String> {
        let Some(descriptor) = self.descriptor_for(id) else {
            warn!(field = %id, "file offer for unknown field ignored");
            return Vec::new();
        };
        let Some(constraint) = descriptor.upload.clone() else {
            warn!(field = %id, "file offer for a field without an upload constraint ignored");
            return Vec::new();
        };

        let outcome = upload::evaluate(self.state.files(id), &offered, &constraint);
        debug!(
            field = %id,
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "evaluated file offer"
        );
        self.write_field(id, FieldValue::Files(outcome.accepted));
        outcome.rejected
    }

    /// Removes one selected file by index, preserving the order of the rest
    /// and releasing the dropped handle.
    pub fn remove_file(&mut self, id: &str, index: usize) {
        let remaining = upload::remove(self.state.files(id), index);
        self.write_field(id, FieldValue::Files(remaining));
    }

    /// Forward navigation. Validates the active step; on failure the error
    /// map is published and the index is unchanged. On the last step before
    /// the terminal confirmation, a valid step yields [`NavOutcome::Finish`]
    /// and the host should call [`Wizard::finish`].
    pub fn next(&mut self) -> NavOutcome {
        if self.is_submitting() {
            return NavOutcome::Blocked;
        }

        let (step, index) = self.sequencer.current();
        if step.terminal {
            return NavOutcome::AtEnd;
        }

        let errors = validate::validate_step(step, &self.state);
        if !errors.is_empty() {
            debug!(step = %step.id, failing = errors.len(), "forward navigation blocked");
            self.errors = errors;
            return NavOutcome::Blocked;
        }
        self.errors.clear();

        let at_finish = self.sequencer.is_last()
            || self
                .sequencer
                .steps()
                .get(index + 1)
                .is_some_and(|following| following.terminal);
        if at_finish {
            return NavOutcome::Finish;
        }

        self.sequencer.advance();
        NavOutcome::Advanced
    }

    /// Backward navigation: always allowed (no validation), a no-op on the
    /// first step, and unavailable while a submission is in flight.
    pub fn back(&mut self) -> bool {
        if self.is_submitting() {
            return false;
        }
        self.errors.clear();
        self.sequencer.back()
    }

    /// Submits the form. The active step is validated first; on a validation
    /// failure the error map is published and no network call happens. On
    /// endpoint success the sequencer jumps to its terminal step; on failure
    /// the display-safe message is retained and the active step is left
    /// unchanged so the user can correct and retry.
    pub async fn finish(&mut self, endpoint: &dyn SubmitEndpoint) -> &SubmissionStatus {
        if matches!(self.coordinator.status(), SubmissionStatus::Success) {
            return self.coordinator.status();
        }

        let (step, _) = self.sequencer.current();
        if !step.terminal {
            let errors = validate::validate_step(step, &self.state);
            if !errors.is_empty() {
                self.errors = errors;
                return self.coordinator.status();
            }
            self.errors.clear();
        }

        let payload = self.payload();
        let status = self.coordinator.submit(endpoint, payload).await.clone();
        if matches!(status, SubmissionStatus::Success) {
            self.sequencer.advance_to_terminal();
        }
        self.coordinator.status()
    }

    /// Retries a failed submission. Identical to [`Wizard::finish`]; the
    /// coordinator only permits the transition from `Idle` or `Error`.
    pub async fn retry(&mut self, endpoint: &dyn SubmitEndpoint) -> &SubmissionStatus {
        self.finish(endpoint).await
    }

    /// Resets a failed submission back to idle, keeping all entered data.
    pub fn reset_submission(&mut self) -> bool {
        self.coordinator.reset()
    }

    /// Serialized submission payload for the currently active step set.
    pub fn payload(&self) -> JsonValue {
        serialize_payload(&self.flow, self.sequencer.steps(), &self.state)
    }

    /// Builds the read view the host renders for the active step.
    pub fn step_view(&self) -> StepView<'_> {
        let (step, index) = self.sequencer.current();
        let fields = step
            .fields
            .iter()
            .map(|descriptor| {
                let stored = self.state.get(&descriptor.id).unwrap_or(&FieldValue::Empty);
                FieldView {
                    id: descriptor.id.as_str(),
                    descriptor,
                    value: binding::normalize(descriptor, stored),
                    error: self.errors.get(&descriptor.id).map(String::as_str),
                }
            })
            .collect();

        let submitting = self.is_submitting();
        let succeeded = matches!(self.coordinator.status(), SubmissionStatus::Success);
        StepView {
            step_id: step.id.as_str(),
            title: step.title.as_deref(),
            index,
            total: self.sequencer.steps().len(),
            fields,
            can_go_back: !self.sequencer.is_first() && !submitting && !succeeded,
            can_go_next: !step.terminal && !submitting,
            is_submitting: submitting,
            is_terminal: step.terminal,
        }
    }

    fn is_submitting(&self) -> bool {
        matches!(self.coordinator.status(), SubmissionStatus::Submitting)
    }

    fn descriptor_for(&self, id: &str) -> Option<&FieldDescriptor> {
        self.sequencer
            .steps()
            .iter()
            .flat_map(|step| step.fields.iter())
            .find(|descriptor| descriptor.id == id)
    }

    fn write_field(&mut self, id: &str, value: FieldValue) {
        self.state.set_field(id, value);
        // Dynamic step sets are recomputed only when a declared trigger
        // changes, and never while a submission is in flight.
        if self.sequencer.is_trigger(id) && !self.is_submitting() {
            self.sequencer.recompute(&self.state);
            self.state.seed_defaults(self.sequencer.steps());
        }
    }
}
