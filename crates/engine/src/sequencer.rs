//! Step ordering and navigation.
//!
//! The sequencer owns the ordered step list and the current position. It
//! deliberately knows nothing about validation; the wizard gates `advance`
//! behind the validation engine, while `back` is always allowed. Step sets
//! are either fixed or derived from form state, and a derived set that
//! shrinks below the current index clamps to the new last step instead of
//! erroring.

use std::fmt;
use std::sync::Arc;

use intake_types::StepDefinition;

use crate::form::FormState;

/// Derivation of a step sequence from the current form state.
pub type DeriveSteps = Arc<dyn Fn(&FormState) -> Vec<StepDefinition> + Send + Sync>;

/// A fixed step list, or one recomputed from form state whenever a trigger
/// field changes.
#[derive(Clone)]
pub enum StepSet {
    /// The step sequence never changes.
    Fixed(Vec<StepDefinition>),
    /// The sequence is recomputed from form state when any of the named
    /// trigger fields changes value.
    Derived {
        /// Field ids whose updates force a recomputation.
        triggers: Vec<String>,
        /// Pure derivation from the current form state.
        derive: DeriveSteps,
    },
}

impl fmt::Debug for StepSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSet::Fixed(steps) => formatter.debug_tuple("Fixed").field(&steps.len()).finish(),
            StepSet::Derived { triggers, .. } => formatter.debug_struct("Derived").field("triggers", triggers).finish(),
        }
    }
}

/// Owns the active step sequence and the current index.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    set: StepSet,
    steps: Vec<StepDefinition>,
    index: usize,
}

impl StepSequencer {
    /// Builds a sequencer, materializing derived sets against the given
    /// state. The step list must be non-empty.
    pub fn new(set: StepSet, state: &FormState) -> Option<Self> {
        let steps = match &set {
            StepSet::Fixed(steps) => steps.clone(),
            StepSet::Derived { derive, .. } => derive(state),
        };
        if steps.is_empty() {
            return None;
        }
        Some(Self { set, steps, index: 0 })
    }

    /// The active step and its index.
    pub fn current(&self) -> (&StepDefinition, usize) {
        (&self.steps[self.index], self.index)
    }

    /// All currently active steps in order.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Returns true when the active step is the first one.
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Returns true when the active step is the last one.
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.steps.len()
    }

    /// Moves forward by one step. Returns false when already on the last
    /// step; finishing is the submission coordinator's concern, not a step
    /// move.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Moves back by one step; a no-op on the first step. Backward
    /// navigation never runs validation.
    pub fn back(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Jumps to the terminal confirmation step (the first step marked
    /// terminal, or the last step when none is marked).
    pub fn advance_to_terminal(&mut self) {
        self.index = self
            .steps
            .iter()
            .position(|step| step.terminal)
            .unwrap_or(self.steps.len() - 1);
    }

    /// Returns true when `field_id` is one of a derived set's triggers.
    pub fn is_trigger(&self, field_id: &str) -> bool {
        match &self.set {
            StepSet::Fixed(_) => false,
            StepSet::Derived { triggers, .. } => triggers.iter().any(|trigger| trigger == field_id),
        }
    }

    /// Recomputes a derived step set from the current state, clamping the
    /// index when the new sequence is shorter. Fixed sets are untouched. An
    /// empty derivation keeps the previous sequence; the index invariant
    /// must hold at all times.
    pub fn recompute(&mut self, state: &FormState) {
        let StepSet::Derived { derive, .. } = &self.set else {
            return;
        };
        let steps = derive(state);
        if steps.is_empty() {
            tracing::warn!("step derivation produced no steps; keeping previous sequence");
            return;
        }
        self.steps = steps;
        if self.index >= self.steps.len() {
            self.index = self.steps.len() - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_types::FieldValue;

    fn step(id: &str, terminal: bool) -> StepDefinition {
        StepDefinition {
            id: id.into(),
            title: None,
            fields: Vec::new(),
            terminal,
        }
    }

    fn fixed_sequencer(ids: &[&str]) -> StepSequencer {
        let steps = ids.iter().map(|id| step(id, false)).collect();
        StepSequencer::new(StepSet::Fixed(steps), &FormState::default()).expect("non-empty step set")
    }

    #[test]
    fn empty_step_set_is_rejected() {
        assert!(StepSequencer::new(StepSet::Fixed(Vec::new()), &FormState::default()).is_none());
    }

    #[test]
    fn advance_and_back_respect_bounds() {
        let mut sequencer = fixed_sequencer(&["one", "two", "three"]);
        assert!(sequencer.is_first());

        assert!(sequencer.advance());
        assert!(sequencer.advance());
        assert!(sequencer.is_last());
        assert!(!sequencer.advance());
        assert_eq!(sequencer.current().1, 2);

        assert!(sequencer.back());
        assert!(sequencer.back());
        assert!(sequencer.is_first());
        assert!(!sequencer.back());
        assert_eq!(sequencer.current().1, 0);
    }

    #[test]
    fn advance_to_terminal_prefers_marked_step() {
        let steps = vec![step("input", false), step("done", true), step("trailing", false)];
        let mut sequencer = StepSequencer::new(StepSet::Fixed(steps), &FormState::default()).expect("steps");
        sequencer.advance_to_terminal();
        assert_eq!(sequencer.current().0.id, "done");
    }

    #[test]
    fn derived_shrink_clamps_index() {
        let derive: DeriveSteps = Arc::new(|state: &FormState| {
            let long = matches!(state.get("mode"), Some(FieldValue::Text(text)) if text == "long");
            if long {
                vec![step("one", false), step("two", false), step("three", false)]
            } else {
                vec![step("one", false), step("two", false)]
            }
        });

        let mut state = FormState::default();
        state.set_field("mode", FieldValue::Text("long".into()));

        let set = StepSet::Derived {
            triggers: vec!["mode".into()],
            derive,
        };
        let mut sequencer = StepSequencer::new(set, &state).expect("steps");
        assert!(sequencer.is_trigger("mode"));
        assert!(!sequencer.is_trigger("other"));

        sequencer.advance();
        sequencer.advance();
        assert_eq!(sequencer.current().1, 2);

        state.set_field("mode", FieldValue::Text("short".into()));
        sequencer.recompute(&state);

        assert_eq!(sequencer.current().1, 1);
        assert_eq!(sequencer.current().0.id, "two");
        assert!(sequencer.is_last());
    }
}
