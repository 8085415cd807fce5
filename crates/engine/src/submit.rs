//! Submission coordination.
//!
//! The terminal state machine behind a flow's "finish" action: it owns the
//! `idle → submitting → success | error` lifecycle, serializes form state
//! into the payload handed to the external submission interface, and refuses
//! to apply a late-arriving outcome once the hosting UI has been torn down.
//! The abort guard is re-checked after the endpoint future resolves; without
//! that check a slow network call could mutate state after unmount.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::form::FormState;
use intake_types::StepDefinition;

/// Submission lifecycle status for one wizard instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    /// No submission attempted yet.
    #[default]
    Idle,
    /// A submission round trip is in flight.
    Submitting,
    /// The submission was accepted; terminal for the instance.
    Success,
    /// The submission failed with a display-safe message. Retryable.
    Error(String),
}

/// External submission interface: one asynchronous round trip, success
/// signaled by `Ok(())`, failure by an error carrying a display-safe
/// message. The HTTP endpoint behind it is out of scope here; tests supply
/// scripted implementations.
#[async_trait]
pub trait SubmitEndpoint: Send + Sync {
    /// Delivers the serialized payload.
    async fn submit(&self, payload: JsonValue) -> Result<()>;
}

/// Teardown signal shared between a wizard and its host. Once flipped, the
/// coordinator discards any in-flight outcome instead of applying it.
#[derive(Debug, Clone, Default)]
pub struct AbortGuard {
    aborted: Arc<AtomicBool>,
}

impl AbortGuard {
    /// Signals teardown; subsequent outcome application is suppressed.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`AbortGuard::abort`] has been called.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Kind of a recorded submission lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionEventKind {
    /// The coordinator entered `Submitting`.
    Started,
    /// The endpoint accepted the payload.
    Completed,
    /// The endpoint rejected the payload.
    Failed,
}

/// Timestamped submission lifecycle event, kept for host telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionEvent {
    /// What happened.
    pub kind: SubmissionEventKind,
    /// When it happened.
    pub at: DateTime<Utc>,
    /// Failure detail, present for `Failed` events.
    pub detail: Option<String>,
}

/// Terminal state machine turning "finish" into a network call.
#[derive(Debug, Default)]
pub struct SubmissionCoordinator {
    status: SubmissionStatus,
    events: Vec<SubmissionEvent>,
    abort: AbortGuard,
}

impl SubmissionCoordinator {
    /// Creates an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    /// Recorded lifecycle events in order.
    pub fn events(&self) -> &[SubmissionEvent] {
        &self.events
    }

    /// Handle the host uses to signal teardown while a round trip is in
    /// flight.
    pub fn abort_guard(&self) -> AbortGuard {
        self.abort.clone()
    }

    /// Resets `Error` back to `Idle`. Any other status is left unchanged;
    /// `Success` is terminal and `Submitting` must run to completion.
    pub fn reset(&mut self) -> bool {
        if matches!(self.status, SubmissionStatus::Error(_)) {
            self.status = SubmissionStatus::Idle;
            return true;
        }
        false
    }

    /// Attempts the idle/error → submitting transition. Returns false when
    /// the transition is not allowed (already submitting, or already
    /// succeeded), in which case no network call may be made.
    fn begin(&mut self) -> bool {
        match self.status {
            SubmissionStatus::Idle | SubmissionStatus::Error(_) => {
                self.status = SubmissionStatus::Submitting;
                self.events.push(SubmissionEvent {
                    kind: SubmissionEventKind::Started,
                    at: Utc::now(),
                    detail: None,
                });
                true
            }
            SubmissionStatus::Submitting | SubmissionStatus::Success => false,
        }
    }

    /// Runs one submission round trip. A no-op when already submitting or
    /// already succeeded; the duplicate call never reaches the endpoint.
    /// After the endpoint resolves, the abort guard is checked before any
    /// transition is applied.
    pub async fn submit(&mut self, endpoint: &dyn SubmitEndpoint, payload: JsonValue) -> &SubmissionStatus {
        if !self.begin() {
            debug!(status = ?self.status, "submission request ignored");
            return &self.status;
        }

        info!("submitting form payload");
        let outcome = endpoint.submit(payload).await;

        if self.abort.is_aborted() {
            debug!("wizard torn down while submitting; discarding outcome");
            return &self.status;
        }

        match outcome {
            Ok(()) => {
                info!("submission accepted");
                self.status = SubmissionStatus::Success;
                self.events.push(SubmissionEvent {
                    kind: SubmissionEventKind::Completed,
                    at: Utc::now(),
                    detail: None,
                });
            }
            Err(error) => {
                let message = error.to_string();
                warn!(error = %message, "submission failed");
                self.status = SubmissionStatus::Error(message.clone());
                self.events.push(SubmissionEvent {
                    kind: SubmissionEventKind::Failed,
                    at: Utc::now(),
                    detail: Some(message),
                });
            }
        }

        &self.status
    }
}

/// Serializes form state into the submission payload: the flow identifier
/// plus one entry per field of the currently active step set. Values held
/// for fields outside the active set (a dynamic branch the user backed out
/// of) are not sent. File values carry their raw handles.
pub fn serialize_payload(flow: &str, active_steps: &[StepDefinition], state: &FormState) -> JsonValue {
    let mut fields = JsonMap::new();
    for step in active_steps {
        for descriptor in &step.fields {
            let value = state.get(&descriptor.id).map(|value| value.to_json()).unwrap_or(JsonValue::Null);
            fields.insert(descriptor.id.clone(), value);
        }
    }

    let mut payload = JsonMap::new();
    payload.insert("flow".into(), JsonValue::String(flow.to_string()));
    payload.insert("fields".into(), JsonValue::Object(fields));
    JsonValue::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Endpoint double that pops scripted outcomes in order, counting calls.
    struct ScriptedEndpoint {
        outcomes: Mutex<Vec<Result<(), String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedEndpoint {
        fn new(outcomes: Vec<Result<(), String>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SubmitEndpoint for ScriptedEndpoint {
        async fn submit(&self, _payload: JsonValue) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().expect("outcomes lock");
            match outcomes.remove(0) {
                Ok(()) => Ok(()),
                Err(message) => Err(anyhow!(message)),
            }
        }
    }

    /// Endpoint double that flips the abort guard before resolving, which
    /// models the host tearing the wizard down mid-flight.
    struct AbortingEndpoint {
        guard: AbortGuard,
    }

    #[async_trait]
    impl SubmitEndpoint for AbortingEndpoint {
        async fn submit(&self, _payload: JsonValue) -> Result<()> {
            self.guard.abort();
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_passes_through_submitting() {
        let endpoint = ScriptedEndpoint::new(vec![Ok(())]);
        let mut coordinator = SubmissionCoordinator::new();
        assert_eq!(coordinator.status(), &SubmissionStatus::Idle);

        let status = coordinator.submit(&endpoint, JsonValue::Null).await.clone();

        assert_eq!(status, SubmissionStatus::Success);
        let kinds: Vec<SubmissionEventKind> = coordinator.events().iter().map(|event| event.kind).collect();
        assert_eq!(kinds, [SubmissionEventKind::Started, SubmissionEventKind::Completed]);
    }

    #[tokio::test]
    async fn failure_retains_display_message_and_allows_retry() {
        let endpoint = ScriptedEndpoint::new(vec![
            Err("Something went wrong. Please try again.".into()),
            Ok(()),
        ]);
        let mut coordinator = SubmissionCoordinator::new();

        let status = coordinator.submit(&endpoint, JsonValue::Null).await.clone();
        assert_eq!(status, SubmissionStatus::Error("Something went wrong. Please try again.".into()));

        let status = coordinator.submit(&endpoint, JsonValue::Null).await.clone();
        assert_eq!(status, SubmissionStatus::Success);
        assert_eq!(endpoint.call_count(), 2);
    }

    #[tokio::test]
    async fn duplicate_submit_never_reaches_the_endpoint() {
        let mut coordinator = SubmissionCoordinator::new();
        let aborting = AbortingEndpoint {
            guard: coordinator.abort_guard(),
        };

        // The aborted round trip leaves the machine in Submitting without
        // applying an outcome.
        coordinator.submit(&aborting, JsonValue::Null).await;
        assert_eq!(coordinator.status(), &SubmissionStatus::Submitting);

        let counter = ScriptedEndpoint::new(vec![Ok(())]);
        coordinator.submit(&counter, JsonValue::Null).await;
        assert_eq!(counter.call_count(), 0);
        assert_eq!(coordinator.status(), &SubmissionStatus::Submitting);
    }

    #[tokio::test]
    async fn aborted_outcome_is_discarded() {
        let mut coordinator = SubmissionCoordinator::new();
        let endpoint = AbortingEndpoint {
            guard: coordinator.abort_guard(),
        };

        coordinator.submit(&endpoint, JsonValue::Null).await;

        // Endpoint resolved Ok, but the guard was flipped first: no
        // transition to Success and no completion event.
        assert_eq!(coordinator.status(), &SubmissionStatus::Submitting);
        let kinds: Vec<SubmissionEventKind> = coordinator.events().iter().map(|event| event.kind).collect();
        assert_eq!(kinds, [SubmissionEventKind::Started]);
    }

    #[tokio::test]
    async fn reset_only_leaves_error() {
        let endpoint = ScriptedEndpoint::new(vec![Err("nope".into())]);
        let mut coordinator = SubmissionCoordinator::new();
        assert!(!coordinator.reset());

        coordinator.submit(&endpoint, JsonValue::Null).await;
        assert!(coordinator.reset());
        assert_eq!(coordinator.status(), &SubmissionStatus::Idle);
    }

    #[test]
    fn payload_covers_active_steps_only() {
        use intake_types::{FieldDescriptor, FieldType, FieldValue};

        let step = |id: &str, field: &str| StepDefinition {
            id: id.into(),
            title: None,
            fields: vec![FieldDescriptor {
                id: field.into(),
                field_type: FieldType::Text,
                label: field.into(),
                required: false,
                placeholder: None,
                options: Vec::new(),
                rules: None,
                upload: None,
            }],
            terminal: false,
        };

        let active = vec![step("one", "name")];
        let mut state = FormState::new(&active);
        state.set_field("name", FieldValue::Text("Jane".into()));
        // Left over from a dynamic branch that is no longer active.
        state.set_field("orphan", FieldValue::Text("stale".into()));

        let payload = serialize_payload("contact", &active, &state);

        assert_eq!(payload["flow"], "contact");
        assert_eq!(payload["fields"]["name"], "Jane");
        assert!(payload["fields"].get("orphan").is_none());
    }
}
