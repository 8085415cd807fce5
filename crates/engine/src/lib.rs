//! # Intake Engine
//!
//! A configuration-driven multi-step form engine: a sequencer walks a user
//! through an ordered set of steps, declarative field descriptors describe
//! what each step asks, a validation layer gates step transitions, an upload
//! validator enforces count/size/type constraints with aggregated reporting,
//! and a submission coordinator turns the final "finish" action into one
//! asynchronous network round trip with retry.
//!
//! ## Usage
//!
//! ```rust
//! use intake_engine::{FieldEdit, NavOutcome, Wizard, parse_flow_str};
//!
//! let flow = parse_flow_str(
//!     r#"
//! flow: demo
//! steps:
//!   - id: about_you
//!     fields:
//!       - id: name
//!         type: text
//!         label: Your name
//!         required: true
//!   - id: done
//!     terminal: true
//! "#,
//! )?;
//!
//! let mut wizard = Wizard::new(flow)?;
//! assert_eq!(wizard.next(), NavOutcome::Blocked);
//! wizard.edit_field("name", FieldEdit::Text("Jane".into()));
//! assert_eq!(wizard.next(), NavOutcome::Finish);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`form`**: the shared form state with its single mutation entry point
//! - **`binding`**: typed application of raw widget edits per field type
//! - **`validate`**: per-field and per-step validation gating navigation
//! - **`upload`**: pure evaluation of file selections against constraints
//! - **`sequencer`**: step ordering, navigation, and dynamic recomputation
//! - **`submit`**: the submission state machine and payload serialization
//! - **`wizard`**: the facade a rendering host drives

use std::{fs, path::Path};

use anyhow::{Context, Result};

pub mod binding;
pub mod form;
pub mod sequencer;
pub mod submit;
pub mod upload;
pub mod validate;
pub mod wizard;

// Re-export commonly used types for convenience
pub use binding::{FieldEdit, apply_edit, normalize};
pub use form::FormState;
pub use intake_types::{
    FieldDescriptor, FieldOption, FieldRules, FieldType, FieldValue, FlowDefinition, SchemaError, SelectedFile,
    StepDefinition, UploadConstraint,
};
pub use sequencer::{DeriveSteps, StepSequencer, StepSet};
pub use submit::{
    AbortGuard, SubmissionCoordinator, SubmissionEvent, SubmissionEventKind, SubmissionStatus, SubmitEndpoint,
    serialize_payload,
};
pub use upload::{UploadOutcome, evaluate, remove};
pub use validate::{is_step_valid, validate_field, validate_step};
pub use wizard::{FieldView, NavOutcome, StepView, Wizard};

/// Loads and validates a flow document with automatic format detection.
///
/// Files ending in `.json` are parsed as JSON; everything else is parsed as
/// YAML. The parsed flow is schema-validated before being returned, so an
/// invalid document fails here rather than at wizard construction.
///
/// # Errors
///
/// Returns an error when the file cannot be read, the content does not parse
/// as a flow document, or the flow violates a schema invariant.
pub fn parse_flow_file(file_path: impl AsRef<Path>) -> Result<FlowDefinition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read flow file: {}", file_path.display()))?;

    let flow = if file_path.extension().is_some_and(|extension| extension == "json") {
        serde_json::from_str::<FlowDefinition>(&content)
            .with_context(|| format!("Failed to parse flow JSON: {}", file_path.display()))?
    } else {
        serde_yaml::from_str::<FlowDefinition>(&content)
            .with_context(|| format!("Failed to parse flow YAML: {}", file_path.display()))?
    };

    flow.validate()
        .with_context(|| format!("Invalid flow document: {}", file_path.display()))?;
    Ok(flow)
}

/// Parses and validates a flow document from YAML text.
pub fn parse_flow_str(content: &str) -> Result<FlowDefinition> {
    let flow = serde_yaml::from_str::<FlowDefinition>(content).context("Failed to parse flow YAML")?;
    flow.validate().context("Invalid flow document")?;
    Ok(flow)
}
