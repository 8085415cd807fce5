//! Shared schema definitions for the intake form engine.
//!
//! This crate holds the declarative, data-only vocabulary consumed by the
//! engine and by rendering hosts: flow and step definitions, field
//! descriptors, upload constraints, and the runtime value type written into
//! form state. Descriptors are fixed at configuration time and never mutated
//! by the engine.

pub mod flow;

pub use flow::validation::{SchemaError, evaluate_rules};
pub use flow::{
    FieldDescriptor, FieldOption, FieldRules, FieldType, FieldValue, FlowDefinition, SelectedFile, StepDefinition,
    UploadConstraint,
};
