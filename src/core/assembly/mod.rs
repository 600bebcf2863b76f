//! Per-patient document assembly
//!
//! [`PatientAssemblyEngine`] drives one patient through the [`AssemblyState`]
//! machine and resets its per-document context on every exit path.

pub mod engine;
pub mod state;

pub use engine::{AssembledDocument, AssemblyContext, PatientAssemblyEngine, ReferenceData};
pub use state::{AssemblyState, StateTracker};
