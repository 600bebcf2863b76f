//! Transaction document assembly
//!
//! - [`BundleAssembler`] accumulates one patient's resources
//! - [`IdMinter`] issues their synthetic ids
//! - [`Bundle`] is the finished, serializable document

pub mod assembler;
pub mod document;
pub mod ids;

pub use assembler::{BundleAssembler, ConditionalSlot};
pub use document::{Bundle, BundleEntry};
pub use ids::{IdMinter, IdStrategy};
