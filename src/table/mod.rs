//! Table builders for the flat and normalized representations.
//!
//! Both builders walk the trace once, in source order, and share the same
//! fixed-width value padding.

pub mod flatten;
pub mod normalize;
pub mod values;

// Re-export main types and functions
pub use flatten::{flatten, FlatRow, FlatTable};
pub use normalize::{normalize, Dataset, FrameRow, NodeRow, StepRow, TypeRow};
pub use values::{nullable_to_slot, pad_values, slot_to_nullable, ValueSlots};
