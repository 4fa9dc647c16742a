//! High-level operations.
//!
//! This module contains the implementation of Berth commands.

pub mod events;
pub mod generate;

pub use events::GenerateEvent;
pub use generate::{generate_all, GenerateOptions, GenerateReport, NodeOutcome};
