// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `WorkflowState` - the key/value state threaded through one run
//! - `StateStore` - storage for graphs and run records
//! - `MemoryStore` - the in-process `StateStore`

mod store;
mod values;

pub use store::{MemoryStore, StateStore};
pub use values::WorkflowState;
