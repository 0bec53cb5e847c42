// SPDX-License-Identifier: MIT

//! Domain step functions bundled with the engine

pub mod prism;

pub use prism::{prism_graph, register_prism_steps};
