// SPDX-License-Identifier: MIT

pub mod config;
pub mod error;
pub mod step;

pub use config::EngineConfig;
pub use error::{FlowError, StepError};
pub use step::{AsyncStep, BlockingStep, StateMap, Step, StepContext};
