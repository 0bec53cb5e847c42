// SPDX-License-Identifier: MIT

//! Conditional-edge expressions
//!
//! Conditions are compiled once when a graph is registered and evaluated
//! against run state after every node. Examples:
//! - `stop == True`
//! - `confidence > 0.8`
//! - `intent == 'bug' and priority > 3`

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Expression, Literal, Operand};
pub use evaluator::evaluate;
pub use parser::parse;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConditionError {
    /// The expression uses syntax outside the supported grammar
    #[error("could not parse condition '{input}': {message}")]
    Parse { input: String, message: String },

    /// A path that does not exist in state
    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    /// Operands of the wrong kind for the operator
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: CompareOp,
        left: String,
        right: String,
    },
}

impl ConditionError {
    pub(crate) fn parse(input: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(op: CompareOp, left: &Value, right: &Value) -> Self {
        Self::TypeMismatch {
            op,
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}
