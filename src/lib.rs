// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod context;
mod definitions;
mod engine;
mod error;
mod info;
mod number;
mod result;
mod runtime;
mod value;

pub mod converter;
pub mod expression;
pub mod extensions;
pub mod platform;

pub use context::{Context, DefaultVariable, EvaluationContext, IteratePool, VariableResolver};
pub use definitions::DefinitionRegistry;
pub use engine::Engine;
pub use error::{ExpressionError, ExpressionStatus, Result};
pub use expression::{Expression, ExpressionRef};
pub use info::ExpressionInfo;
pub use number::Number;
pub use result::EvaluationResult;
pub use runtime::{Options, Runtime};
pub use value::{AsAny, HostObject, HostRef, Value};
