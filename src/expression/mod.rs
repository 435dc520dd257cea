// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expression tree nodes.
//!
//! Trees are immutable once built and shared as [`ExpressionRef`]s, so a
//! converted tree can be evaluated from many threads against independent
//! contexts.

mod collections;
mod composite;
mod comparisons;
mod property;
mod reference;
mod types;
mod variables;

#[cfg(test)]
mod tests;

pub use collections::{CountExpression, CountMode, IterateExpression, IterateOperator};
pub use comparisons::{EqualsExpression, SystemTestExpression};
pub use composite::{
    AndExpression, CompositeExpression, EnablementExpression, NotExpression, OrExpression,
};
pub use property::TestExpression;
pub use reference::ReferenceExpression;
pub use types::{AdaptExpression, InstanceofExpression};
pub use variables::{ResolveExpression, WithExpression};

use crate::context::Context;
use crate::error::Result;
use crate::info::ExpressionInfo;
use crate::result::EvaluationResult;
use crate::value::Value;

use core::any::Any;
use core::fmt::Debug;
use core::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared handle to an expression tree.
pub type ExpressionRef = Arc<dyn Expression>;

pub(crate) const HASH_FACTOR: u32 = 89;

const HASH_CODE_NOT_COMPUTED: u32 = u32::MAX;

/// A node of an expression tree.
pub trait Expression: Debug + Send + Sync {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult>;

    /// Record what this node accesses.
    ///
    /// Node types that do not override this are reported as misbehaving, so
    /// hosts know the collected info may be incomplete.
    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        info.add_misbehaving_expression_type(self.type_name());
    }

    fn compute_expression_info(&self) -> ExpressionInfo {
        let mut info = ExpressionInfo::new();
        self.collect_expression_info(&mut info);
        info
    }

    /// Structural hash, consistent with [`Expression::equals`].
    fn hash_code(&self) -> u32 {
        match self.hash_cache() {
            Some(cache) => cache.get_or_compute(|| self.compute_hash_code()),
            None => self.compute_hash_code(),
        }
    }

    fn compute_hash_code(&self) -> u32;

    /// Memoized hash code storage, if the node keeps one.
    fn hash_cache(&self) -> Option<&HashCode> {
        None
    }

    /// Structural equality.
    fn equals(&self, other: &dyn Expression) -> bool;

    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Expression + '_ {
    pub fn downcast_ref<T: Expression + 'static>(&self) -> Option<&T> {
        Expression::as_any(self).downcast_ref::<T>()
    }
}

impl PartialEq for dyn Expression + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for dyn Expression + '_ {}

impl Hash for dyn Expression + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_code());
    }
}

/// Lazily computed hash code of an immutable node.
#[derive(Debug)]
pub struct HashCode(AtomicU32);

impl Default for HashCode {
    fn default() -> Self {
        Self(AtomicU32::new(HASH_CODE_NOT_COMPUTED))
    }
}

impl HashCode {
    pub fn get_or_compute(&self, compute: impl FnOnce() -> u32) -> u32 {
        let cached = self.0.load(Ordering::Relaxed);
        if cached != HASH_CODE_NOT_COMPUTED {
            return cached;
        }
        let mut hash = compute();
        if hash == HASH_CODE_NOT_COMPUTED {
            hash = hash.wrapping_add(1);
        }
        self.0.store(hash, Ordering::Relaxed);
        hash
    }
}

pub(crate) fn hash_of<T: Hash + ?Sized>(value: &T) -> u32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

pub(crate) fn hash_values(values: &[Value]) -> u32 {
    values.iter().fold(hash_of("[Value]"), |hash, v| {
        hash.wrapping_mul(HASH_FACTOR).wrapping_add(hash_of(v))
    })
}

pub(crate) fn hash_expressions(expressions: &[ExpressionRef]) -> u32 {
    expressions
        .iter()
        .fold(hash_of("[Expression]"), |hash, e| {
            hash.wrapping_mul(HASH_FACTOR)
                .wrapping_add(e.hash_code())
        })
}

pub(crate) fn equal_expressions(left: &[ExpressionRef], right: &[ExpressionRef]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| l.equals(r.as_ref()))
}

/// Expression that always evaluates to the same result.
#[derive(Debug)]
pub struct ConstantExpression {
    value: bool,
}

impl ConstantExpression {
    pub const fn true_() -> Self {
        Self { value: true }
    }

    pub const fn false_() -> Self {
        Self { value: false }
    }

    pub fn value(&self) -> bool {
        self.value
    }
}

impl Expression for ConstantExpression {
    fn evaluate(&self, _context: &dyn Context) -> Result<EvaluationResult> {
        Ok(EvaluationResult::value_of(self.value))
    }

    fn collect_expression_info(&self, _info: &mut ExpressionInfo) {}

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), self.value))
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| o.value == self.value)
    }

    fn type_name(&self) -> &'static str {
        "ConstantExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
