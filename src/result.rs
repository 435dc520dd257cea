// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of evaluating an expression.
///
/// `NotLoaded` means the answer cannot be determined yet because an adapter
/// or property tester has not been loaded. It propagates through the logic
/// operators like an unknown value, except that `False` dominates `and` and
/// `True` dominates `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationResult {
    False,
    True,
    NotLoaded,
}

use EvaluationResult::{False, NotLoaded, True};

const AND: [[EvaluationResult; 3]; 3] = [
    //           FALSE  TRUE       NOT_LOADED
    /* FALSE */ [False, False, False],
    /* TRUE  */ [False, True, NotLoaded],
    /* NOT_L */ [False, NotLoaded, NotLoaded],
];

const OR: [[EvaluationResult; 3]; 3] = [
    //           FALSE      TRUE  NOT_LOADED
    /* FALSE */ [False, True, NotLoaded],
    /* TRUE  */ [True, True, True],
    /* NOT_L */ [NotLoaded, True, NotLoaded],
];

const NOT: [EvaluationResult; 3] = [True, False, NotLoaded];

impl EvaluationResult {
    const fn index(self) -> usize {
        match self {
            False => 0,
            True => 1,
            NotLoaded => 2,
        }
    }

    pub const fn and(self, other: EvaluationResult) -> EvaluationResult {
        AND[self.index()][other.index()]
    }

    pub const fn or(self, other: EvaluationResult) -> EvaluationResult {
        OR[self.index()][other.index()]
    }

    #[allow(clippy::should_implement_trait)]
    pub const fn not(self) -> EvaluationResult {
        NOT[self.index()]
    }

    pub const fn value_of(b: bool) -> EvaluationResult {
        if b {
            True
        } else {
            False
        }
    }
}

impl From<bool> for EvaluationResult {
    fn from(b: bool) -> Self {
        EvaluationResult::value_of(b)
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            False => "false",
            True => "true",
            NotLoaded => "not_loaded",
        })
    }
}
