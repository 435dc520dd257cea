// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{hash_of, Expression, HashCode};
use crate::context::Context;
use crate::converter::{check_attribute, ElementNode};
use crate::definitions::DefinitionRegistry;
use crate::error::Result;
use crate::info::ExpressionInfo;
use crate::result::EvaluationResult;

use core::any::Any;
use std::sync::Weak;

const ATT_DEFINITION_ID: &str = "definitionId";

/// `<reference definitionId="id"/>`: evaluates a named definition.
///
/// The definition is looked up at evaluation time, so it may be registered
/// after the reference was converted.
#[derive(Debug)]
pub struct ReferenceExpression {
    definition_id: String,
    definitions: Weak<DefinitionRegistry>,
    hash: HashCode,
}

impl ReferenceExpression {
    pub fn new(definition_id: &str) -> Self {
        Self {
            definition_id: definition_id.to_string(),
            definitions: Weak::new(),
            hash: HashCode::default(),
        }
    }

    /// Registry consulted when collecting expression info.
    pub fn with_definitions(mut self, definitions: Weak<DefinitionRegistry>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn from_element(element: &dyn ElementNode) -> Result<Self> {
        Ok(Self::new(check_attribute(element, ATT_DEFINITION_ID)?))
    }

    pub fn definition_id(&self) -> &str {
        &self.definition_id
    }
}

impl Expression for ReferenceExpression {
    fn evaluate(&self, context: &dyn Context) -> Result<EvaluationResult> {
        let expression = context
            .runtime()
            .definitions()
            .expression(&self.definition_id)?;
        expression.evaluate(context)
    }

    fn collect_expression_info(&self, info: &mut ExpressionInfo) {
        // Unknown or unconvertible definitions contribute nothing.
        let Some(definitions) = self.definitions.upgrade() else {
            return;
        };
        if let Ok(expression) = definitions.expression(&self.definition_id) {
            expression.collect_expression_info(info);
        }
    }

    fn compute_hash_code(&self) -> u32 {
        hash_of(&(self.type_name(), &self.definition_id))
    }

    fn hash_cache(&self) -> Option<&HashCode> {
        Some(&self.hash)
    }

    fn equals(&self, other: &dyn Expression) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|o| o.definition_id == self.definition_id)
    }

    fn type_name(&self) -> &'static str {
        "ReferenceExpression"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
