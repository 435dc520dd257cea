// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Result type used throughout the expression engine.
pub type Result<T, E = ExpressionError> = core::result::Result<T, E>;

/// Numeric status codes carried by every [`ExpressionError`].
///
/// The values are stable so that hosts can match on them when reporting
/// misconfigured contributions.
pub struct ExpressionStatus;

impl ExpressionStatus {
    pub const VARIABLE_IS_NOT_A_COLLECTION: u32 = 3;
    pub const MISSING_ATTRIBUTE: u32 = 50;
    pub const WRONG_ATTRIBUTE_VALUE: u32 = 51;
    pub const MISSING_EXPRESSION: u32 = 52;
    pub const TYPE_EXTENDER_PLUGIN_NOT_LOADED: u32 = 200;
    pub const TYPE_EXTENDER_UNKNOWN_METHOD: u32 = 201;
    pub const TYPE_EXTENDER_INCORRECT_TYPE: u32 = 202;
    pub const NO_NAMESPACE_PROVIDED: u32 = 300;
    pub const VARIABLE_NOT_DEFINED: u32 = 301;
    pub const STRING_NOT_CORRECT_ESCAPED: u32 = 302;
    pub const STRING_NOT_TERMINATED: u32 = 303;
    pub const DEFINITION_NOT_FOUND: u32 = 400;
    pub const EXTENSION_CREATION_FAILED: u32 = 401;
    pub const INVALID_OPTIONS: u32 = 500;
    pub const INVALID_DOCUMENT: u32 = 501;
}

/// Error raised while converting or evaluating expressions.
#[derive(Debug, Error)]
pub enum ExpressionError {
    /// A mandatory attribute is absent on an element.
    #[error("missing attribute '{attribute}' on element <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// An attribute value is not one of the accepted values.
    #[error("attribute '{attribute}' has invalid value '{value}' (expected one of: {expected})")]
    WrongAttributeValue {
        attribute: String,
        value: String,
        expected: String,
    },

    /// An element could not be turned into an expression, or a composite
    /// element lacks a required child.
    #[error("{0}")]
    MissingExpression(String),

    /// A `test` property attribute does not carry a namespace.
    #[error("no namespace provided for property '{0}'")]
    NoNamespaceProvided(String),

    /// A string literal contains a lone quote.
    #[error("string '{0}' is not correctly escaped")]
    StringNotCorrectlyEscaped(String),

    /// A quoted string literal is never closed.
    #[error("string '{0}' is not terminated")]
    StringNotTerminated(String),

    /// A named variable is not defined in the evaluation context.
    #[error("variable '{0}' is not defined")]
    VariableNotDefined(String),

    /// A variable resolver could not resolve a variable.
    #[error("variable '{0}' could not be resolved")]
    VariableNotResolved(String),

    /// The default variable can neither be counted nor iterated.
    #[error("variable of type '{0}' is not a collection")]
    NotACollection(String),

    /// No property tester handles the property anywhere in the type hierarchy.
    #[error("no property tester contributes property '{namespace}.{property}' to type '{type_name}'")]
    UnknownProperty {
        namespace: String,
        property: String,
        type_name: String,
    },

    /// A property tester was asked to test before it was instantiated.
    #[error("property tester '{0}' is not instantiated")]
    TesterNotLoaded(String),

    /// A contributed tester class does not implement the property tester capability.
    #[error("class '{class}' contributed by '{contributor}' is not a property tester")]
    IncorrectTesterType { class: String, contributor: String },

    /// The host failed to create a contributed executable extension.
    #[error("could not create '{class}' contributed by '{contributor}': {source}")]
    ExtensionCreation {
        class: String,
        contributor: String,
        #[source]
        source: anyhow::Error,
    },

    /// A `reference` names an unknown definition.
    #[error("no expression definition with id '{0}'")]
    DefinitionNotFound(String),

    /// Engine options are invalid or could not be read.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A JSON or YAML document could not be read.
    #[error("could not read document: {0}")]
    InvalidDocument(String),
}

impl ExpressionError {
    /// The numeric status code of this error.
    pub fn status(&self) -> u32 {
        match self {
            Self::MissingAttribute { .. } => ExpressionStatus::MISSING_ATTRIBUTE,
            Self::WrongAttributeValue { .. } => ExpressionStatus::WRONG_ATTRIBUTE_VALUE,
            Self::MissingExpression(_) => ExpressionStatus::MISSING_EXPRESSION,
            Self::NoNamespaceProvided(_) => ExpressionStatus::NO_NAMESPACE_PROVIDED,
            Self::StringNotCorrectlyEscaped(_) => ExpressionStatus::STRING_NOT_CORRECT_ESCAPED,
            Self::StringNotTerminated(_) => ExpressionStatus::STRING_NOT_TERMINATED,
            Self::VariableNotDefined(_) | Self::VariableNotResolved(_) => {
                ExpressionStatus::VARIABLE_NOT_DEFINED
            }
            Self::NotACollection(_) => ExpressionStatus::VARIABLE_IS_NOT_A_COLLECTION,
            Self::UnknownProperty { .. } => ExpressionStatus::TYPE_EXTENDER_UNKNOWN_METHOD,
            Self::TesterNotLoaded(_) => ExpressionStatus::TYPE_EXTENDER_PLUGIN_NOT_LOADED,
            Self::IncorrectTesterType { .. } => ExpressionStatus::TYPE_EXTENDER_INCORRECT_TYPE,
            Self::ExtensionCreation { .. } => ExpressionStatus::EXTENSION_CREATION_FAILED,
            Self::DefinitionNotFound(_) => ExpressionStatus::DEFINITION_NOT_FOUND,
            Self::InvalidOptions(_) => ExpressionStatus::INVALID_OPTIONS,
            Self::InvalidDocument(_) => ExpressionStatus::INVALID_DOCUMENT,
        }
    }

    pub(crate) fn missing_attribute(element: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExpressionError {
    fn from(error: serde_json::Error) -> Self {
        ExpressionError::InvalidDocument(format!("{error}"))
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for ExpressionError {
    fn from(error: serde_yaml::Error) -> Self {
        ExpressionError::InvalidDocument(format!("{error}"))
    }
}
