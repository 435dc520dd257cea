// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::converter::ExpressionConverter;
use crate::definitions::DefinitionRegistry;
use crate::error::{ExpressionError, Result};
use crate::extensions::TypeExtensionManager;
use crate::platform::Platform;

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Number of resolved properties kept in the LRU cache.
    pub property_cache_capacity: usize,

    /// Log property cache hits, misses and tester instantiation.
    pub trace_property_resolving: bool,

    /// Log the result and duration of every `enablement` evaluation.
    pub trace_evaluation: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            property_cache_capacity: 1000,
            trace_property_resolving: false,
            trace_evaluation: false,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if self.property_cache_capacity == 0 {
            return Err(ExpressionError::InvalidOptions(
                "property_cache_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Options = serde_json::from_str(json)
            .map_err(|e| ExpressionError::InvalidOptions(format!("{e}")))?;
        options.validate()?;
        Ok(options)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Options = serde_yaml::from_str(yaml)
            .map_err(|e| ExpressionError::InvalidOptions(format!("{e}")))?;
        options.validate()?;
        Ok(options)
    }
}

/// Services shared by every evaluation context of an engine.
pub struct Runtime {
    platform: Arc<Platform>,
    options: Options,
    type_extensions: TypeExtensionManager,
    definitions: Arc<DefinitionRegistry>,
}

impl Runtime {
    /// Runtime with default options and the standard converter.
    pub fn with_platform(platform: Platform) -> Self {
        Self::build(platform, Options::default(), ExpressionConverter::default())
    }

    pub fn new(platform: Platform, options: Options, converter: ExpressionConverter) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(platform, options, converter))
    }

    fn build(platform: Platform, options: Options, converter: ExpressionConverter) -> Self {
        let platform = Arc::new(platform);
        // References created by the converter link back to the registry weakly.
        let definitions = Arc::new_cyclic(|definitions| {
            DefinitionRegistry::new(Arc::new(converter.bound_to(definitions.clone())))
        });
        Self {
            type_extensions: TypeExtensionManager::new(platform.clone(), &options),
            definitions,
            platform,
            options,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn converter(&self) -> &ExpressionConverter {
        self.definitions.converter()
    }

    pub fn type_extensions(&self) -> &TypeExtensionManager {
        &self.type_extensions
    }

    pub fn definitions(&self) -> &Arc<DefinitionRegistry> {
        &self.definitions
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
