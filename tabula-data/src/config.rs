//! Mapper configuration loaded from the `tabula:` section of a YAML document.
//!
//! Resolution order (lowest to highest priority):
//! 1. built-in defaults
//! 2. the YAML file / string
//! 3. environment variables `TABULA_SCHEMA` and `TABULA_ASSIGNMENT`

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::materialize::AssignmentPolicy;
use crate::statement::{SqlCompat, StatementOptions};

pub const ENV_SCHEMA: &str = "TABULA_SCHEMA";
pub const ENV_ASSIGNMENT: &str = "TABULA_ASSIGNMENT";

/// Everything a repository needs to know besides its executor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Schema qualifier for paged statements; `null` drops it.
    pub schema: Option<String>,
    pub assignment: AssignmentPolicy,
    pub compat: SqlCompat,
}

impl Default for MapperConfig {
    fn default() -> Self {
        let statement = StatementOptions::default();
        Self {
            schema: statement.schema,
            assignment: AssignmentPolicy::default(),
            compat: statement.compat,
        }
    }
}

#[derive(Deserialize, Default)]
struct Document {
    #[serde(default)]
    tabula: Option<MapperConfig>,
}

impl MapperConfig {
    /// Parse a YAML document. A document without a `tabula:` section yields
    /// the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Document =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
        Ok(doc.tabula.unwrap_or_default())
    }

    /// Load from a YAML file (missing file means defaults), then overlay the
    /// environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
            Self::from_yaml_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `TABULA_SCHEMA` (empty value drops the qualifier) and
    /// `TABULA_ASSIGNMENT` (`lenient` | `strict`).
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(schema) = std::env::var(ENV_SCHEMA) {
            self.schema = if schema.trim().is_empty() {
                None
            } else {
                Some(schema)
            };
        }
        if let Ok(policy) = std::env::var(ENV_ASSIGNMENT) {
            self.assignment = match policy.trim().to_lowercase().as_str() {
                "lenient" => AssignmentPolicy::Lenient,
                "strict" => AssignmentPolicy::Strict,
                other => {
                    return Err(ConfigError::Invalid {
                        key: ENV_ASSIGNMENT.to_string(),
                        message: format!("expected `lenient` or `strict`, got `{other}`"),
                    })
                }
            };
        }
        Ok(())
    }

    pub fn statement_options(&self) -> StatementOptions {
        StatementOptions {
            schema: self.schema.clone(),
            compat: self.compat,
        }
    }
}
