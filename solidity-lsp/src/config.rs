//! Server configuration
//!
//! Read from `initializationOptions` and from the `solidity` section sent with
//! `workspace/didChangeConfiguration`. Project layout defaults come from `foundry.toml`,
//! see [`crate::project::Project::load`].

use serde::Deserialize;

/// Default bound on the number of lines blanked while recovering from syntax errors.
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Extra remapping rules, appended after the ones found on disk.
    pub remappings: Vec<String>,
    pub sources_folder: Option<String>,
    pub library_folders: Vec<String>,
    /// Parse library sources up front instead of only the ones reachable through imports.
    pub index_libraries: bool,
    pub syntax_diagnostics: bool,
    pub max_recovery_attempts: usize,
    pub forge_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            remappings: Vec::new(),
            sources_folder: None,
            library_folders: Vec::new(),
            index_libraries: true,
            syntax_diagnostics: true,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            forge_path: "forge".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsEnvelope {
    solidity: Option<ServerConfig>,
}

impl ServerConfig {
    /// Build the configuration from a JSON settings value.
    ///
    /// Accepts either the bare configuration object or one nested under a `solidity` key,
    /// which is how most clients forward `didChangeConfiguration` settings.
    ///
    /// # Errors
    /// Returns [`crate::Error::Config`] when the value does not have the expected shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, crate::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        if value.get("solidity").is_some() {
            let envelope: SettingsEnvelope = serde_json::from_value(value)?;
            return Ok(envelope.solidity.unwrap_or_default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Whether switching from `self` to `other` changes how files are discovered or
    /// imports are resolved, which requires a full refresh of the cache.
    #[must_use]
    pub fn affects_project(&self, other: &Self) -> bool {
        self.remappings != other.remappings
            || self.sources_folder != other.sources_folder
            || self.library_folders != other.library_folders
            || self.index_libraries != other.index_libraries
            || self.max_recovery_attempts != other.max_recovery_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults_from_null() -> Result<(), crate::Error> {
        assert_eq!(ServerConfig::from_value(serde_json::Value::Null)?, ServerConfig::default());
        Ok(())
    }

    #[test]
    fn test_camel_case_fields() -> Result<(), crate::Error> {
        let config = ServerConfig::from_value(json!({
            "remappings": ["@oz/=lib/openzeppelin/contracts/"],
            "indexLibraries": false,
            "maxRecoveryAttempts": 4,
        }))?;
        assert_eq!(config.remappings, vec!["@oz/=lib/openzeppelin/contracts/"]);
        assert!(!config.index_libraries);
        assert_eq!(config.max_recovery_attempts, 4);
        assert_eq!(config.forge_path, "forge");
        Ok(())
    }

    #[test]
    fn test_nested_section() -> Result<(), crate::Error> {
        let config = ServerConfig::from_value(json!({
            "solidity": { "syntaxDiagnostics": false }
        }))?;
        assert!(!config.syntax_diagnostics);
        assert!(!config.affects_project(&ServerConfig {
            syntax_diagnostics: true,
            ..config.clone()
        }));
        Ok(())
    }

    #[test]
    fn test_invalid_shape() {
        assert!(ServerConfig::from_value(json!({ "remappings": 3 })).is_err());
    }
}
