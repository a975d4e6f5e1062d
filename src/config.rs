//! Configuration management for the audit engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (audit.toml)
//! - Environment variables (AUDIT_*)
//!
//! ## Example config file (audit.toml):
//! ```toml
//! [scan]
//! extensions = ["py"]
//! excluded_dirs = ["__pycache__", ".git", "generated"]
//! max_file_bytes = 1048576
//!
//! [naming]
//! anti_pattern_words = ["Manager", "Handler", "Util"]
//! exempt_suffixes = ["Error", "Exception"]
//!
//! [patterns]
//! max_parameters = 5
//! max_methods = 15
//!
//! [unions]
//! max_members = 2
//!
//! [contracts]
//! max_document_bytes = 262144
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration for the audit engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditConfig {
    /// Directory scan settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Naming rule settings
    #[serde(default)]
    pub naming: NamingConfig,

    /// Pattern rule settings
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Union usage rule settings
    #[serde(default)]
    pub unions: UnionConfig,

    /// Contract validation settings
    #[serde(default)]
    pub contracts: ContractConfig,

    /// Migration settings
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Directory scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions considered source files
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names excluded from the walk
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Hard per-file read cap in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Wall-clock budget for an entire invocation, in seconds (0 = none)
    #[serde(default)]
    pub timeout_secs: u64,
}

/// Naming rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Words rejected in class names ("Manager", "Handler", ...)
    #[serde(default = "default_anti_pattern_words")]
    pub anti_pattern_words: Vec<String>,

    /// Class-name suffixes exempt from the anti-pattern check
    #[serde(default = "default_exempt_suffixes")]
    pub exempt_suffixes: Vec<String>,

    /// Directory names whose files are exempt from the anti-pattern check
    #[serde(default = "default_exempt_dirs")]
    pub exempt_dirs: Vec<String>,

    /// Directory name -> required filename prefix
    #[serde(default = "default_prefix_table")]
    pub filename_prefixes: HashMap<String, String>,

    /// Filenames always exempt from the prefix table
    #[serde(default = "default_exempt_filenames")]
    pub exempt_filenames: Vec<String>,
}

/// Pattern rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Maximum parameters per function (excluding self)
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,

    /// Maximum methods per class before it counts as a god class
    #[serde(default = "default_max_methods")]
    pub max_methods: usize,

    /// Function names too generic to accept
    #[serde(default = "default_generic_names")]
    pub generic_function_names: Vec<String>,

    /// Field names expected to carry an enumeration, not a raw string
    #[serde(default = "default_enum_field_names")]
    pub enum_field_names: Vec<String>,
}

/// Union usage rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionConfig {
    /// Unions with more members than this are flagged
    #[serde(default = "default_max_union_members")]
    pub max_members: usize,
}

/// Contract validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Hard document-size cap in bytes, enforced before parsing
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,

    /// Score penalty per violation
    #[serde(default = "default_violation_penalty")]
    pub violation_penalty: f64,

    /// Score penalty per warning
    #[serde(default = "default_warning_penalty")]
    pub warning_penalty: f64,

    /// Minimum non-trivial description length
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Directory name of the shared repository root created under the target
    #[serde(default = "default_shared_root")]
    pub shared_root: String,

    /// Import path substitutions applied inside migrated copies
    #[serde(default = "default_import_substitutions")]
    pub import_substitutions: HashMap<String, String>,
}

// Default value functions

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_excluded_dirs() -> Vec<String> {
    vec![
        "__pycache__".to_string(),
        ".git".to_string(),
        ".hg".to_string(),
        ".venv".to_string(),
        "venv".to_string(),
        "node_modules".to_string(),
        "generated".to_string(),
        "examples".to_string(),
        "fixtures".to_string(),
        ".mypy_cache".to_string(),
        ".pytest_cache".to_string(),
    ]
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

fn default_anti_pattern_words() -> Vec<String> {
    vec![
        "Manager".to_string(),
        "Handler".to_string(),
        "Util".to_string(),
        "Helper".to_string(),
        "Processor".to_string(),
        "Impl".to_string(),
    ]
}

fn default_exempt_suffixes() -> Vec<String> {
    vec!["Error".to_string(), "Exception".to_string()]
}

fn default_exempt_dirs() -> Vec<String> {
    vec!["migrations".to_string(), "vendor".to_string()]
}

fn default_prefix_table() -> HashMap<String, String> {
    [
        ("models", "model_"),
        ("services", "service_"),
        ("repositories", "repo_"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_exempt_filenames() -> Vec<String> {
    vec![
        "__init__.py".to_string(),
        "__main__.py".to_string(),
        "conftest.py".to_string(),
        "setup.py".to_string(),
    ]
}

fn default_max_parameters() -> usize {
    5
}

fn default_max_methods() -> usize {
    15
}

fn default_generic_names() -> Vec<String> {
    vec![
        "process".to_string(),
        "handle".to_string(),
        "do_stuff".to_string(),
        "manage".to_string(),
        "run_all".to_string(),
        "helper".to_string(),
    ]
}

fn default_enum_field_names() -> Vec<String> {
    vec![
        "category".to_string(),
        "status".to_string(),
        "type".to_string(),
        "kind".to_string(),
        "state".to_string(),
    ]
}

fn default_max_union_members() -> usize {
    2
}

fn default_max_document_bytes() -> u64 {
    256 * 1024
}

fn default_violation_penalty() -> f64 {
    0.2
}

fn default_warning_penalty() -> f64 {
    0.05
}

fn default_min_description_len() -> usize {
    10
}

fn default_shared_root() -> String {
    "shared_protocols".to_string()
}

fn default_import_substitutions() -> HashMap<String, String> {
    [
        ("from protocols", "from shared_protocols"),
        ("import protocols", "import shared_protocols"),
        ("from interfaces", "from shared_protocols"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excluded_dirs: default_excluded_dirs(),
            max_file_bytes: default_max_file_bytes(),
            timeout_secs: 0,
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            anti_pattern_words: default_anti_pattern_words(),
            exempt_suffixes: default_exempt_suffixes(),
            exempt_dirs: default_exempt_dirs(),
            filename_prefixes: default_prefix_table(),
            exempt_filenames: default_exempt_filenames(),
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            max_parameters: default_max_parameters(),
            max_methods: default_max_methods(),
            generic_function_names: default_generic_names(),
            enum_field_names: default_enum_field_names(),
        }
    }
}

impl Default for UnionConfig {
    fn default() -> Self {
        Self {
            max_members: default_max_union_members(),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document_bytes(),
            violation_penalty: default_violation_penalty(),
            warning_penalty: default_warning_penalty(),
            min_description_len: default_min_description_len(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            shared_root: default_shared_root(),
            import_substitutions: default_import_substitutions(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["audit.toml", ".audit.toml", "config/audit.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "protocol", "audit") {
            let xdg_config = config_dir.config_dir().join("audit.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (AUDIT_*)
        builder = builder.add_source(
            Environment::with_prefix("AUDIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert!(config.scan.extensions.contains(&"py".to_string()));
        assert_eq!(config.patterns.max_parameters, 5);
        assert_eq!(config.unions.max_members, 2);
    }

    #[test]
    fn test_serialize_config() {
        let config = AuditConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[scan]"));
        assert!(toml_str.contains("[naming]"));
        assert!(toml_str.contains("[contracts]"));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.toml");

        let mut config = AuditConfig::default();
        config.unions.max_members = 4;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = AuditConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.unions.max_members, 4);
    }

    #[test]
    fn test_exempt_suffixes_cover_errors() {
        let config = NamingConfig::default();
        assert!(config.exempt_suffixes.iter().any(|s| s == "Error"));
    }
}
