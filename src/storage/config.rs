//! Configuration handling for todo-graph
//!
//! Configuration is stored in `.todo-graph.toml` at the scan root (project)
//! and `~/.config/todo-graph/config.toml` (global). Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::snapshot::{ERRORS_FILE, SNAPSHOT_FILE, SNAPSHOT_JSON_FILE};
use crate::scanner::{Grammar, ScanOptions, DEFAULT_KEYWORDS};

/// Project configuration file name
pub const CONFIG_FILE: &str = ".todo-graph.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Node-opening keywords (keyword grammar only)
    pub keywords: Vec<String>,

    pub grammar: Grammar,

    /// Snapshot path relative to the root
    pub snapshot: String,

    /// Extra directory names to skip while scanning
    pub ignore_dirs: Vec<String>,

    /// Derive ids for keyword comments that have metadata but no id
    pub derive_ids: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            grammar: Grammar::default(),
            snapshot: SNAPSHOT_FILE.to_string(),
            ignore_dirs: vec![],
            derive_ids: false,
        }
    }
}

impl ProjectConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.is_empty() && self.grammar == Grammar::Keyword {
            return Err(ConfigError::Invalid("keywords must not be empty".to_string()));
        }
        if let Some(bad) = self.keywords.iter().find(|k| k.is_empty() || k.contains(char::is_whitespace)) {
            return Err(ConfigError::Invalid(format!("keyword \"{}\" must be a single word", bad)));
        }
        if self.snapshot.trim().is_empty() {
            return Err(ConfigError::Invalid("snapshot path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub root: PathBuf,
}

impl Config {
    /// Loads configuration for the tree rooted at `root`
    pub fn for_root(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(root)?;

        Ok(Self {
            project,
            global,
            root: root.to_path_buf(),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "todo-graph", "todo-graph").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(root: &Path) -> Result<ProjectConfig> {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;
        Ok(config)
    }

    /// Finds the nearest directory holding `.todo-graph.toml` or a snapshot,
    /// walking up from `start`
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(CONFIG_FILE).is_file() || current.join(SNAPSHOT_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Replaces the keyword list, e.g. from `--keywords`
    pub fn override_keywords(&mut self, keywords: Vec<String>) -> Result<()> {
        self.project.keywords = keywords;
        self.project.validate().context("Invalid --keywords")?;
        Ok(())
    }

    /// Snapshot path as configured
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(&self.project.snapshot)
    }

    /// Scan options with the tool's own files excluded
    pub fn scan_options(&self) -> ScanOptions {
        let mut options = ScanOptions {
            grammar: self.project.grammar,
            keywords: self.project.keywords.clone(),
            ignore_dirs: self.project.ignore_dirs.clone(),
            derive_ids: self.project.derive_ids,
            ..ScanOptions::default()
        };
        for file in [
            CONFIG_FILE,
            SNAPSHOT_FILE,
            SNAPSHOT_JSON_FILE,
            ERRORS_FILE,
            self.project.snapshot.trim_start_matches("./"),
        ] {
            options.skip_files.insert(file.replace('\\', "/"));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = ProjectConfig::default();
        assert_eq!(config.keywords.len(), 7);
        assert_eq!(config.grammar, Grammar::Keyword);
        assert_eq!(config.snapshot, ".todo-graph");
        assert_eq!(GlobalConfig::default().default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
keywords = ["TODO", "TASK"]
grammar = "explicit"
ignore_dirs = ["target"]
derive_ids = true
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.keywords, vec!["TODO", "TASK"]);
        assert_eq!(config.grammar, Grammar::Explicit);
        assert_eq!(config.ignore_dirs, vec!["target"]);
        assert!(config.derive_ids);
        assert_eq!(config.snapshot, ".todo-graph");
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn load_from_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "snapshot = \"graphs/todo.yaml\"\n").unwrap();

        let config = Config::for_root(dir.path()).unwrap();
        assert_eq!(config.snapshot_path(), dir.path().join("graphs/todo.yaml"));

        let options = config.scan_options();
        assert!(options.skip_files.contains("graphs/todo.yaml"));
        assert!(options.skip_files.contains(CONFIG_FILE));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::for_root(dir.path()).unwrap();
        assert_eq!(config.project, ProjectConfig::default());
    }

    #[test]
    fn empty_keywords_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "keywords = []\n").unwrap();
        assert!(Config::for_root(dir.path()).is_err());
    }

    #[test]
    fn find_root_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();

        assert_eq!(Config::find_root(&nested), Some(dir.path().to_path_buf()));
    }
}
