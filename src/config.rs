use crate::error::{Result, TaxDocsError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_UPLOAD_FOLDER: &str = "./uploads";

/// Settings for one document folder and the tax models stored in it.
///
/// The section names match the settings files already in use, so an existing
/// `[GENERAL]`/`[MODELOS]`/`[ESTRUCTURAS]`/`[EXTENSION]` layout loads as-is.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(rename = "GENERAL", default)]
    pub general: GeneralConfig,
    /// Model id -> display label. A model is known only if it appears here.
    #[serde(rename = "MODELOS", default)]
    pub models: BTreeMap<String, String>,
    /// Model id -> column schema (`NAME:start-end,...`).
    #[serde(rename = "ESTRUCTURAS", default)]
    pub structures: BTreeMap<String, String>,
    /// Model id -> file extension, stored without the leading dot.
    #[serde(rename = "EXTENSION", default)]
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(rename = "UPLOAD_FOLDER", default = "default_upload_folder")]
    pub upload_folder: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            upload_folder: default_upload_folder(),
        }
    }
}

fn default_upload_folder() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOAD_FOLDER)
}

/// Everything needed to recognise and parse one model's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDefinition {
    pub id: String,
    pub label: String,
    pub schema: String,
    pub extension: String,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TaxDocsError::ConfigMissing {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TaxDocsError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| TaxDocsError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        debug!(path = %path.display(), models = config.models.len(), "loaded configuration");
        Ok(config.normalized())
    }

    /// Loads `config_path`, or the first default location that exists.
    ///
    /// A missing file is not an error: the defaults are used and a warning is
    /// logged. A file that exists but cannot be parsed is an error.
    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => match Self::load_from_file(path) {
                Err(TaxDocsError::ConfigMissing { path }) => {
                    warn!(%path, "configuration file not found, using defaults");
                    Ok(Self::default())
                }
                other => other,
            },
            None => {
                let default_paths = ["taxdocs.toml", "config.toml", ".taxdocs.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                warn!(
                    upload_folder = DEFAULT_UPLOAD_FOLDER,
                    "no configuration file found, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref root) = cli_args.root {
            self.general.upload_folder = root.clone();
        }
    }

    /// Rejects an unusable document folder. Models whose id or extension
    /// cannot appear in a file name are dropped with a warning.
    pub fn validate(&mut self) -> Result<()> {
        if self.general.upload_folder.as_os_str().is_empty() {
            return Err(TaxDocsError::Config {
                message: "UPLOAD_FOLDER must not be empty".to_string(),
            });
        }

        // Model ids and extensions end up inside normalized file names.
        let id_pattern = Regex::new(r"^[A-Za-z0-9_-]+$").map_err(|e| TaxDocsError::Config {
            message: format!("Invalid model id pattern: {}", e),
        })?;
        let extensions = &self.extensions;
        self.models.retain(|id, _| {
            if !id_pattern.is_match(id) {
                warn!(model = %id, "model id may only contain letters, digits, '-' and '_', skipping model");
                return false;
            }
            match extensions.get(id) {
                Some(extension) if extension.contains('/') || extension.contains('\\') => {
                    warn!(model = %id, %extension, "extension contains a path separator, skipping model");
                    false
                }
                _ => true,
            }
        });

        for id in self.structures.keys().chain(self.extensions.keys()) {
            if !self.models.contains_key(id) {
                warn!(model = %id, "settings for a model that is not configured are ignored");
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.general.upload_folder
    }

    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Resolves a model id. Missing schema or extension default to empty.
    pub fn model(&self, id: &str) -> Option<ModelDefinition> {
        let label = self.models.get(id)?;
        Some(ModelDefinition {
            id: id.to_string(),
            label: label.clone(),
            schema: self.structures.get(id).cloned().unwrap_or_default(),
            extension: self.extensions.get(id).cloned().unwrap_or_default(),
        })
    }

    pub fn model_definitions(&self) -> Vec<ModelDefinition> {
        self.models.keys().filter_map(|id| self.model(id)).collect()
    }

    pub fn create_sample_config() -> String {
        toml::to_string_pretty(&Self::sample()).unwrap_or_else(|_| String::new())
    }

    fn sample() -> Self {
        let mut config = Self::default();
        config.models.insert("100".to_string(), "IRPF".to_string());
        config.structures.insert(
            "100".to_string(),
            "CIF:1-10,NOMBRE:10-40,EJERCICIO:40-44".to_string(),
        );
        config.extensions.insert("100".to_string(), "100".to_string());
        config
    }

    fn normalized(self) -> Self {
        let trim_map = |map: BTreeMap<String, String>| -> BTreeMap<String, String> {
            map.into_iter()
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect()
        };

        let extensions = trim_map(self.extensions)
            .into_iter()
            .map(|(k, v)| (k, v.trim_start_matches('.').to_string()))
            .collect();

        Self {
            general: self.general,
            models: trim_map(self.models),
            structures: trim_map(self.structures),
            extensions,
        }
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }
}
