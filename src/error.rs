use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxDocsError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration file not found: {path}")]
    ConfigMissing { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Malformed schema field '{token}': {reason}")]
    MalformedSchemaField { token: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {filename}")]
    FileNotFound { filename: String },

    #[error("Destination already exists: {filename}")]
    NameCollision { filename: String },

    #[error("Invalid file name: {filename}")]
    InvalidFileName { filename: String },

    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for TaxDocsError {
    fn user_message(&self) -> String {
        match self {
            TaxDocsError::ConfigMissing { path } => {
                format!("Configuration file not found: {}", path)
            }
            TaxDocsError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            TaxDocsError::FileRead { path, source } => {
                format!("Could not read {}: {}", path, source)
            }
            TaxDocsError::FileNotFound { filename } => {
                format!("File not found: {}", filename)
            }
            TaxDocsError::NameCollision { filename } => {
                format!("A file named {} already exists", filename)
            }
            TaxDocsError::InvalidFileName { filename } => {
                format!("Not a plain file name: {:?}", filename)
            }
            TaxDocsError::UnknownModel { model } => {
                format!("Model {} is not configured", model)
            }
            TaxDocsError::DirectoryNotFound { path } => {
                format!("Document folder does not exist: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            TaxDocsError::ConfigMissing { .. } => Some(
                "Create one with `taxdocs init-config` or omit --config to use the defaults.".to_string()
            ),
            TaxDocsError::Config { .. } => Some(
                "Check the [GENERAL], [MODELOS], [ESTRUCTURAS] and [EXTENSION] sections of your configuration file.".to_string()
            ),
            TaxDocsError::FileNotFound { .. } => Some(
                "Run `taxdocs list <MODEL>` to see the current file names; they change after marking or renaming.".to_string()
            ),
            TaxDocsError::NameCollision { .. } => Some(
                "Move or rename the existing file first, then retry.".to_string()
            ),
            TaxDocsError::InvalidFileName { .. } => Some(
                "Pass only the file name as shown by `taxdocs list`, without directories.".to_string()
            ),
            TaxDocsError::UnknownModel { .. } => Some(
                "Run `taxdocs models` to see the configured model ids.".to_string()
            ),
            TaxDocsError::DirectoryNotFound { .. } => Some(
                "Set UPLOAD_FOLDER in the [GENERAL] section or pass --root.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for TaxDocsError {
    fn from(error: toml::de::Error) -> Self {
        TaxDocsError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaxDocsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = TaxDocsError::UnknownModel {
            model: "999".to_string(),
        };
        assert!(error.user_message().contains("999"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_not_found_has_suggestion() {
        let error = TaxDocsError::FileNotFound {
            filename: "a.100".to_string(),
        };
        assert_eq!(error.to_string(), "File not found: a.100");
        assert!(error.suggestion().unwrap().contains("taxdocs list"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse_error = toml::from_str::<toml::Value>("[broken").unwrap_err();
        let error = TaxDocsError::from(parse_error);
        assert!(matches!(error, TaxDocsError::Config { .. }));
    }

    #[test]
    fn test_malformed_field_falls_back_to_display() {
        let error = TaxDocsError::MalformedSchemaField {
            token: "CIF:x-3".to_string(),
            reason: "start is not an integer".to_string(),
        };
        assert_eq!(error.user_message(), error.to_string());
        assert!(error.suggestion().is_none());
    }
}
