use crate::config::ModelDefinition;
use crate::error::{Result, TaxDocsError};
use std::path::{Component, Path};

/// Files whose name starts with this prefix have been handled already.
pub const PROCESSED_PREFIX: &str = "procesado_";

pub fn is_processed(filename: &str) -> bool {
    filename.starts_with(PROCESSED_PREFIX)
}

/// Rejects anything that is not a single file name inside the root folder.
pub fn validate_file_name(filename: &str) -> Result<()> {
    let invalid = || TaxDocsError::InvalidFileName {
        filename: filename.to_string(),
    };

    if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
        return Err(invalid());
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}

/// Name-level checks for one model: extension suffix and processed prefix.
pub struct FileFilter {
    extension: String,
    skip_processed: bool,
}

impl FileFilter {
    pub fn new(model: &ModelDefinition) -> Self {
        Self {
            extension: model.extension.clone(),
            skip_processed: false,
        }
    }

    pub fn with_skip_processed(mut self, skip: bool) -> Self {
        self.skip_processed = skip;
        self
    }

    /// Plain suffix match, so an empty extension accepts every file.
    pub fn matches_extension(&self, filename: &str) -> bool {
        filename.ends_with(&self.extension)
    }

    pub fn accepts_name(&self, filename: &str) -> bool {
        if self.skip_processed && is_processed(filename) {
            return false;
        }
        self.matches_extension(filename)
    }
}
