use crate::error::{Result, TaxDocsError};
use crate::scanner::{is_processed, validate_file_name, PROCESSED_PREFIX};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedState {
    Unprocessed,
    Processed,
}

impl ProcessedState {
    pub fn of(filename: &str) -> Self {
        if is_processed(filename) {
            ProcessedState::Processed
        } else {
            ProcessedState::Unprocessed
        }
    }

    pub fn from_flag(processed: bool) -> Self {
        if processed {
            ProcessedState::Processed
        } else {
            ProcessedState::Unprocessed
        }
    }
}

/// The name `filename` has once it is in `target` state.
pub fn name_for_state(filename: &str, target: ProcessedState) -> String {
    match (ProcessedState::of(filename), target) {
        (ProcessedState::Unprocessed, ProcessedState::Processed) => {
            format!("{}{}", PROCESSED_PREFIX, filename)
        }
        (ProcessedState::Processed, ProcessedState::Unprocessed) => {
            filename[PROCESSED_PREFIX.len()..].to_string()
        }
        _ => filename.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "archivo")]
    pub filename: String,
    #[serde(skip)]
    pub changed: bool,
}

/// Moves `filename` inside `root` into the requested processed state.
///
/// Asking for the state the file is already in renames nothing. An existing
/// file at the destination is never overwritten.
pub fn set_processed(root: &Path, filename: &str, processed: bool) -> Result<ToggleOutcome> {
    validate_file_name(filename)?;

    let current = root.join(filename);
    if !current.is_file() {
        return Err(TaxDocsError::FileNotFound {
            filename: filename.to_string(),
        });
    }

    let target_state = ProcessedState::from_flag(processed);
    let new_name = name_for_state(filename, target_state);

    if new_name == filename {
        return Ok(ToggleOutcome {
            message: format!("{} is already {}", filename, state_label(target_state)),
            filename: filename.to_string(),
            changed: false,
        });
    }

    // Only an empty name is left when the file was called exactly like the prefix.
    validate_file_name(&new_name)?;

    let destination = root.join(&new_name);
    if destination.exists() {
        return Err(TaxDocsError::NameCollision { filename: new_name });
    }

    fs::rename(&current, &destination)?;
    info!(from = %filename, to = %new_name, "processed state changed");

    Ok(ToggleOutcome {
        message: format!("Marked as {}", state_label(target_state)),
        filename: new_name,
        changed: true,
    })
}

fn state_label(state: ProcessedState) -> &'static str {
    match state {
        ProcessedState::Processed => "processed",
        ProcessedState::Unprocessed => "unprocessed",
    }
}
