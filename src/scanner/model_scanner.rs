use crate::config::ModelDefinition;
use crate::error::{Result, TaxDocsError};
use crate::extractor::record::{fill_default_keys, model_marker, FieldMap, Schema};
use crate::scanner::file_filter::{is_processed, FileFilter};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info_span, warn};
use walkdir::WalkDir;

/// Serialized keys that belong to the entry itself, not to the record.
const RESERVED_KEYS: [&str; 2] = ["nombre_archivo", "ruta"];

/// One document file that belongs to the requested model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    #[serde(flatten)]
    pub fields: FieldMap,
    #[serde(rename = "nombre_archivo")]
    pub filename: String,
    #[serde(rename = "ruta")]
    pub path: PathBuf,
}

impl FileEntry {
    pub fn new(filename: String, path: PathBuf, mut fields: FieldMap) -> Self {
        for key in RESERVED_KEYS {
            if fields.remove(key).is_some() {
                debug!(file = %filename, field = key, "schema field shadows an entry key, dropping it");
            }
        }
        fill_default_keys(&mut fields);

        Self {
            filename,
            path,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn is_processed(&self) -> bool {
        is_processed(&self.filename)
    }
}

/// Single pass over the top level of the document folder.
pub struct ModelScanner {
    root: PathBuf,
    model: ModelDefinition,
    filter: FileFilter,
}

impl ModelScanner {
    pub fn new<P: Into<PathBuf>>(root: P, model: &ModelDefinition) -> Self {
        Self {
            root: root.into(),
            model: model.clone(),
            filter: FileFilter::new(model),
        }
    }

    pub fn with_skip_processed(mut self, skip: bool) -> Self {
        self.filter = self.filter.with_skip_processed(skip);
        self
    }

    pub fn scan(&self) -> Result<Vec<FileEntry>> {
        let _span = info_span!("scan", model = %self.model.id).entered();

        if !self.root.is_dir() {
            return Err(TaxDocsError::DirectoryNotFound {
                path: self.root.display().to_string(),
            });
        }
        let root = fs::canonicalize(&self.root)?;
        let schema = Schema::parse(&self.model.schema);

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "cannot read directory entry, skipping");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(filename) = entry.file_name().to_str() else {
                warn!(path = %entry.path().display(), "file name is not valid UTF-8, skipping");
                continue;
            };

            match self.classify(filename, entry.path(), &schema) {
                Some(file_entry) => entries.push(file_entry),
                None => skipped += 1,
            }
        }

        debug!(matched = entries.len(), skipped, "scan finished");
        Ok(entries)
    }

    fn classify(&self, filename: &str, path: &Path, schema: &Schema) -> Option<FileEntry> {
        if !self.filter.accepts_name(filename) {
            return None;
        }

        let line = match read_first_line(path) {
            Ok(line) => line,
            Err(err) => {
                error!(file = %filename, error = %err, "cannot read file, skipping");
                return None;
            }
        };

        if line.is_empty() {
            debug!(file = %filename, "empty first line, skipping");
            return None;
        }

        let marker = model_marker(&line);
        if marker != self.model.id {
            debug!(file = %filename, marker, "model marker does not match");
            return None;
        }

        let fields = schema.extract_for(&line, Some(filename));
        Some(FileEntry::new(
            filename.to_string(),
            path.to_path_buf(),
            fields,
        ))
    }
}

/// Reads the first line without its terminator. The handle is closed on return.
pub fn read_first_line(path: &Path) -> Result<String> {
    let read_error = |source| TaxDocsError::FileRead {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    reader.read_line(&mut line).map_err(read_error)?;

    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }

    Ok(line)
}
