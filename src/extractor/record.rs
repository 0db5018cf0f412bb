//! Fixed-width record parsing.
//!
//! A schema is a comma-separated list of `NAME:start-end` tokens. Offsets are
//! 0-based character positions with an exclusive end, so `CIF:1-10` takes the
//! nine characters after the first one.

use crate::error::{Result, TaxDocsError};
use std::collections::BTreeMap;
use std::iter;
use tracing::warn;

/// Field name -> trimmed value.
pub type FieldMap = BTreeMap<String, String>;

/// Keys every listed file carries, even when the schema does not define them.
pub const DEFAULT_KEYS: [&str; 3] = ["CIF", "NOMBRE", "EJERCICIO"];

/// Characters `[1, 4)` of the first line hold the model id.
pub const MODEL_MARKER_START: usize = 1;
pub const MODEL_MARKER_END: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl FieldSpec {
    pub fn parse(token: &str) -> Result<Self> {
        let malformed = |reason: &str| TaxDocsError::MalformedSchemaField {
            token: token.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = token.split(':').collect();
        let (name, range) = match parts.as_slice() {
            [name, range] => (name.trim(), *range),
            _ => return Err(malformed("expected NAME:start-end")),
        };

        if name.is_empty() {
            return Err(malformed("field name is empty"));
        }

        let bounds: Vec<&str> = range.split('-').collect();
        let (start, end) = match bounds.as_slice() {
            [start, end] => (*start, *end),
            _ => return Err(malformed("expected a single start-end range")),
        };

        let start: usize = start
            .trim()
            .parse()
            .map_err(|_| malformed("start is not a non-negative integer"))?;
        let end: usize = end
            .trim()
            .parse()
            .map_err(|_| malformed("end is not a non-negative integer"))?;

        if start > end {
            return Err(malformed("start is greater than end"));
        }

        Ok(Self {
            name: name.to_string(),
            start,
            end,
        })
    }

    /// The untrimmed column, or `None` when the range runs past the line.
    pub fn slice<'a>(&self, line: &'a str) -> Option<&'a str> {
        char_slice(line, self.start, self.end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Parses every token it can. Malformed tokens are logged and dropped.
    pub fn parse(schema: &str) -> Self {
        let fields = schema
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| match FieldSpec::parse(token) {
                Ok(spec) => Some(spec),
                Err(err) => {
                    warn!(token, error = %err, "skipping malformed schema field");
                    None
                }
            })
            .collect();

        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn extract(&self, line: &str) -> FieldMap {
        self.extract_for(line, None)
    }

    /// Same as [`Schema::extract`], naming `source` in any warning.
    pub fn extract_for(&self, line: &str, source: Option<&str>) -> FieldMap {
        let mut fields = FieldMap::new();
        let line_len = line.chars().count();

        for spec in &self.fields {
            match spec.slice(line) {
                Some(value) => {
                    fields.insert(spec.name.clone(), value.trim().to_string());
                }
                None => {
                    warn!(
                        file = source.unwrap_or("-"),
                        field = %spec.name,
                        start = spec.start,
                        end = spec.end,
                        line_len,
                        "field range is outside the record, skipping"
                    );
                }
            }
        }

        fields
    }
}

/// One-shot extraction: parse `schema` and apply it to `line`.
pub fn extract_fields(line: &str, schema: &str) -> FieldMap {
    Schema::parse(schema).extract(line)
}

/// The model id embedded in a record, trimmed. Short lines are clamped.
pub fn model_marker(line: &str) -> &str {
    let len = line.chars().count();
    char_slice(
        line,
        MODEL_MARKER_START.min(len),
        MODEL_MARKER_END.min(len),
    )
    .unwrap_or("")
    .trim()
}

pub fn fill_default_keys(fields: &mut FieldMap) {
    for key in DEFAULT_KEYS {
        fields.entry(key.to_string()).or_default();
    }
}

fn char_slice(line: &str, start: usize, end: usize) -> Option<&str> {
    let byte_offset = |n: usize| {
        line.char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(line.len()))
            .nth(n)
    };

    let from = byte_offset(start)?;
    let to = byte_offset(end)?;
    line.get(from..to)
}
