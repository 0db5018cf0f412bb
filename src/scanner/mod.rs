pub mod file_filter;
pub mod model_scanner;

pub use file_filter::{is_processed, validate_file_name, FileFilter, PROCESSED_PREFIX};
pub use model_scanner::{read_first_line, FileEntry, ModelScanner};
