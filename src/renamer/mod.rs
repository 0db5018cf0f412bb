pub mod bulk;
pub mod processed;

pub use bulk::{BulkRenamer, RenameProgress, RenameReport, RenamedFile, SkipReason, SkippedFile};
pub use processed::{set_processed, ProcessedState, ToggleOutcome};
