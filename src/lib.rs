pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod renamer;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config, ModelDefinition};
pub use error::{Result, TaxDocsError, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{extract_fields, FieldMap, Schema};
pub use renamer::{BulkRenamer, ProcessedState, RenameProgress, RenameReport, ToggleOutcome};
pub use scanner::{FileEntry, ModelScanner, PROCESSED_PREFIX};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Main library interface: one method per operation on the document folder.
pub struct TaxDocs {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl TaxDocs {
    /// Create a new TaxDocs instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a new TaxDocs instance for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(OutputMode::Plain, 0, true),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    /// Create TaxDocs instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Configured models in id order
    pub fn models(&self) -> Vec<ModelDefinition> {
        self.config.model_definitions()
    }

    /// Files of `model` with their extracted fields. Unknown models list nothing.
    pub fn list(&self, model: &str) -> Result<Vec<FileEntry>> {
        let Some(definition) = self.config.model(model) else {
            debug!(model, "model is not configured, nothing to list");
            return Ok(Vec::new());
        };

        ModelScanner::new(self.config.root(), &definition).scan()
    }

    /// Adds or removes the processed prefix of one file.
    pub fn set_processed(&self, filename: &str, processed: bool) -> Result<ToggleOutcome> {
        renamer::set_processed(self.config.root(), filename, processed)
    }

    /// Normalizes the names of every pending file of `model`.
    pub fn bulk_rename(&self, model: &str, dry_run: bool) -> Result<RenameReport> {
        let definition = self
            .config
            .model(model)
            .ok_or_else(|| TaxDocsError::UnknownModel {
                model: model.to_string(),
            })?;
        let start_time = Instant::now();

        let file_progress = self.progress_manager.create_file_progress(0);
        let progress_callback = {
            let pb = file_progress.clone();
            move |progress: &RenameProgress| {
                ui::progress::update_rename_progress(&pb, progress);
            }
        };
        let keep_going = || self.shutdown.is_running();

        let report = BulkRenamer::new(self.config.root(), &definition)
            .with_dry_run(dry_run)
            .rename_all(Some(&progress_callback), &keep_going);

        match report {
            Ok(report) => {
                ui::progress::finish_progress_with_summary(
                    &file_progress,
                    &report.message(),
                    start_time.elapsed(),
                );
                Ok(report)
            }
            Err(err) => {
                file_progress.abandon();
                Err(err)
            }
        }
    }

    /// Opens a file in the document folder for reading its raw bytes.
    pub fn open_file(&self, filename: &str) -> Result<File> {
        scanner::validate_file_name(filename)?;

        let path = self.config.root().join(filename);
        if !path.is_file() {
            return Err(TaxDocsError::FileNotFound {
                filename: filename.to_string(),
            });
        }

        info!(file = %filename, "serving raw file");
        Ok(File::open(path)?)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &TaxDocsError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    const SCHEMA: &str = "CIF:1-10,NOMBRE:10-40,EJERCICIO:40-44";

    /// Marker `100` at 1..4 sits inside the CIF column of this schema.
    fn record(cif_tail: &str, name: &str, year: &str) -> String {
        format!("0100{:<6}{:<30}{:<4}\n", cif_tail, name, year)
    }

    fn setup() -> (TempDir, TaxDocs) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.upload_folder = dir.path().to_path_buf();
        config.models.insert("100".to_string(), "IRPF".to_string());
        config.models.insert("303".to_string(), "IVA".to_string());
        config.structures.insert("100".to_string(), SCHEMA.to_string());
        config.extensions.insert("100".to_string(), "100".to_string());
        config.extensions.insert("303".to_string(), "303".to_string());

        (dir, TaxDocs::new_for_test(config))
    }

    #[test]
    fn test_list_example_record() {
        let (dir, taxdocs) = setup();
        fs::write(
            dir.path().join("empresa.100"),
            record("B12345", "COMUNIDAD DE VECINOS SOL", "2023"),
        )
        .unwrap();

        let entries = taxdocs.list("100").unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.filename, "empresa.100");
        assert_eq!(entry.field("CIF"), "100B12345");
        assert_eq!(entry.field("NOMBRE"), "COMUNIDAD DE VECINOS SOL");
        assert_eq!(entry.field("EJERCICIO"), "2023");
    }

    #[test]
    fn test_unknown_model_lists_nothing() {
        let (dir, taxdocs) = setup();
        fs::write(dir.path().join("a.100"), record("B1", "X", "2023")).unwrap();

        assert!(taxdocs.list("999").unwrap().is_empty());
        assert!(taxdocs.list("").unwrap().is_empty());
    }

    #[test]
    fn test_model_without_schema_has_default_keys() {
        let (dir, taxdocs) = setup();
        fs::write(dir.path().join("a.303"), "0303 anything\n").unwrap();

        let entries = taxdocs.list("303").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field("CIF"), "");
        assert!(entries[0].fields.contains_key("NOMBRE"));
        assert!(entries[0].fields.contains_key("EJERCICIO"));
    }

    #[test]
    fn test_bulk_rename_unknown_model() {
        let (_dir, taxdocs) = setup();
        let result = taxdocs.bulk_rename("999", false);
        assert!(matches!(result, Err(TaxDocsError::UnknownModel { .. })));
    }

    #[test]
    fn test_bulk_rename_then_list() {
        let (dir, taxdocs) = setup();
        fs::write(dir.path().join("a.100"), record("B 12", "ACME", "2023")).unwrap();
        fs::write(dir.path().join("procesado_b.100"), record("C34", "BETA", "2023")).unwrap();

        let report = taxdocs.bulk_rename("100", false).unwrap();
        assert_eq!(report.count(), 1);
        assert_eq!(report.renamed[0].to, "M-100_100B_12.100");

        let names: Vec<_> = taxdocs
            .list("100")
            .unwrap()
            .into_iter()
            .map(|e| e.filename)
            .collect();
        assert_eq!(names, vec!["M-100_100B_12.100", "procesado_b.100"]);
    }

    #[test]
    fn test_bulk_rename_after_shutdown_is_interrupted() {
        let (dir, taxdocs) = setup();
        fs::write(dir.path().join("a.100"), record("B1", "ACME", "2023")).unwrap();

        taxdocs.request_shutdown();
        let report = taxdocs.bulk_rename("100", false).unwrap();

        assert!(report.interrupted);
        assert_eq!(report.count(), 0);
        assert!(dir.path().join("a.100").exists());
    }

    #[test]
    fn test_toggle_round_trip() {
        let (dir, taxdocs) = setup();
        fs::write(dir.path().join("a.100"), record("B1", "ACME", "2023")).unwrap();

        let marked = taxdocs.set_processed("a.100", true).unwrap();
        let again = taxdocs.set_processed(&marked.filename, true).unwrap();
        assert_eq!(again.filename, marked.filename);

        let restored = taxdocs.set_processed(&marked.filename, false).unwrap();
        assert_eq!(restored.filename, "a.100");
    }

    #[test]
    fn test_open_file() {
        let (dir, taxdocs) = setup();
        fs::write(dir.path().join("a.100"), "raw bytes").unwrap();

        let mut content = String::new();
        taxdocs
            .open_file("a.100")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "raw bytes");

        assert!(matches!(
            taxdocs.open_file("missing.100"),
            Err(TaxDocsError::FileNotFound { .. })
        ));
        assert!(matches!(
            taxdocs.open_file("../a.100"),
            Err(TaxDocsError::InvalidFileName { .. })
        ));
    }

    #[test]
    fn test_models_in_id_order() {
        let (_dir, taxdocs) = setup();
        let ids: Vec<_> = taxdocs.models().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["100", "303"]);
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        TaxDocs::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[GENERAL]"));
        assert!(content.contains("[MODELOS]"));
    }
}
