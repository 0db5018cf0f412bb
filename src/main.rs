use clap::Parser;
use std::io;
use std::process;
use taxdocs::{
    Cli, Command, OutputFormatter, OutputMode, TaxDocs, TaxDocsError, UserFriendlyError,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level(), cli.quiet);

    // Handle special commands first
    if let Command::InitConfig { ref path } = cli.command {
        return handle_init_config(path);
    }

    let taxdocs = match TaxDocs::from_cli(&cli) {
        Ok(taxdocs) => taxdocs,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    match execute(&cli.command, &taxdocs) {
        Ok(code) => code,
        Err(e) => {
            taxdocs.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn execute(command: &Command, taxdocs: &TaxDocs) -> taxdocs::Result<i32> {
    let formatter = taxdocs.output_formatter();

    match command {
        Command::Models => {
            formatter.print_models(&taxdocs.models());
            Ok(0)
        }
        Command::List { model } => {
            if !taxdocs.config().is_known_model(model) {
                formatter.warning(&format!("Model {} is not configured", model));
            }
            let entries = taxdocs.list(model)?;
            formatter.print_file_entries(model, &entries);
            Ok(0)
        }
        Command::Mark { file } => {
            let outcome = taxdocs.set_processed(file, true)?;
            formatter.print_toggle_outcome(&outcome);
            Ok(0)
        }
        Command::Unmark { file } => {
            let outcome = taxdocs.set_processed(file, false)?;
            formatter.print_toggle_outcome(&outcome);
            Ok(0)
        }
        Command::RenameAll { model, dry_run } => {
            let report = taxdocs.bulk_rename(model, *dry_run)?;
            formatter.print_rename_report(&report);
            Ok(if report.interrupted { 130 } else { 0 })
        }
        Command::Show { file } => {
            let mut source = taxdocs.open_file(file)?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            io::copy(&mut source, &mut handle)?;
            Ok(0)
        }
        Command::InitConfig { path } => Ok(handle_init_config(path)),
    }
}

fn handle_init_config(path: &std::path::Path) -> i32 {
    match TaxDocs::generate_sample_config(path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", path.display());
            println!("\nTo use this configuration:");
            println!("  taxdocs --config {} models", path.display());
            println!("\nEdit [GENERAL], [MODELOS], [ESTRUCTURAS] and [EXTENSION] to match your files.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn exit_code_for(error: &TaxDocsError) -> i32 {
    match error {
        TaxDocsError::UnknownModel { .. } => 2,
        TaxDocsError::FileNotFound { .. } => 3,
        TaxDocsError::NameCollision { .. } | TaxDocsError::InvalidFileName { .. } => 4,
        TaxDocsError::DirectoryNotFound { .. } => 5,
        _ => 1, // General error
    }
}

fn print_startup_error(error: &TaxDocsError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

/// Logs go to stderr so stdout stays clean for `show` and JSON output.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("TAXDOCS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("taxdocs={}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use taxdocs::Config;
    use tempfile::TempDir;

    #[test]
    fn test_init_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        assert_eq!(handle_init_config(&config_path), 0);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[ESTRUCTURAS]"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&TaxDocsError::UnknownModel {
                model: "999".to_string()
            }),
            2
        );
        assert_eq!(
            exit_code_for(&TaxDocsError::FileNotFound {
                filename: "a".to_string()
            }),
            3
        );
        assert_eq!(
            exit_code_for(&TaxDocsError::Config {
                message: "x".to_string()
            }),
            1
        );
    }

    #[test]
    fn test_execute_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.upload_folder = temp_dir.path().to_path_buf();
        let taxdocs = TaxDocs::new_for_test(config);

        let result = execute(
            &Command::Mark {
                file: "ghost.100".to_string(),
            },
            &taxdocs,
        );
        assert!(matches!(result, Err(TaxDocsError::FileNotFound { .. })));
    }
}
