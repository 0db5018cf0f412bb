use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taxdocs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "List, mark and rename fixed-width tax model files")]
#[command(
    long_about = "TaxDocs reads the first record of every file in a document folder, \
                  recognises the tax model it belongs to, extracts the configured columns \
                  and keeps the folder tidy by marking handled files and normalizing names."
)]
#[command(after_help = "EXAMPLES:\n  \
    taxdocs models\n  \
    taxdocs list 100\n  \
    taxdocs --output-format json list 303\n  \
    taxdocs mark empresa.100\n  \
    taxdocs rename-all 100 --dry-run\n  \
    taxdocs --root /srv/modelos --config modelos.toml show M-100_B12345678.100")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Document folder, overriding UPLOAD_FOLDER
    #[arg(short, long, global = true, env = "TAXDOCS_ROOT")]
    pub root: Option<PathBuf>,

    /// Output format for results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the configured models
    Models,

    /// List the files of a model with their extracted fields
    List {
        /// Model id, as configured in [MODELOS]
        model: String,
    },

    /// Mark a file as processed
    Mark {
        /// File name inside the document folder
        file: String,
    },

    /// Remove the processed mark from a file
    Unmark {
        /// File name inside the document folder
        file: String,
    },

    /// Rename every pending file of a model to M-<model>_<CIF>.<ext>
    RenameAll {
        /// Model id, as configured in [MODELOS]
        model: String,

        /// Show what would be renamed without renaming anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the raw contents of a file to stdout
    Show {
        /// File name inside the document folder
        file: String,
    },

    /// Generate a sample configuration file
    InitConfig {
        /// Where to write it
        #[arg(default_value = "taxdocs.toml")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain tab-separated output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new().with_root(self.root.clone())
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
