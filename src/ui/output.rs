use crate::config::ModelDefinition;
use crate::error::{TaxDocsError, UserFriendlyError};
use crate::extractor::record::DEFAULT_KEYS;
use crate::renamer::{RenameReport, ToggleOutcome};
use crate::scanner::FileEntry;
use console::{style, Emoji, Term};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => eprintln!("WARNING: {}", message),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &TaxDocsError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    eprintln!(
                        "{}",
                        json_line(&serde_json::json!({
                            "type": "suggestion",
                            "message": suggestion
                        }))
                    );
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    pub fn print_models(&self, models: &[ModelDefinition]) {
        match self.mode {
            OutputMode::Human => {
                self.print_header("Configured models");
                if models.is_empty() {
                    println!("  (none)");
                }
                for model in models {
                    let extension = if model.extension.is_empty() {
                        "*".to_string()
                    } else {
                        format!("*{}", model.extension)
                    };
                    if self.use_colors {
                        println!(
                            "  {}  {}  {}",
                            style(&model.id).bold(),
                            model.label,
                            style(extension).dim()
                        );
                    } else {
                        println!("  {}  {}  {}", model.id, model.label, extension);
                    }
                }
            }
            OutputMode::Json => self.print_json_pretty(&models),
            OutputMode::Plain => {
                for model in models {
                    println!("{}\t{}\t{}", model.id, model.label, model.extension);
                }
            }
        }
    }

    pub fn print_file_entries(&self, model: &str, entries: &[FileEntry]) {
        match self.mode {
            OutputMode::Human => self.print_human_entries(model, entries),
            OutputMode::Json => self.print_json_pretty(&entries),
            OutputMode::Plain => {
                let extra = extra_columns(entries);
                for entry in entries {
                    let mut columns = vec![entry.filename.clone()];
                    columns.extend(DEFAULT_KEYS.iter().map(|k| entry.field(k).to_string()));
                    columns.extend(extra.iter().map(|k| entry.field(k).to_string()));
                    columns.push(entry.path.display().to_string());
                    println!("{}", columns.join("\t"));
                }
            }
        }
    }

    pub fn print_toggle_outcome(&self, outcome: &ToggleOutcome) {
        match self.mode {
            OutputMode::Json => self.print_json_pretty(outcome),
            OutputMode::Plain => println!("{}", outcome.filename),
            OutputMode::Human => {
                if outcome.changed {
                    self.success(&format!("{} -> {}", outcome.message, outcome.filename));
                } else {
                    self.print_human_message(MessageType::Info, &outcome.message);
                }
            }
        }
    }

    pub fn print_rename_report(&self, report: &RenameReport) {
        match self.mode {
            OutputMode::Json => {
                self.print_json_pretty(&serde_json::json!({
                    "mensaje": report.message(),
                    "renombrados": report.count(),
                    "archivos": report.renamed,
                    "omitidos": report.skipped,
                    "simulacion": report.dry_run,
                    "interrumpido": report.interrupted,
                }));
            }
            OutputMode::Plain => {
                for renamed in &report.renamed {
                    println!("{}\t{}", renamed.from, renamed.to);
                }
                println!("{}", report.message());
            }
            OutputMode::Human => {
                if self.verbose_level > 0 || report.dry_run {
                    for renamed in &report.renamed {
                        println!("  {} -> {}", renamed.from, renamed.to);
                    }
                }
                for skipped in &report.skipped {
                    self.warning(&format!(
                        "Skipped {} ({:?})",
                        skipped.filename, skipped.reason
                    ));
                }
                if report.interrupted {
                    self.warning("Interrupted: files renamed so far keep their new names");
                }
                self.success(&report.message());
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_entries(&self, model: &str, entries: &[FileEntry]) {
        self.print_header(&format!("Model {}: {} files", model, entries.len()));

        for entry in entries {
            let marker = if entry.is_processed() { "[x]" } else { "[ ]" };
            let name = if self.use_colors && entry.is_processed() {
                style(&entry.filename).dim().to_string()
            } else if self.use_colors {
                style(&entry.filename).bold().to_string()
            } else {
                entry.filename.clone()
            };

            println!(
                "{} {:<40} {:<12} {:<30} {}",
                marker,
                name,
                entry.field("CIF"),
                entry.field("NOMBRE"),
                entry.field("EJERCICIO")
            );

            if self.verbose_level > 0 {
                println!("      {}", entry.path.display());
            }
        }
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (CHECKMARK, style(message).green().bold()),
                MessageType::Error => (CROSS, style(message).red().bold()),
                MessageType::Warning => (WARNING, style(message).yellow().bold()),
                MessageType::Info => (INFO, style(message).cyan()),
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    /// Status messages go to stderr so stdout holds a single JSON document.
    fn print_json_message(&self, level: &str, message: &str) {
        eprintln!(
            "{}",
            json_line(&serde_json::json!({
                "type": "message",
                "level": level,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        );
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!("{}", json_line(obj));
    }

    fn print_json_pretty<T: serde::Serialize + ?Sized>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn json_line(obj: &serde_json::Value) -> String {
    serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
}

/// Schema fields beyond the default keys, in name order.
fn extra_columns(entries: &[FileEntry]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|e| e.fields.keys())
        .filter(|k| !DEFAULT_KEYS.contains(&k.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
