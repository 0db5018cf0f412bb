use crate::config::ModelDefinition;
use crate::error::Result;
use crate::scanner::{FileEntry, ModelScanner};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedFile {
    #[serde(rename = "origen")]
    pub from: String,
    #[serde(rename = "destino")]
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DestinationExists,
    AlreadyNormalized,
    RenameFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    #[serde(rename = "archivo")]
    pub filename: String,
    #[serde(rename = "motivo")]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenameReport {
    pub model: String,
    pub renamed: Vec<RenamedFile>,
    pub skipped: Vec<SkippedFile>,
    pub dry_run: bool,
    pub interrupted: bool,
}

impl RenameReport {
    /// Files actually renamed (or planned, in a dry run). Skips never count.
    pub fn count(&self) -> usize {
        self.renamed.len()
    }

    pub fn message(&self) -> String {
        let verb = if self.dry_run { "Would rename" } else { "Renamed" };
        format!("{} {} files of model {}.", verb, self.count(), self.model)
    }
}

#[derive(Debug, Clone)]
pub struct RenameProgress {
    pub files_done: usize,
    pub total_files: usize,
    pub current_file: Option<String>,
}

/// Renames every pending file of a model to `M-<model>_<cif>.<ext>`.
pub struct BulkRenamer {
    root: PathBuf,
    model: ModelDefinition,
    dry_run: bool,
}

impl BulkRenamer {
    pub fn new<P: Into<PathBuf>>(root: P, model: &ModelDefinition) -> Self {
        Self {
            root: root.into(),
            model: model.clone(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn normalized_name(&self, entry: &FileEntry) -> String {
        let cif = name_component(entry.field("CIF"));
        // NOMBRE is logged but not part of the normalized name.
        let nombre = name_component(entry.field("NOMBRE"));
        debug!(file = %entry.filename, %cif, %nombre, "computed name components");

        format!("M-{}_{}.{}", self.model.id, cif, self.model.extension)
    }

    /// Renames pending files one by one, stopping early once `keep_going` says so.
    ///
    /// Nothing is rolled back: an interrupted run keeps the renames already done.
    pub fn rename_all(
        &self,
        progress_callback: Option<&dyn Fn(&RenameProgress)>,
        keep_going: &dyn Fn() -> bool,
    ) -> Result<RenameReport> {
        let entries = ModelScanner::new(&self.root, &self.model)
            .with_skip_processed(true)
            .scan()?;

        let _span = info_span!("bulk_rename", model = %self.model.id, dry_run = self.dry_run).entered();

        let mut report = RenameReport {
            model: self.model.id.clone(),
            dry_run: self.dry_run,
            ..RenameReport::default()
        };
        let mut progress = RenameProgress {
            files_done: 0,
            total_files: entries.len(),
            current_file: None,
        };
        let mut plan = DryRunPlan::default();

        for entry in &entries {
            if !keep_going() {
                warn!(
                    done = progress.files_done,
                    total = progress.total_files,
                    "bulk rename interrupted"
                );
                report.interrupted = true;
                break;
            }

            if let Some(callback) = progress_callback {
                progress.current_file = Some(entry.filename.clone());
                callback(&progress);
            }

            let outcome = self.rename_one(entry, &mut plan);
            match outcome {
                Ok(new_name) => report.renamed.push(RenamedFile {
                    from: entry.filename.clone(),
                    to: new_name,
                }),
                Err(reason) => report.skipped.push(SkippedFile {
                    filename: entry.filename.clone(),
                    reason,
                }),
            }

            progress.files_done += 1;
        }

        if let Some(callback) = progress_callback {
            progress.current_file = None;
            callback(&progress);
        }

        info!(
            renamed = report.count(),
            skipped = report.skipped.len(),
            "bulk rename finished"
        );
        Ok(report)
    }

    fn rename_one(
        &self,
        entry: &FileEntry,
        plan: &mut DryRunPlan,
    ) -> std::result::Result<String, SkipReason> {
        let new_name = self.normalized_name(entry);

        if new_name == entry.filename {
            debug!(file = %entry.filename, "already normalized");
            return Err(SkipReason::AlreadyNormalized);
        }

        let destination = entry.path.with_file_name(&new_name);
        let taken = if self.dry_run {
            plan.is_taken(&new_name, destination.exists())
        } else {
            destination.exists()
        };
        if taken {
            warn!(file = %entry.filename, destination = %new_name, "destination already exists, skipping");
            return Err(SkipReason::DestinationExists);
        }

        if self.dry_run {
            plan.claim(&entry.filename, &new_name);
            return Ok(new_name);
        }

        match fs::rename(&entry.path, &destination) {
            Ok(()) => {
                info!(from = %entry.filename, to = %new_name, "renamed");
                Ok(new_name)
            }
            Err(err) => {
                error!(file = %entry.filename, destination = %new_name, error = %err, "rename failed, skipping");
                Err(SkipReason::RenameFailed)
            }
        }
    }
}

/// Names a dry run has claimed or freed, since it never touches the disk.
#[derive(Debug, Default)]
struct DryRunPlan {
    claimed: HashSet<String>,
    vacated: HashSet<String>,
}

impl DryRunPlan {
    fn is_taken(&self, name: &str, on_disk: bool) -> bool {
        self.claimed.contains(name) || (on_disk && !self.vacated.contains(name))
    }

    fn claim(&mut self, from: &str, to: &str) {
        self.vacated.insert(from.to_string());
        self.vacated.remove(to);
        self.claimed.insert(to.to_string());
    }
}

/// Spaces become underscores; anything unsafe in a file name does too.
pub fn name_component(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            ' ' => '_',
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn model() -> ModelDefinition {
        ModelDefinition {
            id: "100".to_string(),
            label: "IRPF".to_string(),
            schema: "CIF:4-13,NOMBRE:13-43,EJERCICIO:43-47".to_string(),
            extension: "100".to_string(),
        }
    }

    fn record(cif: &str, name: &str) -> String {
        format!("0100{:<9}{:<30}2023\n", cif, name)
    }

    fn names_in(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn always() -> bool {
        true
    }

    #[test]
    fn test_renames_pending_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.100"), record("B1234 567", "ACME SL")).unwrap();
        fs::write(dir.path().join("y.100"), record("A7654321", "OTRA SA")).unwrap();

        let report = BulkRenamer::new(dir.path(), &model())
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(report.count(), 2);
        assert!(report.skipped.is_empty());
        assert_eq!(names_in(&dir), vec!["M-100_A7654321.100", "M-100_B1234_567.100"]);
        assert_eq!(report.message(), "Renamed 2 files of model 100.");
    }

    #[test]
    fn test_processed_files_are_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("procesado_x.100"), record("B1", "ACME")).unwrap();

        let report = BulkRenamer::new(dir.path(), &model())
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(report.count(), 0);
        assert_eq!(names_in(&dir), vec!["procesado_x.100"]);
    }

    #[test]
    fn test_collision_is_skipped_and_not_counted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("M-100_B1.100"), "existing").unwrap();
        fs::write(dir.path().join("x.100"), record("B1", "ACME")).unwrap();

        let report = BulkRenamer::new(dir.path(), &model())
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(report.count(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::DestinationExists);
        assert_eq!(
            fs::read_to_string(dir.path().join("M-100_B1.100")).unwrap(),
            "existing"
        );
        assert!(dir.path().join("x.100").exists());
    }

    #[test]
    fn test_same_cif_twice_renames_only_first() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.100"), record("B1", "ACME")).unwrap();
        fs::write(dir.path().join("b.100"), record("B1", "ACME")).unwrap();

        let report = BulkRenamer::new(dir.path(), &model())
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(report.count(), 1);
        assert_eq!(report.renamed[0].from, "a.100");
        assert_eq!(names_in(&dir), vec!["M-100_B1.100", "b.100"]);
    }

    #[test]
    fn test_already_normalized_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("M-100_B1.100"), record("B1", "ACME")).unwrap();

        let report = BulkRenamer::new(dir.path(), &model())
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(report.count(), 0);
        assert_eq!(report.skipped[0].reason, SkipReason::AlreadyNormalized);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.100"), record("B1", "ACME")).unwrap();
        fs::write(dir.path().join("b.100"), record("B1", "ACME")).unwrap();

        let report = BulkRenamer::new(dir.path(), &model())
            .with_dry_run(true)
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(report.count(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::DestinationExists);
        assert_eq!(names_in(&dir), vec!["a.100", "b.100"]);
        assert!(report.message().starts_with("Would rename 1"));
    }

    #[test]
    fn test_dry_run_sees_names_freed_by_earlier_renames() {
        let fixture = || {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("M-100_A1.100"), record("B1", "ACME")).unwrap();
            fs::write(dir.path().join("x.100"), record("A1", "OTRA")).unwrap();
            dir
        };

        let dry_dir = fixture();
        let dry = BulkRenamer::new(dry_dir.path(), &model())
            .with_dry_run(true)
            .rename_all(None, &always)
            .unwrap();

        let real_dir = fixture();
        let real = BulkRenamer::new(real_dir.path(), &model())
            .rename_all(None, &always)
            .unwrap();

        assert_eq!(real.count(), 2);
        assert_eq!(dry.count(), real.count());
        assert!(dry.skipped.is_empty());
        assert_eq!(dry.renamed, real.renamed);
        assert_eq!(names_in(&dry_dir), vec!["M-100_A1.100", "x.100"]);
        assert_eq!(names_in(&real_dir), vec!["M-100_A1.100", "M-100_B1.100"]);
    }

    #[test]
    fn test_interruption_keeps_completed_renames() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.100"), record("A1", "ACME")).unwrap();
        fs::write(dir.path().join("b.100"), record("B1", "ACME")).unwrap();

        let calls = Cell::new(0);
        let keep_going = || {
            calls.set(calls.get() + 1);
            calls.get() < 2
        };

        let report = BulkRenamer::new(dir.path(), &model())
            .rename_all(None, &keep_going)
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.count(), 1);
        assert_eq!(names_in(&dir), vec!["M-100_A1.100", "b.100"]);
    }

    #[test]
    fn test_progress_callback() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.100"), record("A1", "ACME")).unwrap();

        let seen = Cell::new(0usize);
        let callback = |p: &RenameProgress| {
            assert_eq!(p.total_files, 1);
            seen.set(seen.get() + 1);
        };

        BulkRenamer::new(dir.path(), &model())
            .rename_all(Some(&callback), &always)
            .unwrap();

        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_name_component() {
        assert_eq!(name_component("B 123 45"), "B_123_45");
        assert_eq!(name_component("../etc"), ".._etc");
        assert_eq!(name_component("A:B*C"), "A_B_C");
        assert_eq!(name_component(""), "");
    }
}
