use crate::error::ToolError;
use crate::gateway::MetadataGateway;
use crate::metadata::FieldSelection;
use crate::path_guard::{PathValidator, SafePath};
use crate::sanitize::truncate_filename_if_needed;
use crate::template::{
    render, RenderContext, DEFAULT_DATE_FORMAT, DEFAULT_TEMPLATE, DEFAULT_TIME_FORMAT,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_COLLISION_ATTEMPTS: usize = 1000;
pub const DEFAULT_MAX_FILENAME_LEN: usize = 240;

#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub template: String,
    pub date_format: String,
    pub time_format: String,
    pub dry_run: bool,
    pub backup: bool,
    pub counter_start: u32,
    pub max_collision_attempts: usize,
    pub max_filename_len: usize,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            dry_run: true,
            backup: true,
            counter_start: 1,
            max_collision_attempts: DEFAULT_MAX_COLLISION_ATTEMPTS,
            max_filename_len: DEFAULT_MAX_FILENAME_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameStatus {
    Preview,
    Renamed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub filepath: String,
    pub original_name: String,
    pub new_name: Option<String>,
    pub status: RenameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenameOutcome {
    fn failed(raw: &str, err: &ToolError) -> Self {
        Self {
            filepath: raw.to_string(),
            original_name: Path::new(raw)
                .file_name()
                .map(|v| v.to_string_lossy().to_string())
                .unwrap_or_else(|| raw.to_string()),
            new_name: None,
            status: RenameStatus::Error,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameReport {
    pub dry_run: bool,
    pub outcomes: Vec<RenameOutcome>,
    pub renamed: usize,
    pub previewed: usize,
    pub errors: usize,
    pub backup_dir: Option<PathBuf>,
}

impl RenameReport {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let heading = if self.dry_run {
            "Rename preview (dry run)"
        } else {
            "Rename results"
        };
        let _ = writeln!(out, "{heading}: {} file(s)", self.outcomes.len());
        out.push('\n');

        for outcome in &self.outcomes {
            match outcome.status {
                RenameStatus::Error => {
                    let _ = writeln!(
                        out,
                        "[error] {}: {}",
                        outcome.original_name,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    );
                }
                status => {
                    let label = if status == RenameStatus::Preview {
                        "preview"
                    } else {
                        "renamed"
                    };
                    let _ = writeln!(
                        out,
                        "[{label}] {} -> {}",
                        outcome.original_name,
                        outcome.new_name.as_deref().unwrap_or_default()
                    );
                }
            }
        }

        out.push('\n');
        let done = if self.dry_run {
            format!("{} to rename", self.previewed)
        } else {
            format!("{} renamed", self.renamed)
        };
        let _ = writeln!(out, "Summary: {done}, {} error(s)", self.errors);
        if let Some(dir) = &self.backup_dir {
            let _ = writeln!(out, "Backup directory: {}", dir.display());
        }
        if self.dry_run {
            out.push_str("Dry run: no files were changed. Set dryRun=false to apply.\n");
        }
        out
    }
}

/// State threaded through one batch invocation.
struct RenameBatch<'a> {
    validator: &'a PathValidator,
    gateway: &'a dyn MetadataGateway,
    options: &'a RenameOptions,
    counter: u32,
    backup_dir: Option<PathBuf>,
    reserved: HashSet<PathBuf>,
    /// Sources already moved away (or planned to be, on a dry run).
    vacated: HashSet<PathBuf>,
}

/// Renames every file in `filepaths` according to `options.template`.
///
/// Per-file failures become [`RenameStatus::Error`] outcomes; only
/// tool-level problems (empty input, backup directory creation) fail the
/// whole call.
pub fn rename_batch(
    validator: &PathValidator,
    gateway: &dyn MetadataGateway,
    filepaths: &[String],
    options: &RenameOptions,
) -> Result<RenameReport, ToolError> {
    if filepaths.is_empty() {
        return Err(ToolError::InvalidInput(
            "filepaths must be a non-empty array".to_string(),
        ));
    }

    let backup_dir = if options.backup && !options.dry_run {
        let dir = create_backup_dir(validator.root(), Local::now().naive_local())?;
        info!(backup_dir = %dir.display(), "created backup directory");
        Some(dir)
    } else {
        None
    };

    let mut batch = RenameBatch {
        validator,
        gateway,
        options,
        counter: options.counter_start,
        backup_dir,
        reserved: HashSet::new(),
        vacated: HashSet::new(),
    };

    let outcomes: Vec<RenameOutcome> = filepaths
        .iter()
        .map(|raw| {
            let counter = batch.next_counter();
            match batch.process_item(raw, counter) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(filepath = %raw, error = %err, "rename item failed");
                    RenameOutcome::failed(raw, &err)
                }
            }
        })
        .collect();

    let count = |status: RenameStatus| outcomes.iter().filter(|o| o.status == status).count();
    Ok(RenameReport {
        dry_run: options.dry_run,
        renamed: count(RenameStatus::Renamed),
        previewed: count(RenameStatus::Preview),
        errors: count(RenameStatus::Error),
        backup_dir: batch.backup_dir,
        outcomes,
    })
}

impl RenameBatch<'_> {
    /// Every input consumes one counter value, whatever its outcome.
    fn next_counter(&mut self) -> u32 {
        let current = self.counter;
        self.counter = self.counter.saturating_add(1);
        current
    }

    fn process_item(&mut self, raw: &str, counter: u32) -> Result<RenameOutcome, ToolError> {
        let safe = self.validator.validate(raw)?;
        let record = self.gateway.extract(&safe, &FieldSelection::rename())?;

        let original_stem = safe.file_stem();
        let ctx = RenderContext {
            original: &original_stem,
            counter,
            date_format: &self.options.date_format,
            time_format: &self.options.time_format,
            fallback_time: Local::now().naive_local(),
        };
        let extension = safe.extension_with_dot();
        let stem = truncate_filename_if_needed(
            &render(&self.options.template, record.as_ref(), &ctx),
            &extension,
            self.options.max_filename_len,
        );

        let target = self.resolve_collision(&safe, &stem, &extension)?;
        self.reserved.insert(target.clone());
        let new_name = target
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();

        let status = if self.options.dry_run {
            debug!(from = %safe, to = %target.display(), "rename preview");
            RenameStatus::Preview
        } else if target == safe.as_path() {
            debug!(path = %safe, "name already matches template");
            RenameStatus::Renamed
        } else {
            match &self.backup_dir {
                Some(backup_dir) => move_via_backup(safe.as_path(), backup_dir, &target)?,
                None => fs::rename(safe.as_path(), &target).map_err(|err| {
                    ToolError::Rename(format!(
                        "{} -> {}: {err}",
                        safe,
                        target.display()
                    ))
                })?,
            }
            info!(from = %safe, to = %target.display(), "renamed file");
            RenameStatus::Renamed
        };
        if target != safe.as_path() {
            self.vacated.insert(safe.as_path().to_path_buf());
        }

        Ok(RenameOutcome {
            filepath: raw.to_string(),
            original_name: safe.file_name(),
            new_name: Some(new_name),
            status,
            error: None,
        })
    }

    /// Probes `stem.ext`, `stem_1.ext`, `stem_2.ext`, ... up to the
    /// configured attempt limit. The file's own current path counts as free.
    fn resolve_collision(
        &self,
        original: &SafePath,
        stem: &str,
        extension: &str,
    ) -> Result<PathBuf, ToolError> {
        let parent = original.as_path().parent().ok_or_else(|| {
            ToolError::Rename(format!("{original} has no parent directory"))
        })?;

        let candidate = parent.join(format!("{stem}{extension}"));
        if self.is_available(&candidate, original.as_path()) {
            return Ok(candidate);
        }

        for n in 1..=self.options.max_collision_attempts {
            let suffixed = suffixed_stem(stem, n, extension, self.options.max_filename_len);
            let candidate = parent.join(format!("{suffixed}{extension}"));
            if self.is_available(&candidate, original.as_path()) {
                return Ok(candidate);
            }
        }

        Err(ToolError::Rename(format!(
            "no free name for {stem}{extension} after {} attempts",
            self.options.max_collision_attempts
        )))
    }

    fn is_available(&self, candidate: &Path, original: &Path) -> bool {
        if self.reserved.contains(candidate) {
            return false;
        }
        if candidate == original || self.vacated.contains(candidate) {
            return true;
        }
        !candidate.exists()
    }
}

/// Appends `_n` to `stem`, shortening the stem first so the suffix always
/// fits within `limit`.
fn suffixed_stem(stem: &str, n: usize, extension: &str, limit: usize) -> String {
    let suffix = format!("_{n}");
    let base = truncate_filename_if_needed(stem, &format!("{suffix}{extension}"), limit);
    format!("{base}{suffix}")
}

/// Creates `backup_<timestamp>` under `root`, probing `_1`, `_2`, ... when
/// the name is taken. `create_dir` fails on an existing directory, so two
/// batches can never end up sharing one.
fn create_backup_dir(root: &Path, now: NaiveDateTime) -> Result<PathBuf, ToolError> {
    let base = format!("backup_{}", now.format("%Y%m%d_%H%M%S"));

    for n in 0..=DEFAULT_MAX_COLLISION_ATTEMPTS {
        let name = if n == 0 {
            base.clone()
        } else {
            format!("{base}_{n}")
        };
        let dir = root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(ToolError::Rename(format!(
                    "cannot create backup directory {}: {err}",
                    dir.display()
                )))
            }
        }
    }

    Err(ToolError::Rename(format!(
        "no free backup directory name for {base}"
    )))
}

/// Moves the original into the backup directory, then copies it from there
/// to `target`. The backup keeps the original bytes.
fn move_via_backup(source: &Path, backup_dir: &Path, target: &Path) -> Result<(), ToolError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| ToolError::Rename(format!("{} has no file name", source.display())))?;
    let backup_path = unique_backup_path(backup_dir.join(file_name))?;

    fs::rename(source, &backup_path).map_err(|err| {
        ToolError::Rename(format!(
            "backup move failed: {} -> {}: {err}",
            source.display(),
            backup_path.display()
        ))
    })?;

    if let Err(err) = copy_to_new_file(&backup_path, target) {
        let restore = fs::rename(&backup_path, source);
        let mut message = format!(
            "copy from backup failed: {} -> {}: {err}",
            backup_path.display(),
            target.display()
        );
        if let Err(restore_err) = restore {
            let _ = write!(
                message,
                " (original kept at {}: {restore_err})",
                backup_path.display()
            );
        }
        return Err(ToolError::Rename(message));
    }

    Ok(())
}

/// Never replaces an existing `to`. A partially written `to` is removed.
fn copy_to_new_file(from: &Path, to: &Path) -> io::Result<()> {
    let mut reader = fs::File::open(from)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(to)?;

    let result = io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.sync_all())
        .and_then(|_| fs::metadata(from))
        .and_then(|meta| fs::set_permissions(to, meta.permissions()));
    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(to);
    }
    result
}

fn unique_backup_path(candidate: PathBuf) -> Result<PathBuf, ToolError> {
    unique_backup_path_within(candidate, DEFAULT_MAX_COLLISION_ATTEMPTS)
}

fn unique_backup_path_within(
    candidate: PathBuf,
    max_attempts: usize,
) -> Result<PathBuf, ToolError> {
    if !candidate.exists() {
        return Ok(candidate);
    }

    let parent = candidate.parent().unwrap_or_else(|| Path::new("."));
    let stem = candidate
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = candidate
        .extension()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();

    for n in 1..=max_attempts {
        let mut name = format!("{}_{:03}", stem, n);
        if !ext.is_empty() {
            name.push('.');
            name.push_str(&ext);
        }
        let next = parent.join(name);
        if !next.exists() {
            return Ok(next);
        }
    }

    Err(ToolError::Rename(format!(
        "no free backup name for {} after {max_attempts} attempts",
        candidate.display()
    )))
}
