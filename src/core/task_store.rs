//! Append-only task log.
//!
//! Tasks are stored as CSV rows under a single header line. Rows are only
//! ever appended; nothing in voicetask rewrites or deletes them.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Task, DATE_FORMAT, TIME_FORMAT};

/// Header row of the task log
pub const HEADER: [&str; 3] = ["Task Name", "Due Date", "Deadline Time"];

/// Errors from the task log
#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("Failed to write task log {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read task log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row {line} in task log: {reason}")]
    Malformed { line: u64, reason: String },
}

impl TaskStoreError {
    fn persistence(path: &Path, source: impl Into<std::io::Error>) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

/// CSV-backed append-only task log
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the log at the configured location
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(crate::config::paths::task_log()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log with its header row if it does not exist yet.
    ///
    /// Calling this on an existing log is a no-op.
    pub fn ensure_initialized(&self) -> Result<(), TaskStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| TaskStoreError::persistence(&self.path, e))?;
            }
        }

        // create_new fails if another writer got there first, which is fine
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %self.path.display(), "Task log already exists");
                return Ok(());
            }
            Err(e) => return Err(TaskStoreError::persistence(&self.path, e)),
        };

        self.write_record(file, &HEADER)?;
        info!(path = %self.path.display(), "Created task log");
        Ok(())
    }

    /// Append one task row. The row is synced to disk before this returns.
    ///
    /// A missing log is created (with its header) first.
    pub fn append(&self, task: &Task) -> Result<(), TaskStoreError> {
        self.ensure_initialized()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TaskStoreError::persistence(&self.path, e))?;

        let due_date = task.due_date_string();
        let deadline = task.deadline_string();
        self.write_record(file, &[task.name(), due_date.as_str(), deadline.as_str()])?;

        debug!(task = %task.name(), "Appended task to log");
        Ok(())
    }

    /// Write a single record under an exclusive lock and sync it
    fn write_record(&self, file: File, record: &[&str]) -> Result<(), TaskStoreError> {
        file.lock_exclusive()
            .map_err(|e| TaskStoreError::persistence(&self.path, e))?;

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(record)
            .map_err(|e| TaskStoreError::persistence(&self.path, e))?;
        writer
            .flush()
            .map_err(|e| TaskStoreError::persistence(&self.path, e))?;

        let file = writer
            .into_inner()
            .map_err(|e| TaskStoreError::persistence(&self.path, e.into_error()))?;
        file.sync_data()
            .map_err(|e| TaskStoreError::persistence(&self.path, e))?;

        // Lock is released when file is dropped
        Ok(())
    }

    /// Read every task in log order. A missing log reads as empty.
    pub fn read_all(&self) -> Result<Vec<Task>, TaskStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let read_err = |source: csv::Error| TaskStoreError::Read {
            path: self.path.clone(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(read_err)?;

        let mut tasks = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            tasks.push(parse_row(&record, line)?);
        }

        Ok(tasks)
    }
}

fn parse_row(record: &csv::StringRecord, line: u64) -> Result<Task, TaskStoreError> {
    let malformed = |reason: String| TaskStoreError::Malformed { line, reason };

    if record.len() != HEADER.len() {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            HEADER.len(),
            record.len()
        )));
    }

    let due_date = NaiveDate::parse_from_str(&record[1], DATE_FORMAT)
        .map_err(|e| malformed(format!("bad due date '{}': {}", &record[1], e)))?;
    let deadline = NaiveTime::parse_from_str(&record[2], TIME_FORMAT)
        .map_err(|e| malformed(format!("bad deadline '{}': {}", &record[2], e)))?;

    Task::new(&record[0], due_date, deadline).map_err(|e| malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task(name: &str) -> Task {
        Task::new(
            name,
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_initialize_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let store = TaskStore::new(temp.path().join("nested/dir/tasks.csv"));

        store.ensure_initialized().unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "Task Name,Due Date,Deadline Time\n");
    }

    #[test]
    fn test_names_with_commas_are_quoted() {
        let temp = TempDir::new().unwrap();
        let store = TaskStore::new(temp.path().join("tasks.csv"));
        store.ensure_initialized().unwrap();

        store.append(&task("milk, eggs, bread")).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.ends_with("\"milk, eggs, bread\",2026-10-20,09:00\n"));

        let tasks = store.read_all().unwrap();
        assert_eq!(tasks[0].name(), "milk, eggs, bread");
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = TaskStore::new(temp.path().join("absent.csv"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.csv");
        std::fs::write(
            &path,
            "Task Name,Due Date,Deadline Time\npay rent,2026-10-20,09:00\nbad,tomorrow,09:00\n",
        )
        .unwrap();

        let err = TaskStore::new(&path).read_all().unwrap_err();
        assert!(matches!(err, TaskStoreError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_append_to_unwritable_location_fails() {
        let temp = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let store = TaskStore::new(temp.path());

        let err = store.append(&task("pay rent")).unwrap_err();
        assert!(matches!(err, TaskStoreError::Persistence { .. }));
    }
}
