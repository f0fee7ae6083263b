//! Per-file outcomes of a run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Unchanged,
    Sorted,
    /// Would be rewritten, but the run only checked.
    NeedsSorting,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a run did, in processing order.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn record(&mut self, path: &Path, status: FileStatus, error: Option<String>) {
        self.files.push(FileReport {
            path: path.to_path_buf(),
            status,
            error,
        });
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// Whether any file was or would be rewritten.
    pub fn changed(&self) -> bool {
        self.files
            .iter()
            .any(|f| matches!(f.status, FileStatus::Sorted | FileStatus::NeedsSorting))
    }

    pub fn failures(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        fs::write(path, json + "\n")
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
    }

    pub fn print_totals(&self) {
        println!();
        println!("Files:");
        println!("  Checked:        {}", self.files.len());
        println!("  Unchanged:      {}", self.count(FileStatus::Unchanged));
        println!("  Sorted:         {}", self.count(FileStatus::Sorted));
        println!("  Needs sorting:  {}", self.count(FileStatus::NeedsSorting));
        println!("  Failed:         {}", self.failures());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_covers_sorted_and_pending() {
        let mut summary = RunSummary::default();
        summary.record(Path::new("a.txt"), FileStatus::Unchanged, None);
        summary.record(Path::new("b.txt"), FileStatus::Failed, Some("boom".into()));
        assert!(!summary.changed());
        assert_eq!(summary.failures(), 1);

        summary.record(Path::new("c.txt"), FileStatus::NeedsSorting, None);
        assert!(summary.changed());
    }

    #[test]
    fn serializes_statuses_in_kebab_case() {
        let mut summary = RunSummary::default();
        summary.record(Path::new("a.txt"), FileStatus::NeedsSorting, None);
        summary.record(Path::new("b.txt"), FileStatus::Failed, Some("boom".into()));

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["files"][0]["status"], "needs-sorting");
        assert!(value["files"][0].get("error").is_none());
        assert_eq!(value["files"][1]["status"], "failed");
        assert_eq!(value["files"][1]["error"], "boom");
    }

    #[test]
    fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut summary = RunSummary::default();
        summary.record(Path::new("a.txt"), FileStatus::Sorted, None);

        summary.write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["files"][0]["path"], "a.txt");
        assert_eq!(value["files"][0]["status"], "sorted");
    }
}
