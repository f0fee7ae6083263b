//! Walking a location and sorting the filter lists under it.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::report::{FileStatus, RunSummary};
use crate::rewrite::sort_file;

/// Names never sorted: licences, test lists and lists with their own
/// ordering.
pub const DEFAULT_IGNORE: &[&str] = &[
    "CC-BY-SA.txt",
    "easytest.txt",
    "GPL.txt",
    "MPL.txt",
    "enhancedstats-addon.txt",
    "fanboy-tracking",
    "firefox-regional",
    "other",
    "easylist_cookie_specific_uBO.txt",
    "fanboy_annoyance_specific_uBO.txt",
    "fanboy_notifications_specific_uBO.txt",
    "fanboy_social_specific_uBO.txt",
];

const LIST_EXTENSION: &str = "txt";
const LEFTOVER_EXTENSIONS: &[&str] = &["orig", "temp"];

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// File and directory names to skip.
    pub ignore: Vec<String>,
    /// Report changes without writing them.
    pub check: bool,
    /// Leave `.orig` / `.temp` files in place.
    pub keep_backups: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            check: false,
            keep_backups: false,
        }
    }
}

impl WalkOptions {
    fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|ignored| ignored == name)
    }

    fn prune(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.is_ignored(&name)
    }
}

/// Sort every filter list under `location`, recording each file in `summary`.
pub fn process_location(location: &Path, options: &WalkOptions, summary: &mut RunSummary) -> Result<(), String> {
    if !location.is_dir() {
        return Err(format!("{} does not exist or is not a folder.", location.display()));
    }

    println!();
    println!("Primary location: {}", folder_display(location));

    let walker = WalkDir::new(location)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !options.prune(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            println!("Current directory: {}", folder_display(entry.path()));
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        match extension(entry.path()) {
            Some(ext) if ext == LIST_EXTENSION && !options.is_ignored(&name) => {
                process_file(entry.path(), options, summary);
            }
            Some(ext) if LEFTOVER_EXTENSIONS.contains(&ext.as_str()) && !options.keep_backups => {
                if fs::remove_file(entry.path()).is_ok() {
                    log::debug!("removed leftover {}", entry.path().display());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn process_file(path: &Path, options: &WalkOptions, summary: &mut RunSummary) {
    match sort_file(path, options.check) {
        Ok(false) => summary.record(path, FileStatus::Unchanged, None),
        Ok(true) if options.check => {
            println!("Needs sorting: {}", path.display());
            summary.record(path, FileStatus::NeedsSorting, None);
        }
        Ok(true) => {
            println!("Sorted: {}", path.display());
            summary.record(path, FileStatus::Sorted, None);
        }
        Err(e) => {
            log::error!("{e}");
            summary.record(path, FileStatus::Failed, Some(e.to_string()));
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().into_owned())
}

/// Directory path with a trailing separator.
fn folder_display(path: &Path) -> String {
    let mut folder: PathBuf = path.to_path_buf();
    folder.push("");
    folder.display().to_string()
}
