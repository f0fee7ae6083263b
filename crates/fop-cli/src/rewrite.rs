//! Sorting one filter list file in place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use fop_sorter::sort_text;

/// Error type for rewriting a single file.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("'{}' is not valid UTF-8: {source}", path.display())]
    Encoding { path: PathBuf, source: FromUtf8Error },
    #[error("Failed to write a temporary file for '{}': {source}", path.display())]
    Temporary { path: PathBuf, source: io::Error },
    #[error("Failed to replace '{}': {source}", path.display())]
    Replace { path: PathBuf, source: io::Error },
}

/// Sort the file at `path`, returning whether its content changed.
///
/// With `dry_run` the file is never written.
pub fn sort_file(path: &Path, dry_run: bool) -> Result<bool, RewriteError> {
    let bytes = fs::read(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|source| RewriteError::Encoding {
        path: path.to_path_buf(),
        source,
    })?;

    let sorted = sort_text(&text);
    if sorted == text {
        return Ok(false);
    }
    if !dry_run {
        replace_contents(path, sorted.as_bytes())?;
    }
    Ok(true)
}

/// Write `contents` to a sibling temporary file and swap it into place.
///
/// The temporary file is removed if anything fails before the swap.
pub fn replace_contents(path: &Path, contents: &[u8]) -> Result<(), RewriteError> {
    let temporary = |source| RewriteError::Temporary {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::Builder::new()
        .prefix(".fop-")
        .suffix(".temp")
        .tempfile_in(dir)
        .map_err(temporary)?;
    file.write_all(contents).map_err(temporary)?;
    file.as_file().sync_all().map_err(temporary)?;

    if let Ok(metadata) = fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(temporary)?;
    }

    match file.persist(path) {
        Ok(_) => Ok(()),
        Err(err) => {
            log::debug!("rename onto '{}' failed ({}), removing it first", path.display(), err.error);
            // Some platforms refuse to rename onto an existing file.
            if let Err(remove_err) = fs::remove_file(path) {
                log::debug!("removing '{}' before the retry failed: {}", path.display(), remove_err);
            }
            err.file
                .persist(path)
                .map(|_| ())
                .map_err(|err| RewriteError::Replace {
                    path: path.to_path_buf(),
                    source: err.error,
                })
        }
    }
}
