//! Create-or-roll-back file helper
//!
//! [`FileMaker`] records every file and folder it creates. Unless
//! [`FileMaker::commit`] is called, dropping it deletes them again in
//! reverse order, so a multi-step setup that fails half way leaves nothing
//! behind.

use crate::error::{TierError, TierResult};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug)]
enum Made {
    File(PathBuf),
    Dir(PathBuf),
}

/// Tracks created artifacts and removes them unless committed
#[derive(Debug, Default)]
pub struct FileMaker {
    made: Vec<Made>,
    committed: bool,
}

impl FileMaker {
    /// Nothing created yet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` and any missing ancestors
    ///
    /// Returns `false` if it already existed and `exist_ok` is set.
    ///
    /// # Errors
    /// `AlreadyExists` if it exists and `exist_ok` is unset or it is not a
    /// folder, `Io` otherwise.
    pub fn mkdir(&mut self, path: &Path, exist_ok: bool) -> TierResult<bool> {
        if path.exists() {
            return if exist_ok && path.is_dir() {
                Ok(false)
            } else {
                Err(TierError::already_exists(path))
            };
        }
        let missing: Vec<&Path> = path
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .collect();
        for dir in missing.into_iter().rev() {
            fs::create_dir(dir).map_err(|e| TierError::io(dir, e))?;
            info!(path = %dir.display(), "created folder");
            self.made.push(Made::Dir(dir.to_path_buf()));
        }
        Ok(true)
    }

    /// Write a new file
    ///
    /// Returns `false` if it already existed and `exist_ok` is set; the
    /// existing file is left untouched.
    ///
    /// # Errors
    /// `AlreadyExists` if it exists and `exist_ok` is unset, `Io` otherwise.
    pub fn write_file(&mut self, path: &Path, contents: &str, exist_ok: bool) -> TierResult<bool> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return if exist_ok {
                    Ok(false)
                } else {
                    Err(TierError::already_exists(path))
                };
            }
            Err(e) => return Err(TierError::io(path, e)),
        };
        self.made.push(Made::File(path.to_path_buf()));
        file.write_all(contents.as_bytes())
            .map_err(|e| TierError::io(path, e))?;
        info!(path = %path.display(), "created file");
        Ok(true)
    }

    /// Copy `source` to a new file at `dest`
    ///
    /// # Errors
    /// As [`FileMaker::write_file`], or `Io` if `source` cannot be read.
    pub fn copy_file(&mut self, source: &Path, dest: &Path, exist_ok: bool) -> TierResult<bool> {
        let contents = fs::read_to_string(source).map_err(|e| TierError::io(source, e))?;
        self.write_file(dest, &contents, exist_ok)
    }

    /// Take ownership of a file created by other means
    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        self.made.push(Made::File(path.into()));
    }

    /// Paths created so far, in creation order
    pub fn created(&self) -> impl Iterator<Item = &Path> {
        self.made.iter().map(|made| match made {
            Made::File(p) | Made::Dir(p) => p.as_path(),
        })
    }

    /// Keep everything created
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Delete everything created so far, newest first
    pub fn rollback(&mut self) {
        if self.made.is_empty() {
            return;
        }
        warn!(count = self.made.len(), "rolling back created files");
        for made in self.made.drain(..).rev() {
            let (path, result) = match &made {
                Made::File(p) => (p, fs::remove_file(p)),
                Made::Dir(p) => (p, fs::remove_dir(p)),
            };
            match result {
                Ok(()) => info!(path = %path.display(), "removed"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove"),
            }
        }
    }
}

impl Drop for FileMaker {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn drop_without_commit_rolls_back() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        let file = nested.join("x.txt");
        {
            let mut maker = FileMaker::new();
            assert!(maker.mkdir(&nested, false).unwrap());
            assert!(maker.write_file(&file, "hi", false).unwrap());
            assert_eq!(maker.created().count(), 4);
        }
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn commit_keeps_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("keep.txt");
        let mut maker = FileMaker::new();
        maker.write_file(&file, "kept", false).unwrap();
        maker.commit();
        assert_eq!(fs::read_to_string(&file).unwrap(), "kept");
    }

    #[test]
    fn existing_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("old.txt");
        fs::write(&file, "old").unwrap();

        let mut maker = FileMaker::new();
        assert!(!maker.mkdir(dir.path(), true).unwrap());
        assert!(maker.mkdir(dir.path(), false).unwrap_err().is_already_exists());
        assert!(!maker.write_file(&file, "new", true).unwrap());
        assert!(maker.write_file(&file, "new", false).unwrap_err().is_already_exists());
        assert!(maker.mkdir(&file, true).unwrap_err().is_already_exists());
        drop(maker);

        assert_eq!(fs::read_to_string(&file).unwrap(), "old");
    }

    #[test]
    fn rollback_leaves_preexisting_folders() {
        let dir = TempDir::new().unwrap();
        let tracked = dir.path().join("made-elsewhere.json");
        fs::write(&tracked, "{}").unwrap();
        let mut maker = FileMaker::new();
        maker.track_file(&tracked);
        maker.rollback();
        assert!(!tracked.exists());
        assert!(dir.path().exists());
    }
}
