//! Filesystem collaborator
//!
//! The collection only touches storage through [`Filesystem`]. Two
//! implementations ship with the crate: [`LocalFilesystem`] for real
//! directories and [`MemoryFilesystem`] for previews and tests.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Storage operations used by `IocList`
///
/// No ordering is assumed beyond each file being yielded once.
pub trait Filesystem {
    /// Every file under `directory`, recursively, as `(full path, file name)`
    ///
    /// # Errors
    /// When `directory` itself cannot be read
    fn list_files(&self, directory: &Path) -> io::Result<Vec<(PathBuf, String)>>;

    /// Whole file contents
    ///
    /// # Errors
    /// Any I/O failure
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace file contents, creating the file if needed
    ///
    /// # Errors
    /// Any I/O failure (permission, missing parent, disk full)
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Real filesystem via `std::fs` and `walkdir`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create local filesystem handle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFilesystem {
    fn list_files(&self, directory: &Path) -> io::Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push((entry.into_path(), name));
        }
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    writes: Vec<PathBuf>,
    fail_writes: bool,
}

/// In-memory filesystem that records every write
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    state: Mutex<MemoryState>,
}

impl MemoryFilesystem {
    /// Create empty filesystem
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file without counting it as a write
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.state.lock().files.insert(path.into(), contents.into());
    }

    /// File contents
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    /// Paths written through [`Filesystem::write_file`], in order
    #[must_use]
    pub fn writes(&self) -> Vec<PathBuf> {
        self.state.lock().writes.clone()
    }

    /// Number of writes so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Make every subsequent write fail (simulates a full disk)
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }
}

impl Filesystem for MemoryFilesystem {
    fn list_files(&self, directory: &Path) -> io::Result<Vec<(PathBuf, String)>> {
        let state = self.state.lock();
        Ok(state
            .files
            .keys()
            .filter(|path| path.starts_with(directory))
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some((path.clone(), name))
            })
            .collect())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.contents(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display()))
        })
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "write refused: no space left"));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        state.writes.push(path.to_path_buf());
        Ok(())
    }
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    fn list_files(&self, directory: &Path) -> io::Result<Vec<(PathBuf, String)>> {
        (**self).list_files(directory)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        (**self).write_file(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_lists_only_under_directory() {
        let fs = MemoryFilesystem::new();
        fs.insert("/data/a.ioc", "a");
        fs.insert("/data/sub/b.ioc", "b");
        fs.insert("/other/c.ioc", "c");

        let names: Vec<_> = fs
            .list_files(Path::new("/data"))
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(names, vec!["a.ioc", "b.ioc"]);
    }

    #[test]
    fn memory_records_writes() {
        let fs = MemoryFilesystem::new();
        fs.insert("/data/a.ioc", "a");
        assert_eq!(fs.write_count(), 0);

        fs.write_file(Path::new("/data/a.ioc"), b"b").unwrap();
        assert_eq!(fs.write_count(), 1);
        assert_eq!(fs.contents(Path::new("/data/a.ioc")).unwrap(), b"b");
    }

    #[test]
    fn memory_write_failure() {
        let fs = MemoryFilesystem::new();
        fs.set_fail_writes(true);
        assert!(fs.write_file(Path::new("/x.ioc"), b"").is_err());
        assert_eq!(fs.write_count(), 0);
    }

    #[test]
    fn local_walks_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("top.ioc"), "x").unwrap();
        std::fs::write(dir.path().join("nested").join("deep.IOC"), "y").unwrap();

        let mut names: Vec<_> = LocalFilesystem::new()
            .list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["deep.IOC", "top.ioc"]);
    }

    #[test]
    fn local_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(LocalFilesystem::new().list_files(&missing).is_err());
    }
}
