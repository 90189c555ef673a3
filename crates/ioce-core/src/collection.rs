//! Document collection
//!
//! [`IocList`] owns every loaded [`Ioc`], keyed by file path. It drives
//! directory ingestion, the create/clone workflows, and decides which
//! documents need to be written on save.
//!
//! ```text
//! Filesystem → bytes → XML tree → strip → Ioc ─┐
//!                                              ├→ IocList ─ save → Filesystem
//!                 Node factory (create/clone) ─┘
//! ```

use crate::config::EditorConfig;
use crate::document::Ioc;
use crate::error::CollectionError;
use crate::factory;
use crate::fs::{Filesystem, LocalFilesystem};
use crate::schema::SchemaVersion;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Name given to newly created documents
pub const NEW_DOCUMENT_NAME: &str = "*New IOC*";

/// Description given to newly created documents
pub const NEW_DOCUMENT_DESCRIPTION: &str = "ioce generated IOC";

/// Result of loading one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Document is now held by the collection
    Loaded {
        version: SchemaVersion,
        /// Construction synthesized missing fields
        repaired: bool,
    },
    /// File was skipped
    Failed { reason: String },
}

/// Per-file entry of a [`LoadReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: LoadOutcome,
}

/// Summary of [`IocList::open`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Directory that was opened
    pub directory: PathBuf,
    /// Files carrying the document extension, in listing order
    pub files: Vec<FileOutcome>,
}

impl LoadReport {
    /// Number of documents loaded
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, LoadOutcome::Loaded { .. }))
            .count()
    }

    /// Files that were skipped
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            LoadOutcome::Failed { reason } => Some((f.path.as_path(), reason.as_str())),
            LoadOutcome::Loaded { .. } => None,
        })
    }

    /// Number of files skipped
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.files.len() - self.loaded_count()
    }
}

impl Display for LoadReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} documents loaded, {} skipped",
            self.directory.display(),
            self.loaded_count(),
            self.failed_count()
        )
    }
}

/// Summary of [`IocList::save`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Paths written, sorted
    pub written: Vec<PathBuf>,
}

/// Set of documents from one directory
#[derive(Debug)]
pub struct IocList<F: Filesystem = LocalFilesystem> {
    fs: F,
    config: EditorConfig,
    root: Option<PathBuf>,
    documents: HashMap<PathBuf, Ioc>,
}

impl IocList<LocalFilesystem> {
    /// Collection over the local filesystem
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_filesystem(LocalFilesystem::new())
    }
}

impl Default for IocList<LocalFilesystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Filesystem> IocList<F> {
    /// Collection over a supplied filesystem
    #[inline]
    #[must_use]
    pub fn with_filesystem(fs: F) -> Self {
        Self {
            fs,
            config: EditorConfig::default(),
            root: None,
            documents: HashMap::new(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Filesystem collaborator
    #[inline]
    #[must_use]
    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Directory currently open
    #[inline]
    #[must_use]
    pub fn root_directory(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Replace the collection with every document under `directory`
    ///
    /// Loading is best-effort: a file that cannot be read, parsed, or
    /// recognized is skipped and reported, never fatal to the batch.
    ///
    /// # Errors
    /// `CollectionError::Filesystem` only when `directory` itself cannot be listed
    pub fn open(&mut self, directory: impl AsRef<Path>) -> Result<LoadReport, CollectionError> {
        let directory = std::path::absolute(directory.as_ref())
            .map_err(|e| CollectionError::filesystem(directory.as_ref(), e))?;

        self.documents.clear();
        self.root = None;

        let listing = self
            .fs
            .list_files(&directory)
            .map_err(|e| CollectionError::filesystem(&directory, e))?;
        self.root = Some(directory.clone());

        let mut report = LoadReport {
            directory,
            files: Vec::new(),
        };
        for (path, name) in listing {
            if !self.config.matches_extension(&name) {
                continue;
            }

            let outcome = match self.load_file(&path) {
                Ok(ioc) => {
                    tracing::debug!(path = %path.display(), id = ioc.identifier(), "loaded");
                    let outcome = LoadOutcome::Loaded {
                        version: ioc.schema_version(),
                        repaired: ioc.was_repaired(),
                    };
                    self.documents.insert(path.clone(), ioc);
                    outcome
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping file: {}", e);
                    LoadOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.files.push(FileOutcome { path, outcome });
        }

        tracing::info!("{}", report);
        Ok(report)
    }

    /// Load a single file without adding it to the collection
    ///
    /// # Errors
    /// - `CollectionError::Filesystem` if the file cannot be read
    /// - `CollectionError::Document` if it is malformed or unrecognized
    pub fn load_file(&self, path: &Path) -> Result<Ioc, CollectionError> {
        let bytes = self
            .fs
            .read_file(path)
            .map_err(|e| CollectionError::filesystem(path, e))?;
        Ok(Ioc::parse_bytes(&bytes)?)
    }

    /// Add a brand-new document under the open directory
    ///
    /// The document is dirty until its first save. Returns its path.
    ///
    /// # Errors
    /// `CollectionError::NoDirectoryOpen` before [`IocList::open`]
    pub fn create(
        &mut self,
        author: &str,
        version: SchemaVersion,
    ) -> Result<PathBuf, CollectionError> {
        let root = factory::blank_document(
            version,
            NEW_DOCUMENT_NAME,
            NEW_DOCUMENT_DESCRIPTION,
            author,
        );
        let ioc = Ioc::unsaved(root)?;
        let path = self.path_for(ioc.identifier())?;

        tracing::debug!(path = %path.display(), %version, "created document");
        self.documents.insert(path.clone(), ioc);
        Ok(path)
    }

    /// Copy a held document under a fresh identifier
    ///
    /// The copy gets new created/modified stamps and is dirty until its
    /// first save. Returns its path.
    ///
    /// # Errors
    /// - `CollectionError::UnknownDocument` if `source` is not held
    /// - `CollectionError::NoDirectoryOpen` before [`IocList::open`]
    pub fn clone_document(&mut self, source: &Path) -> Result<PathBuf, CollectionError> {
        let tree = self
            .documents
            .get(source)
            .ok_or_else(|| CollectionError::UnknownDocument(source.to_path_buf()))?
            .working_tree()
            .clone();

        let id = factory::new_identifier();
        let path = self.path_for(&id)?;

        let mut ioc = Ioc::unsaved(tree)?;
        ioc.set_identifier(&id);
        ioc.mark_modified_now();
        ioc.mark_created_now();

        tracing::debug!(source = %source.display(), path = %path.display(), "cloned document");
        self.documents.insert(path.clone(), ioc);
        Ok(path)
    }

    /// Write `path`, or every held document when `None`, if dirty
    ///
    /// Each written document gets a fresh `last-modified` stamp and becomes
    /// clean. Unchanged documents are not touched.
    ///
    /// # Errors
    /// - `CollectionError::UnknownDocument` if `path` is not held
    /// - `CollectionError::Filesystem` on the first failed write; documents
    ///   written before it stay saved, the failed one stays dirty
    pub fn save(&mut self, path: Option<&Path>) -> Result<SaveReport, CollectionError> {
        let mut targets: Vec<PathBuf> = match path {
            Some(path) if self.documents.contains_key(path) => vec![path.to_path_buf()],
            Some(path) => return Err(CollectionError::UnknownDocument(path.to_path_buf())),
            None => self.documents.keys().cloned().collect(),
        };
        targets.sort();

        let mut report = SaveReport::default();
        for target in targets {
            let Some(ioc) = self.documents.get_mut(&target) else {
                continue;
            };
            if !ioc.is_dirty() {
                continue;
            }

            ioc.mark_modified_now();
            let text = ioc.to_xml_string(self.config.indent);
            self.fs
                .write_file(&target, text.as_bytes())
                .map_err(|e| CollectionError::filesystem(&target, e))?;
            ioc.mark_saved();

            tracing::debug!(path = %target.display(), "saved");
            report.written.push(target);
        }

        if !report.written.is_empty() {
            tracing::info!("saved {} documents", report.written.len());
        }
        Ok(report)
    }

    /// Document at `path`
    #[inline]
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Ioc> {
        self.documents.get(path)
    }

    /// Document at `path` (mutable)
    #[inline]
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Ioc> {
        self.documents.get_mut(path)
    }

    /// Evict a document without saving it
    #[inline]
    pub fn remove(&mut self, path: &Path) -> Option<Ioc> {
        self.documents.remove(path)
    }

    /// All documents, unordered
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Ioc)> {
        self.documents.iter().map(|(p, d)| (p.as_path(), d))
    }

    /// All held paths, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<_> = self.documents.keys().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }

    /// Paths of documents a save would write, sorted
    #[must_use]
    pub fn dirty_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<_> = self
            .documents
            .iter()
            .filter(|(_, d)| d.is_dirty())
            .map(|(p, _)| p.as_path())
            .collect();
        paths.sort();
        paths
    }

    /// Number of documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if no documents are held
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, CollectionError> {
        let root = self.root.as_ref().ok_or(CollectionError::NoDirectoryOpen)?;
        Ok(root.join(format!("{id}.{}", self.config.extension)))
    }
}
