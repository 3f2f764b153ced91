use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

const DATABASE_FILE: &str = "catalog.db";

/// Directory layout of a Chartpaper store.
///
/// The store is a single directory holding the SQLite catalog. The directory
/// is created on [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn db_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.db_path().is_file()
    }
}
