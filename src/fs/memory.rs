use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::{validate_name, ContentStream, DirEntry, ScopedFs};
use crate::error::{RemError, Result};

/// In-memory filesystem for testing.
///
/// Uses `RefCell` for interior mutability since the store is
/// single-threaded. Files and directories are keyed by their root-relative
/// name with `/` separators, mirroring the on-disk layout.
pub struct MemFs {
    root: PathBuf,
    files: RefCell<BTreeMap<String, Vec<u8>>>,
    dirs: RefCell<BTreeSet<String>>,
    fail_writes: RefCell<bool>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self {
            root: PathBuf::from("memory://rem"),
            files: RefCell::new(BTreeMap::new()),
            dirs: RefCell::new(BTreeSet::new()),
            fail_writes: RefCell::new(false),
        }
    }
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, for exercising error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    /// Test helper: whether a file exists under `name`.
    pub fn contains_file(&self, name: &str) -> bool {
        self.files.borrow().contains_key(name)
    }

    fn record_parents(&self, name: &str) {
        let mut dirs = self.dirs.borrow_mut();
        let mut prefix = String::new();
        for segment in name.split('/') {
            if !prefix.is_empty() {
                dirs.insert(prefix.clone());
                prefix.push('/');
            }
            prefix.push_str(segment);
        }
    }

    fn dir_exists(&self, name: &str) -> bool {
        if self.dirs.borrow().contains(name) {
            return true;
        }
        let child_prefix = format!("{}/", name);
        self.files
            .borrow()
            .keys()
            .any(|k| k.starts_with(&child_prefix))
    }
}

impl ScopedFs for MemFs {
    fn open(&self, name: &str) -> Result<Box<dyn ContentStream>> {
        validate_name(name)?;
        match self.files.borrow().get(name) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(RemError::NotFound(name.to_string())),
        }
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        validate_name(name)?;
        if !self.dir_exists(name) {
            return Err(RemError::NotFound(name.to_string()));
        }

        let child_prefix = format!("{}/", name);
        let mut children: BTreeMap<String, bool> = BTreeMap::new();

        for file in self.files.borrow().keys() {
            if let Some(rest) = file.strip_prefix(&child_prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => children.insert(dir.to_string(), true),
                    None => children.insert(rest.to_string(), false),
                };
            }
        }
        for dir in self.dirs.borrow().iter() {
            if let Some(rest) = dir.strip_prefix(&child_prefix) {
                let first = rest.split('/').next().unwrap_or(rest);
                children.insert(first.to_string(), true);
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    fn write_file(&self, name: &str, bytes: &[u8], _mode: u32) -> Result<()> {
        validate_name(name)?;
        if *self.fail_writes.borrow() {
            return Err(RemError::Io(std::io::Error::other(
                "simulated write failure",
            )));
        }
        self.record_parents(name);
        self.files.borrow_mut().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        match self.files.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(RemError::NotFound(name.to_string())),
        }
    }

    fn mkdir_all(&self, name: &str, _mode: u32) -> Result<()> {
        validate_name(name)?;
        self.record_parents(name);
        self.dirs.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
