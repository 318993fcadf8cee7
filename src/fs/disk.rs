use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{validate_name, ContentStream, DirEntry, ScopedFs};
use crate::error::{RemError, Result};

/// Production filesystem rooted at a single directory.
///
/// Writes go through a temp file in the target directory followed by a
/// rename, so a content file is either fully present or absent.
pub struct DiskFs {
    root: PathBuf,
    default_root: bool,
}

impl DiskFs {
    /// Resolve `location` to a root directory and create it if missing.
    ///
    /// - empty: the default root, `$HOME/.config/rem`
    /// - absolute: used as given
    /// - relative: joined under the default base
    pub fn with_root(location: &str) -> Result<Self> {
        let (root, default_root) = if location.is_empty() {
            (default_base()?, true)
        } else if Path::new(location).is_absolute() {
            (PathBuf::from(location), false)
        } else {
            validate_name(location)?;
            (default_base()?.join(location), false)
        };
        fs::create_dir_all(&root)?;
        Ok(Self { root, default_root })
    }

    /// Whether this filesystem sits on the default root. Only the default
    /// root is eligible for legacy migration.
    pub fn is_default_root(&self) -> bool {
        self.default_root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

fn default_base() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        RemError::Io(std::io::Error::new(
            ErrorKind::NotFound,
            "home directory not available",
        ))
    })?;
    Ok(dirs.home_dir().join(".config").join("rem"))
}

impl ScopedFs for DiskFs {
    fn open(&self, name: &str) -> Result<Box<dyn ContentStream>> {
        let path = self.resolve(name)?;
        match fs::File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RemError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>> {
        let path = self.resolve(name)?;
        let iter = match fs::read_dir(&path) {
            Ok(iter) => iter,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RemError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for entry in iter {
            let entry = entry?;
            // Names that are not valid UTF-8 cannot be addressed through
            // this interface; skip them.
            let Some(entry_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(DirEntry {
                name: entry_name,
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn write_file(&self, name: &str, bytes: &[u8], mode: u32) -> Result<()> {
        let path = self.resolve(name)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let tmp = parent.join(format!(".write-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, bytes)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RemError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn mkdir_all(&self, name: &str, mode: u32) -> Result<()> {
        let path = self.resolve(name)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new()
                .recursive(true)
                .mode(mode)
                .create(&path)?;
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
            fs::create_dir_all(&path)?;
        }
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
