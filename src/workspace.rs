//! Workspace filter
//!
//! The workspace is an ordered set of directory roots. Modules discovered only
//! as dependencies of tracked modules are tracked themselves when their source
//! file lies under one of these roots.

use std::path::{Path, PathBuf};

use crate::error::{LiveImportError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    roots: Vec<PathBuf>,
}

impl Workspace {
    /// Build a workspace from existing directories. Paths are made absolute
    /// without following symbolic links.
    pub fn new<I, P>(directories: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut roots = Vec::new();
        for dir in directories {
            let path = std::path::absolute(dir.as_ref())?;
            if !path.exists() {
                return Err(LiveImportError::Validation(format!(
                    "Path {} does not exist",
                    path.display()
                )));
            }
            if !path.is_dir() {
                return Err(LiveImportError::Validation(format!(
                    "Path {} is not a directory",
                    path.display()
                )));
            }
            roots.push(path);
        }
        Ok(Self { roots })
    }

    /// A workspace with no roots: only directly registered modules are tracked.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The current working directory.
    pub fn current_dir() -> Result<Self> {
        Ok(Self {
            roots: vec![std::env::current_dir()?],
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// True iff `file` is nested under one of the roots.
    pub fn contains(&self, file: &Path) -> bool {
        let Ok(file) = std::path::absolute(file) else {
            return false;
        };
        self.roots.iter().any(|root| file.starts_with(root))
    }
}
