//! Source tree dependency graph
//!
//! Static view of every module under a directory, for inspecting reload
//! schedules without a live runtime. Every module is a traversal root, so the
//! schedule shows what a session importing all of them would reload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{LiveImportError, Result};
use crate::imports::analysis::analyze_file;
use crate::reloader::{schedule, DependencyGraph, ReloadReason};
use crate::tracking::has_source_extension;

/// One module found in the tree.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectModule {
    pub name: String,
    pub file: PathBuf,
    pub parent: String,
    pub dependencies: Vec<String>,
    /// Analysis failure, if the source could not be parsed
    pub error: Option<String>,
}

/// One entry of a reload plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedReload {
    pub module: String,
    pub reason: ReloadReason,
    pub after: Vec<String>,
}

pub struct ProjectGraph {
    root: PathBuf,
    modules: Vec<ProjectModule>,
    index: HashMap<String, usize>,
    pending: Vec<bool>,
}

impl ProjectGraph {
    /// Find and analyze every module source under `root`, honoring ignore
    /// files. Modules are ordered by name.
    pub fn scan(root: &Path, source_extensions: &[String]) -> Result<Self> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && has_source_extension(path, source_extensions) {
                files.push(path.to_path_buf());
            }
        }

        let mut modules: Vec<ProjectModule> = files
            .par_iter()
            .filter_map(|file| {
                let (name, parent) = module_name(root, file)?;
                let (dependencies, error) = match analyze_file(file, &parent) {
                    Ok(deps) => (deps, None),
                    Err(e) => {
                        tracing::warn!("Cannot analyze {}: {}", file.display(), e);
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                Some(ProjectModule {
                    name,
                    file: file.clone(),
                    parent,
                    dependencies,
                    error,
                })
            })
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules.dedup_by(|a, b| a.name == b.name);

        let index = modules
            .iter()
            .enumerate()
            .map(|(idx, module)| (module.name.clone(), idx))
            .collect();
        let pending = vec![false; modules.len()];

        tracing::debug!("Scanned {} modules under {}", modules.len(), root.display());
        Ok(Self {
            root: root.to_path_buf(),
            modules,
            index,
            pending,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules(&self) -> &[ProjectModule] {
        &self.modules
    }

    pub fn get(&self, name: &str) -> Option<&ProjectModule> {
        self.index.get(name).map(|&idx| &self.modules[idx])
    }

    /// Module owning `file`, if it is one of the scanned sources.
    pub fn module_for_file(&self, file: &Path) -> Option<&ProjectModule> {
        let (name, _) = module_name(&self.root, file)?;
        self.get(&name)
    }

    /// Reloads that modifying `touched` would cause, in order.
    pub fn plan(&mut self, touched: &[String]) -> Result<Vec<PlannedReload>> {
        self.pending.iter_mut().for_each(|p| *p = false);
        for name in touched {
            let Some(&idx) = self.index.get(name) else {
                return Err(LiveImportError::Validation(format!(
                    "Module {} not found under {}",
                    name,
                    self.root.display()
                )));
            };
            self.pending[idx] = true;
        }

        Ok(schedule(self)
            .into_iter()
            .map(|item| PlannedReload {
                module: self.modules[item.node].name.clone(),
                reason: if self.pending[item.node] {
                    ReloadReason::Modified
                } else {
                    ReloadReason::Dependent
                },
                after: item.after,
            })
            .collect())
    }
}

impl DependencyGraph for ProjectGraph {
    fn node_count(&self) -> usize {
        self.modules.len()
    }

    fn node_name(&self, node: usize) -> &str {
        &self.modules[node].name
    }

    fn dependencies(&self, node: usize) -> &[String] {
        &self.modules[node].dependencies
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn is_root(&self, _node: usize) -> bool {
        true
    }

    fn is_pending(&self, node: usize) -> bool {
        self.pending[node]
    }

    fn is_available(&self, _node: usize) -> bool {
        true
    }
}

/// Module identifier and parent package of a source file under `root`.
///
/// `a/b/c.py` is `a.b.c` with parent `a.b`; `a/b/__init__.py` is the package
/// `a.b`, which is its own parent.
pub fn module_name(root: &Path, file: &Path) -> Option<(String, String)> {
    let relative = file.strip_prefix(root).ok()?;
    let mut segments: Vec<String> = relative
        .parent()
        .map(|dir| {
            dir.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    let stem = relative.file_stem()?.to_str()?.to_string();

    if stem == "__init__" {
        if segments.is_empty() {
            return None;
        }
        let name = segments.join(".");
        return Some((name.clone(), name));
    }

    let parent = segments.join(".");
    segments.push(stem);
    Some((segments.join("."), parent))
}
