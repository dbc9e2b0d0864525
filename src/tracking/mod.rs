//! Module record store
//!
//! One [`ModuleRecord`] per module ever tracked, in tracking order. Records are
//! never removed, so modification time history survives a module losing all
//! of its projections; only projections come and go.

pub mod projection;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use xxhash_rust::xxh3::xxh3_64;

use crate::error::{LiveImportError, Phase, Result};
use crate::host::{ModuleOrigin, NamespaceId};
use crate::imports::analysis::analyze_file;

pub use projection::Projection;

/// Everything tracked about one module.
#[derive(Debug, Clone)]
pub struct ModuleRecord<M> {
    pub name: String,
    /// Live module handle; replaced by whatever the host returns from a reload
    pub module: M,
    /// Source file; `None` for modules that never participate in reloads
    pub file: Option<PathBuf>,
    /// Parent package, or empty
    pub parent: String,
    /// Modification time as of the last successful sync; `None` if the file
    /// has not been seen yet
    pub mtime: Option<SystemTime>,
    /// Modification time observed by the sync pass in progress
    pub(crate) observed_mtime: Option<SystemTime>,
    /// Possibly-referenced dependency identifiers, from static analysis
    pub dependencies: Vec<String>,
    pub projections: BTreeMap<NamespaceId, Projection>,
    /// Set when a reload scheduled for this module did not complete; holds the
    /// dependencies that caused the scheduling
    pub(crate) retry: Option<Vec<String>>,
}

impl<M> ModuleRecord<M> {
    /// Capture a module's origin, current modification time and dependencies.
    ///
    /// A source file is only kept when its extension is one of
    /// `source_extensions`. A missing file is tolerated: the record starts with
    /// no modification time and no dependencies.
    pub fn new(
        name: impl Into<String>,
        module: M,
        origin: ModuleOrigin,
        source_extensions: &[String],
    ) -> Result<Self> {
        let name = name.into();
        let file = origin
            .file
            .filter(|file| has_source_extension(file, source_extensions));

        let mut record = Self {
            name,
            module,
            file,
            parent: origin.parent,
            mtime: None,
            observed_mtime: None,
            dependencies: Vec::new(),
            projections: BTreeMap::new(),
            retry: None,
        };

        if let Some(file) = record.file.clone() {
            record.mtime = mtime_if_exists(&file)?;
            record.observed_mtime = record.mtime;
            if record.mtime.is_some() {
                record.analyze_dependencies()?;
            }
        }

        Ok(record)
    }

    /// Re-run static analysis of the source file.
    pub fn analyze_dependencies(&mut self) -> Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        self.dependencies = analyze_file(file, &self.parent)
            .map_err(|e| LiveImportError::module(self.name.clone(), Phase::Analysis, e))?;
        Ok(())
    }

    /// Directly imported modules have at least one projection.
    pub fn is_direct(&self) -> bool {
        !self.projections.is_empty()
    }

    pub(crate) fn is_modified(&self) -> bool {
        self.observed_mtime != self.mtime
    }
}

/// True iff `file` ends with one of the recognized source extensions.
pub fn has_source_extension(file: &Path, source_extensions: &[String]) -> bool {
    file.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| source_extensions.iter().any(|known| known == ext))
}

/// The file's modification time, or `None` if it does not exist.
pub fn mtime_if_exists(file: &Path) -> Result<Option<SystemTime>> {
    match std::fs::metadata(file).and_then(|meta| meta.modified()) {
        Ok(mtime) => Ok(Some(mtime)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound || !file.exists() => Ok(None),
        Err(e) => Err(LiveImportError::Metadata {
            path: file.to_path_buf(),
            source: e,
        }),
    }
}

/// All tracked modules, keyed by identifier, in tracking order, plus the
/// per-namespace record of which module last claimed each local name.
#[derive(Debug, Clone)]
pub struct ModuleTable<M> {
    records: Vec<ModuleRecord<M>>,
    index: HashMap<String, usize>,
    claims: HashMap<NamespaceId, BTreeMap<String, String>>,
}

impl<M> Default for ModuleTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ModuleTable<M> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            claims: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRecord<M>> {
        self.position(name).map(|idx| &self.records[idx])
    }

    pub fn record(&self, idx: usize) -> &ModuleRecord<M> {
        &self.records[idx]
    }

    pub fn record_mut(&mut self, idx: usize) -> &mut ModuleRecord<M> {
        &mut self.records[idx]
    }

    pub fn records(&self) -> impl Iterator<Item = &ModuleRecord<M>> {
        self.records.iter()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ModuleRecord<M>> {
        self.records.iter_mut()
    }

    /// Add a record, returning its position. An existing record of the same
    /// name is kept instead.
    pub fn insert(&mut self, record: ModuleRecord<M>) -> usize {
        if let Some(idx) = self.position(&record.name) {
            return idx;
        }
        let idx = self.records.len();
        self.index.insert(record.name.clone(), idx);
        self.records.push(record);
        idx
    }

    /// Projection of the record at `idx` into `namespace`, created empty if
    /// absent.
    pub fn projection_mut(&mut self, idx: usize, namespace: NamespaceId) -> &mut Projection {
        self.records[idx].projections.entry(namespace).or_default()
    }

    /// Remove every projection into `namespace`, along with its claims.
    pub fn clear_namespace(&mut self, namespace: NamespaceId) {
        for record in &mut self.records {
            record.projections.remove(&namespace);
        }
        self.claims.remove(&namespace);
    }

    /// Record `module` as the latest registration binding `local` in `namespace`.
    pub fn claim(&mut self, namespace: NamespaceId, local: &str, module: &str) {
        self.claims
            .entry(namespace)
            .or_default()
            .insert(local.to_string(), module.to_string());
    }

    /// Module that most recently claimed `local` in `namespace`.
    pub fn owner(&self, namespace: NamespaceId, local: &str) -> Option<&str> {
        self.claims
            .get(&namespace)
            .and_then(|names| names.get(local))
            .map(String::as_str)
    }

    /// True iff `module` may write `local` into `namespace`: nobody claimed the
    /// name, or `module` did most recently.
    pub fn may_bind(&self, namespace: NamespaceId, local: &str, module: &str) -> bool {
        self.owner(namespace, local).map_or(true, |owner| owner == module)
    }

    /// Human readable rendition of the whole table, sorted by module name.
    pub fn dump(&self) -> String {
        self.render(true)
    }

    /// Hash of the tracked registration state: records, dependencies,
    /// projections and claims. Modification times are left out so that touching
    /// files does not change it.
    pub fn state_hash(&self) -> u64 {
        xxh3_64(self.render(false).as_bytes())
    }

    fn render(&self, with_mtime: bool) -> String {
        let mut records: Vec<&ModuleRecord<M>> = self.records.iter().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = String::new();
        for record in records {
            let file = record
                .file
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            let mtime = if with_mtime {
                format!(" mtime={}", format_mtime(record.mtime))
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "Module {} parent={}{} file={} dependencies=[{}]",
                record.name,
                record.parent,
                mtime,
                file,
                record.dependencies.join(", ")
            );
            for (namespace, projection) in &record.projections {
                let _ = writeln!(out, "  Projection namespace={} star={}", namespace, projection.star);
                for alias in &projection.module_aliases {
                    let _ = writeln!(out, "    module as {}", alias);
                }
                for (name, alias) in &projection.aliases {
                    let _ = writeln!(out, "    {} as {}", name, alias);
                }
            }
        }

        let mut namespaces: Vec<(&NamespaceId, &BTreeMap<String, String>)> = self.claims.iter().collect();
        namespaces.sort_by_key(|(namespace, _)| **namespace);
        for (namespace, names) in namespaces {
            let _ = writeln!(out, "Claims namespace={}", namespace);
            for (local, module) in names {
                let _ = writeln!(out, "  {} from {}", local, module);
            }
        }

        out
    }
}

fn format_mtime(mtime: Option<SystemTime>) -> String {
    match mtime.and_then(|t| t.duration_since(UNIX_EPOCH).ok()) {
        Some(d) => format!("{}.{:09}", d.as_secs(), d.subsec_nanos()),
        None => "-".to_string(),
    }
}
