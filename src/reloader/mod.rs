//! Reload engine
//!
//! [`Reloader`] owns the module table for one session. Callers feed it import
//! statements through [`Reloader::register`] and bring everything up to date
//! with [`Reloader::sync`].

pub mod event;
pub mod register;
pub mod schedule;
pub mod sync;

use crate::config::LiveImportConfig;
use crate::error::Result;
use crate::host::{Host, NamespaceId};
use crate::tracking::{has_source_extension, ModuleRecord, ModuleTable};
use crate::workspace::Workspace;

pub use event::{ReloadEvent, ReloadReason};
pub use schedule::{schedule, DependencyGraph, ScheduledReload, SyncMark};

pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["py"];

pub struct Reloader<H: Host> {
    table: ModuleTable<H::Module>,
    workspace: Workspace,
    source_extensions: Vec<String>,
}

impl<H: Host> Reloader<H> {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            table: ModuleTable::new(),
            workspace,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build from configuration. Without configured directories the workspace
    /// is the current directory.
    pub fn from_config(config: &LiveImportConfig) -> Result<Self> {
        let workspace = match &config.workspace {
            Some(dirs) => Workspace::new(dirs)?,
            None => Workspace::current_dir()?,
        };
        Ok(Self::new(workspace).with_source_extensions(config.source_extensions.clone()))
    }

    pub fn with_source_extensions(mut self, extensions: Vec<String>) -> Self {
        self.source_extensions = extensions;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Replace the workspace. Modules already tracked stay tracked, and
    /// dependencies now inside the workspace start being tracked.
    pub fn set_workspace(&mut self, host: &H, workspace: Workspace) -> Result<()> {
        tracing::debug!("Workspace set to {:?}", workspace.roots());
        self.workspace = workspace;
        self.track_new_indirects(host)
    }

    pub fn source_extensions(&self) -> &[String] {
        &self.source_extensions
    }

    pub fn table(&self) -> &ModuleTable<H::Module> {
        &self.table
    }

    /// True iff a registration matching the query is in effect for
    /// `namespace`.
    ///
    /// With no name, any registration involving `module` matches. A name of
    /// `"*"` matches a wildcard import. A name with an optional alias matches
    /// `from module import name as alias`. An alias alone matches
    /// `import module as alias`.
    pub fn is_registered(
        &self,
        namespace: NamespaceId,
        module: &str,
        name: Option<&str>,
        alias: Option<&str>,
    ) -> bool {
        let Some(projection) = self
            .table
            .get(module)
            .and_then(|record| record.projections.get(&namespace))
        else {
            return false;
        };

        match (name, alias) {
            (None, None) => true,
            (None, Some(alias)) => projection.module_aliases.contains(alias),
            (Some("*"), _) => projection.star,
            (Some(name), alias) => projection
                .aliases
                .contains(&(name.to_string(), alias.unwrap_or(name).to_string())),
        }
    }

    /// True iff `module` has a record, directly imported or not.
    pub fn is_tracked(&self, module: &str) -> bool {
        self.table.contains(module)
    }

    pub fn dump(&self) -> String {
        self.table.dump()
    }

    pub fn state_hash(&self) -> u64 {
        self.table.state_hash()
    }

    /// Track every loaded, in-workspace module reachable from tracked modules
    /// through their dependencies, breadth first.
    pub(crate) fn track_new_indirects(&mut self, host: &H) -> Result<()> {
        let mut cohort: Vec<usize> = (0..self.table.len()).collect();

        loop {
            let mut added = Vec::new();
            for idx in cohort {
                let dependencies = self.table.record(idx).dependencies.clone();
                for name in dependencies {
                    if self.table.contains(&name) {
                        continue;
                    }
                    let Some(module) = host.loaded_module(&name) else {
                        continue;
                    };
                    let origin = host.module_origin(&module);
                    let eligible = match origin.file.as_deref() {
                        Some(file) => {
                            has_source_extension(file, &self.source_extensions)
                                && file.exists()
                                && self.workspace.contains(file)
                        }
                        None => false,
                    };
                    if !eligible {
                        continue;
                    }

                    let record = ModuleRecord::new(name, module, origin, &self.source_extensions)?;
                    tracing::debug!("Tracking indirect dependency {}", record.name);
                    added.push(self.table.insert(record));
                }
            }
            if added.is_empty() {
                return Ok(());
            }
            cohort = added;
        }
    }
}
