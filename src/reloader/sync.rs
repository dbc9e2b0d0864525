use std::time::SystemTime;

use crate::error::{LiveImportError, Phase, Result};
use crate::host::{Host, NamespaceId};
use crate::tracking::{mtime_if_exists, ModuleTable};

use super::event::{ReloadEvent, ReloadReason};
use super::schedule::{schedule, DependencyGraph};
use super::Reloader;

/// The module table as seen by one sync pass.
struct SyncGraph<'a, M> {
    table: &'a ModuleTable<M>,
    available: &'a [bool],
}

impl<M> DependencyGraph for SyncGraph<'_, M> {
    fn node_count(&self) -> usize {
        self.table.len()
    }

    fn node_name(&self, node: usize) -> &str {
        &self.table.record(node).name
    }

    fn dependencies(&self, node: usize) -> &[String] {
        &self.table.record(node).dependencies
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.table.position(name)
    }

    fn is_root(&self, node: usize) -> bool {
        self.table.record(node).is_direct()
    }

    fn is_pending(&self, node: usize) -> bool {
        let record = self.table.record(node);
        record.is_modified() || record.retry.is_some()
    }

    fn is_available(&self, node: usize) -> bool {
        self.available[node]
    }
}

impl<H: Host> Reloader<H> {
    /// Reload out-of-date modules in dependency order and rebind registered
    /// names.
    pub fn sync(&mut self, host: &mut H) -> Result<()> {
        self.sync_with(host, |_| {})
    }

    /// Like [`Reloader::sync`], calling `observer` after each completed reload.
    ///
    /// A failed reload stops the pass. Modules from the failed one onward keep
    /// their recorded modification times, so the next sync retries them.
    pub fn sync_with<F>(&mut self, host: &mut H, mut observer: F) -> Result<()>
    where
        F: FnMut(&ReloadEvent),
    {
        let Some(available) = self.detect_updates()? else {
            return Ok(());
        };

        let plan = schedule(&SyncGraph {
            table: &self.table,
            available: &available,
        });
        if plan.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            "Reload schedule: {:?}",
            plan.iter()
                .map(|item| self.table.record(item.node).name.as_str())
                .collect::<Vec<_>>()
        );

        let mut vanished = None;

        for (pos, item) in plan.iter().enumerate() {
            let idx = item.node;
            let record = self.table.record(idx);
            let name = record.name.clone();

            let reloaded = match host.reload_module(&record.module) {
                Ok(module) => module,
                Err(e) => {
                    tracing::warn!("Reload of {} failed: {}", name, e);
                    for unfinished in &plan[pos..] {
                        let record = self.table.record_mut(unfinished.node);
                        let mut after = record.retry.take().unwrap_or_default();
                        merge_names(&mut after, &unfinished.after);
                        record.retry = Some(after);
                    }
                    return Err(LiveImportError::module(name, Phase::Reload, e));
                }
            };
            self.table.record_mut(idx).module = reloaded;

            if let Err(e) = self.rebind(host, idx) {
                tracing::warn!("{}", e);
                if vanished.is_none() {
                    vanished = Some(e);
                }
            }

            let record = self.table.record_mut(idx);
            let reason = if record.is_modified() {
                ReloadReason::Modified
            } else {
                ReloadReason::Dependent
            };
            let mut after = item.after.clone();
            if let Some(retry) = record.retry.take() {
                merge_names(&mut after, &retry);
            }
            let mtime = record.observed_mtime.unwrap_or(SystemTime::UNIX_EPOCH);
            record.mtime = record.observed_mtime;

            tracing::info!("Reloaded {} ({})", name, reason);
            observer(&ReloadEvent {
                module: name,
                reason,
                mtime,
                after,
            });
        }

        self.track_new_indirects(host)?;

        match vanished {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Read every tracked source file's modification time. Returns per-record
    /// availability, or `None` when nothing needs reloading.
    fn detect_updates(&mut self) -> Result<Option<Vec<bool>>> {
        let mut available = Vec::with_capacity(self.table.len());
        let mut any_updates = false;

        for record in self.table.records_mut() {
            let Some(file) = record.file.clone() else {
                available.push(false);
                continue;
            };

            match mtime_if_exists(&file)? {
                None => {
                    tracing::debug!("Skipping {}: {} is missing", record.name, file.display());
                    record.observed_mtime = record.mtime;
                    available.push(false);
                }
                Some(current) => {
                    available.push(true);
                    record.observed_mtime = Some(current);
                    if record.is_modified() {
                        tracing::debug!("{} is out of date", record.name);
                        record.analyze_dependencies()?;
                        any_updates = true;
                    } else if record.retry.is_some() {
                        any_updates = true;
                    }
                }
            }
        }

        Ok(any_updates.then_some(available))
    }

    /// Write the reloaded module's names into every namespace projecting from
    /// it. A name now owned by a later registration gets the owner's current
    /// value instead. A bound name missing from the module is reported after
    /// the other names are written.
    fn rebind(&self, host: &mut H, idx: usize) -> Result<()> {
        let record = self.table.record(idx);
        let mut writes: Vec<(NamespaceId, String, H::Value)> = Vec::new();
        let mut missing: Option<String> = None;

        for (&namespace, projection) in &record.projections {
            for local in &projection.module_aliases {
                if self.table.may_bind(namespace, local, &record.name) {
                    writes.push((namespace, local.clone(), host.module_value(&record.module)));
                } else if let Some(value) = self.owner_value(host, namespace, local) {
                    writes.push((namespace, local.clone(), value));
                }
            }

            for (source, local) in &projection.aliases {
                if !self.table.may_bind(namespace, local, &record.name) {
                    if let Some(value) = self.owner_value(host, namespace, local) {
                        writes.push((namespace, local.clone(), value));
                    }
                    continue;
                }
                match host.get_attribute(&record.module, source) {
                    Some(value) => writes.push((namespace, local.clone(), value)),
                    None if missing.is_none() => missing = Some(source.clone()),
                    None => {}
                }
            }

            if projection.star {
                for public in host.public_names(&record.module) {
                    if projection.binds_locally(&public) {
                        continue;
                    }
                    if !self.table.may_bind(namespace, &public, &record.name) {
                        if let Some(value) = self.owner_value(host, namespace, &public) {
                            writes.push((namespace, public, value));
                        }
                        continue;
                    }
                    match host.get_attribute(&record.module, &public) {
                        Some(value) => writes.push((namespace, public, value)),
                        None if missing.is_none() => missing = Some(public),
                        None => {}
                    }
                }
            }
        }

        for (namespace, local, value) in writes {
            host.namespace_set(namespace, &local, value);
        }

        match missing {
            Some(name) => Err(LiveImportError::VanishedAttribute {
                module: record.name.clone(),
                name,
            }),
            None => Ok(()),
        }
    }

    /// Current value of `local` as bound by the module that last claimed it
    /// in `namespace`.
    fn owner_value(&self, host: &H, namespace: NamespaceId, local: &str) -> Option<H::Value> {
        let owner = self.table.get(self.table.owner(namespace, local)?)?;
        let projection = owner.projections.get(&namespace)?;
        if projection.module_aliases.contains(local) {
            return Some(host.module_value(&owner.module));
        }
        match projection.aliases.iter().find(|(_, alias)| alias == local) {
            Some((source, _)) => host.get_attribute(&owner.module, source),
            None if projection.star => host.get_attribute(&owner.module, local),
            None => None,
        }
    }
}

fn merge_names(into: &mut Vec<String>, names: &[String]) {
    for name in names {
        if !into.contains(name) {
            into.push(name.clone());
        }
    }
}
