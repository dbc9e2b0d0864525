use crate::error::{LiveImportError, Result};
use crate::host::{Host, NamespaceId};
use crate::imports::{dedent, parse_cell_imports, parse_imports, Bindings, ImportDirective};
use crate::tracking::ModuleRecord;

use super::Reloader;

impl<H: Host> Reloader<H> {
    /// Register import statements for `namespace`.
    ///
    /// The statements must already have executed: every module must be loaded
    /// and every bound name must exist in the namespace. With `clear`, prior
    /// registrations for the namespace are dropped first. Directives are
    /// committed one at a time, so a failing directive leaves earlier ones in
    /// the same text registered.
    pub fn register(
        &mut self,
        host: &H,
        namespace: NamespaceId,
        statements: &str,
        package: Option<&str>,
        clear: bool,
    ) -> Result<()> {
        let directives = parse_imports(&dedent(statements), package)?;
        self.register_directives(host, namespace, &directives, clear)
    }

    /// Register the top-level imports of a block of arbitrary statements.
    pub fn register_cell(
        &mut self,
        host: &H,
        namespace: NamespaceId,
        cell: &str,
        clear: bool,
    ) -> Result<()> {
        let directives = parse_cell_imports(&dedent(cell), None)?;
        self.register_directives(host, namespace, &directives, clear)
    }

    pub fn register_directives(
        &mut self,
        host: &H,
        namespace: NamespaceId,
        directives: &[ImportDirective],
        clear: bool,
    ) -> Result<()> {
        if clear {
            tracing::debug!("Clearing registrations for namespace {}", namespace);
            self.table.clear_namespace(namespace);
        }

        for directive in directives {
            let module = require_imported(host, namespace, directive)?;
            let idx = self.situate(host, &module, namespace)?;
            let name = self.table.record(idx).name.clone();

            match &directive.bindings {
                Bindings::WholeModule => {
                    let local = match &directive.alias {
                        Some(alias) => Some(alias.as_str()),
                        None if !directive.module.contains('.') => Some(directive.module.as_str()),
                        None => None,
                    };
                    if let Some(local) = local {
                        self.table
                            .projection_mut(idx, namespace)
                            .module_aliases
                            .insert(local.to_string());
                        self.table.claim(namespace, local, &name);
                    }
                }
                Bindings::Wildcard => {
                    self.table.projection_mut(idx, namespace).star = true;
                    for public in host.public_names(&module) {
                        self.table.claim(namespace, &public, &name);
                    }
                }
                Bindings::Names(pairs) => {
                    for (source, local) in pairs {
                        if let Some(value) = host.get_attribute(&module, source) {
                            if let Some(submodule) = host.as_module(&value) {
                                self.situate(host, &submodule, namespace)?;
                            }
                        }
                        self.table
                            .projection_mut(idx, namespace)
                            .aliases
                            .insert((source.clone(), local.clone()));
                        self.table.claim(namespace, local, &name);
                    }
                }
            }
        }

        self.track_new_indirects(host)
    }

    /// Ensure `module` is tracked and has a projection into `namespace`.
    fn situate(&mut self, host: &H, module: &H::Module, namespace: NamespaceId) -> Result<usize> {
        let name = host.module_name(module);
        let idx = match self.table.position(&name) {
            Some(idx) => idx,
            None => {
                let origin = host.module_origin(module);
                let record = ModuleRecord::new(name, module.clone(), origin, &self.source_extensions)?;
                tracing::debug!(
                    "Tracking {} (file: {:?}, dependencies: {:?})",
                    record.name,
                    record.file,
                    record.dependencies
                );
                self.table.insert(record)
            }
        };
        self.table.projection_mut(idx, namespace);
        Ok(idx)
    }
}

/// The loaded module a directive refers to, provided there is evidence the
/// equivalent import statement already ran in `namespace`.
fn require_imported<H: Host>(
    host: &H,
    namespace: NamespaceId,
    directive: &ImportDirective,
) -> Result<H::Module> {
    let missing = |issue: String| LiveImportError::Validation(format!("{}; missing {}?", issue, directive));

    let Some(module) = host.loaded_module(&directive.module) else {
        return Err(missing(format!("Module {} not loaded", directive.module)));
    };

    if let Some(local) = directive.bound_name() {
        if !host.namespace_contains(namespace, local) {
            return Err(missing(format!("No symbol {} in namespace", local)));
        }
    }

    if let Bindings::Names(pairs) = &directive.bindings {
        for (source, local) in pairs {
            if !host.has_attribute(&module, source) {
                return Err(missing(format!("No symbol {} in {}", source, directive.module)));
            }
            if !host.namespace_contains(namespace, local) {
                return Err(missing(format!("No symbol {} in namespace", local)));
            }
        }
    }

    Ok(module)
}
