//! Host runtime interface
//!
//! The reload engine never touches interpreter internals directly. Everything it
//! needs from the embedding runtime (the live module registry, attribute access,
//! in-place reload and namespace writes) goes through [`Host`].

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::HostError;

/// Opaque token identifying one target namespace (a notebook's globals, a
/// script module's dictionary, ...). Issued by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(Uuid);

impl NamespaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NamespaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a loaded module came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOrigin {
    /// Declared source location, if the module has one
    pub file: Option<PathBuf>,
    /// Parent package identifier; empty for top-level modules
    pub parent: String,
}

impl ModuleOrigin {
    pub fn new(file: impl Into<PathBuf>, parent: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            parent: parent.into(),
        }
    }

    /// Origin of a module with no backing file (builtin, extension, synthetic).
    pub fn detached(parent: impl Into<String>) -> Self {
        Self {
            file: None,
            parent: parent.into(),
        }
    }
}

/// The embedding runtime, as seen by the reload engine.
pub trait Host {
    /// Live module handle
    type Module: Clone;
    /// Any value that can be bound to a name in a namespace
    type Value: Clone;

    /// Look up a module in the live module registry.
    fn loaded_module(&self, name: &str) -> Option<Self::Module>;

    fn module_name(&self, module: &Self::Module) -> String;

    fn module_origin(&self, module: &Self::Module) -> ModuleOrigin;

    fn get_attribute(&self, module: &Self::Module, name: &str) -> Option<Self::Value>;

    fn has_attribute(&self, module: &Self::Module, name: &str) -> bool {
        self.get_attribute(module, name).is_some()
    }

    /// Every top-level name the module defines.
    fn attribute_names(&self, module: &Self::Module) -> Vec<String>;

    /// Explicit public-name allowlist, when the module declares one.
    fn declared_exports(&self, module: &Self::Module) -> Option<Vec<String>>;

    /// Names a wildcard import binds: the declared allowlist, or otherwise every
    /// name not private by convention.
    fn public_names(&self, module: &Self::Module) -> Vec<String> {
        match self.declared_exports(module) {
            Some(names) => names,
            None => self
                .attribute_names(module)
                .into_iter()
                .filter(|name| !name.starts_with('_'))
                .collect(),
        }
    }

    /// The module a value refers to, if the value is itself a module.
    fn as_module(&self, value: &Self::Value) -> Option<Self::Module>;

    /// A value referring to the module, suitable for binding in a namespace.
    fn module_value(&self, module: &Self::Module) -> Self::Value;

    /// Re-execute the module's source in place. The returned handle replaces
    /// the one the engine held.
    fn reload_module(&mut self, module: &Self::Module) -> std::result::Result<Self::Module, HostError>;

    fn namespace_contains(&self, namespace: NamespaceId, name: &str) -> bool;

    fn namespace_set(&mut self, namespace: NamespaceId, name: &str, value: Self::Value);
}
