use std::collections::BTreeSet;

/// Names one namespace imports from one module, refreshed whenever the module
/// reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// `(source name, local name)` pairs from `from X import a as b`
    pub aliases: BTreeSet<(String, String)>,
    /// Local names bound to the module itself (`import X`, `import X as Y`)
    pub module_aliases: BTreeSet<String>,
    /// Set by `from X import *`; never cleared by registration
    pub star: bool,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff some explicit binding already targets `local`.
    pub fn binds_locally(&self, local: &str) -> bool {
        self.aliases.iter().any(|(_, alias)| alias == local)
    }
}
