//! Import statement handling
//!
//! Parses import statement text into normalized [`ImportDirective`]s and
//! extracts the possibly-referenced dependencies of a module's source.

pub mod analysis;
pub mod parser;

use std::fmt;

pub use analysis::possible_dependencies;
pub use parser::{dedent, parse_cell_imports, parse_imports, resolve_relative};

/// What a directive binds in the target namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bindings {
    /// `import X` / `import X as Y`
    WholeModule,
    /// `from X import *`; the names are only known at reload time
    Wildcard,
    /// `from X import a, b as c`, as (source name, local name) pairs in order
    Names(Vec<(String, String)>),
}

/// One normalized import statement. The module identifier is always absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub module: String,
    /// Local name for a whole-module import; `None` for `from` imports
    pub alias: Option<String>,
    pub bindings: Bindings,
}

impl ImportDirective {
    pub fn module(module: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            module: module.into(),
            alias,
            bindings: Bindings::WholeModule,
        }
    }

    pub fn wildcard(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            alias: None,
            bindings: Bindings::Wildcard,
        }
    }

    pub fn names(module: impl Into<String>, names: Vec<(String, String)>) -> Self {
        Self {
            module: module.into(),
            alias: None,
            bindings: Bindings::Names(names),
        }
    }

    /// The local name a whole-module import binds: the alias, else the first
    /// segment of the module identifier. `None` for `from` imports.
    pub fn bound_name(&self) -> Option<&str> {
        match self.bindings {
            Bindings::WholeModule => Some(match &self.alias {
                Some(alias) => alias.as_str(),
                None => self.module.split('.').next().unwrap_or(&self.module),
            }),
            _ => None,
        }
    }
}

/// Renders the directive as an equivalent import statement.
impl fmt::Display for ImportDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn alias_str(name: &str, alias: &str) -> String {
            if name == alias {
                name.to_string()
            } else {
                format!("{} as {}", name, alias)
            }
        }

        match &self.bindings {
            Bindings::WholeModule => match &self.alias {
                Some(alias) => write!(f, "import {}", alias_str(&self.module, alias)),
                None => write!(f, "import {}", self.module),
            },
            Bindings::Wildcard => write!(f, "from {} import *", self.module),
            Bindings::Names(names) => {
                let rendered: Vec<String> = names
                    .iter()
                    .map(|(name, alias)| alias_str(name, alias))
                    .collect();
                write!(f, "from {} import {}", self.module, rendered.join(", "))
            }
        }
    }
}
