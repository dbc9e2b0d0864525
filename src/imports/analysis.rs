//! Static dependency analysis of module sources.

use std::path::Path;

use super::parser::{extract_imports, ParseContext};
use super::Bindings;
use crate::error::Result;

/// Identifiers of modules possibly referenced by the top-level imports of a
/// module's source.
///
/// `import A` yields `A`; `from A import b` yields both `A` and `A.b`, since
/// `b` may be a submodule. Identifiers that turn out not to name tracked
/// modules are ignored by the scheduler, so the over-approximation is harmless.
/// Relative imports resolve against `parent`.
pub fn possible_dependencies(source: &str, parent: &str, file: &Path) -> Result<Vec<String>> {
    let origin = file.display().to_string();
    let ctx = ParseContext {
        origin: &origin,
        file: Some(file),
        package: parent,
        allow_other_statements: true,
    };

    let mut result = Vec::new();
    for directive in extract_imports(source, &ctx)? {
        if let Bindings::Names(names) = &directive.bindings {
            let module = &directive.module;
            result.push(module.clone());
            result.extend(names.iter().map(|(name, _)| format!("{}.{}", module, name)));
        } else {
            result.push(directive.module);
        }
    }

    Ok(result)
}

/// Read `file` and analyze it.
pub fn analyze_file(file: &Path, parent: &str) -> Result<Vec<String>> {
    let source = std::fs::read_to_string(file)?;
    possible_dependencies(&source, parent, file)
}
