use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LiveImportError, Result};
use crate::host::{Host, NamespaceId};
use crate::imports::{dedent, parse_cell_imports};
use crate::reloader::Reloader;

static HIDDEN_MAGIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#_%%liveimport\b").expect("valid hidden magic pattern"));

/// Options of a `%%liveimport` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MagicOptions {
    pub clear: bool,
}

/// Parse the argument part of a `%%liveimport [-c|--clear]` line.
pub fn parse_magic_line(line: &str) -> Result<MagicOptions> {
    let mut options = MagicOptions::default();
    let mut extraneous = Vec::new();

    for arg in line.split_whitespace() {
        match arg {
            "-c" | "--clear" => options.clear = true,
            other => extraneous.push(other),
        }
    }

    if !extraneous.is_empty() {
        return Err(LiveImportError::Validation(format!(
            "Extraneous %%liveimport arguments: {}",
            extraneous.join(" ")
        )));
    }
    Ok(options)
}

/// Run a `%%liveimport` cell: execute it, then register its top-level imports
/// when execution succeeded. Returns whether registration happened.
///
/// The cell is parsed before it runs, so a cell with a syntax error is
/// rejected without executing.
pub fn run_cell_magic<H, F>(
    reloader: &mut Reloader<H>,
    host: &mut H,
    namespace: NamespaceId,
    line: &str,
    cell: &str,
    execute: F,
) -> Result<bool>
where
    H: Host,
    F: FnOnce(&mut H, &str) -> bool,
{
    let options = parse_magic_line(line)?;
    let directives = parse_cell_imports(&dedent(cell), None)?;

    if !execute(host, cell) {
        return Ok(false);
    }
    reloader.register_directives(host, namespace, &directives, options.clear)?;
    Ok(true)
}

/// Turn a first line of `#_%%liveimport ...` into `%%liveimport ...`, so the
/// magic can hide behind a comment in editors that do not understand it.
/// With `enabled` false the cell is returned untouched.
pub fn unhide_cell_magic(cell: &str, enabled: bool) -> Cow<'_, str> {
    if enabled && HIDDEN_MAGIC.is_match(cell) {
        Cow::Owned(cell[2..].to_string())
    } else {
        Cow::Borrowed(cell)
    }
}
