//! Interactive session glue
//!
//! Helpers an embedding notebook integration calls around cell executions:
//! automatic syncing with a grace period, and `%%liveimport` cell magic.

pub mod autosync;
pub mod magic;

pub use autosync::{AutoSync, AutoSyncOutcome, CellKind};
pub use magic::{parse_magic_line, run_cell_magic, unhide_cell_magic, MagicOptions};
