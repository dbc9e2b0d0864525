pub mod config;
pub mod error;
pub mod host;
pub mod imports;
pub mod project;
pub mod reloader;
pub mod session;
pub mod tracking;
pub mod watcher;
pub mod workspace;

pub use config::{AutoSyncConfig, LiveImportConfig};
pub use error::{HostError, LiveImportError, Phase, Result};
pub use host::{Host, ModuleOrigin, NamespaceId};
pub use imports::{parse_cell_imports, parse_imports, Bindings, ImportDirective};
pub use project::{PlannedReload, ProjectGraph};
pub use reloader::{ReloadEvent, ReloadReason, Reloader};
pub use session::{AutoSync, AutoSyncOutcome, CellKind};
pub use tracking::{ModuleRecord, ModuleTable, Projection};
pub use workspace::Workspace;
