use std::time::{Duration, Instant};

use crate::config::AutoSyncConfig;
use crate::error::LiveImportError;
use crate::host::Host;
use crate::reloader::{ReloadEvent, Reloader};

/// Who asked for a cell execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Typed or run by the user
    User,
    /// Issued by the front end or an extension (bootstrap code, completions,
    /// variable inspectors)
    System,
}

/// Result of an automatic sync attempt.
#[derive(Debug, Default)]
pub struct AutoSyncOutcome {
    pub synced: bool,
    pub events: Vec<ReloadEvent>,
    pub error: Option<LiveImportError>,
}

/// Automatic sync policy.
///
/// A user cell triggers a sync when enabled and at least `grace` has passed
/// since the previous user cell finished, so running a whole notebook syncs
/// once rather than before every cell.
#[derive(Debug, Clone)]
pub struct AutoSync {
    pub enabled: bool,
    pub grace: Duration,
    pub report: bool,
    last_cell_end: Option<Instant>,
}

impl Default for AutoSync {
    fn default() -> Self {
        Self::from_config(&AutoSyncConfig::default())
    }
}

impl AutoSync {
    pub fn from_config(config: &AutoSyncConfig) -> Self {
        Self {
            enabled: config.enabled,
            grace: Duration::try_from_secs_f64(config.grace_secs.max(0.0)).unwrap_or(Duration::MAX),
            report: config.report,
            last_cell_end: None,
        }
    }

    /// Call before a cell runs. Sync failures are returned in the outcome
    /// alongside the reloads that did complete.
    pub fn before_cell<H: Host>(
        &mut self,
        reloader: &mut Reloader<H>,
        host: &mut H,
        kind: CellKind,
        now: Instant,
    ) -> AutoSyncOutcome {
        if !self.enabled || kind == CellKind::System {
            return AutoSyncOutcome::default();
        }
        if let Some(end) = self.last_cell_end {
            if now.saturating_duration_since(end) < self.grace {
                tracing::debug!("Skipping automatic sync within grace period");
                return AutoSyncOutcome::default();
            }
        }

        let mut events = Vec::new();
        let error = reloader
            .sync_with(host, |event| events.push(event.clone()))
            .err();
        AutoSyncOutcome {
            synced: true,
            events,
            error,
        }
    }

    /// Call after a cell finishes.
    pub fn after_cell(&mut self, kind: CellKind, now: Instant) {
        if kind == CellKind::User {
            self.last_cell_end = Some(now);
        }
    }

    /// Markdown console block listing the reloads, when reporting is on and
    /// there is something to report.
    pub fn render_report(&self, events: &[ReloadEvent]) -> Option<String> {
        if !self.report || events.is_empty() {
            return None;
        }
        let lines: Vec<String> = events.iter().map(|event| event.to_string()).collect();
        Some(format!("```console\n{}\n```", lines.join("\n")))
    }
}
