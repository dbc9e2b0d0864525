use std::fmt;
use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Why a module reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadReason {
    /// The module's own source file changed
    Modified,
    /// Only dependencies of the module reloaded
    Dependent,
}

impl ReloadReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadReason::Modified => "modified",
            ReloadReason::Dependent => "dependent",
        }
    }
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub module: String,
    pub reason: ReloadReason,
    /// Source modification time last seen for the module
    pub mtime: SystemTime,
    /// Dependencies of the module already reloaded in the same sync; for a
    /// dependent reload, the reason it happened
    pub after: Vec<String>,
}

impl ReloadEvent {
    /// Description relative to `now`, e.g.
    /// "Reloaded printmath modified 18 seconds ago".
    pub fn describe(&self, now: SystemTime) -> String {
        match self.reason {
            ReloadReason::Modified => {
                let ago = match now.duration_since(self.mtime) {
                    Ok(elapsed) => time_ago(elapsed),
                    Err(_) => "in the future (!)".to_string(),
                };
                format!("Reloaded {} modified {}", self.module, ago)
            }
            ReloadReason::Dependent => {
                format!("Reloaded {} because {} reloaded", self.module, english_list(&self.after))
            }
        }
    }
}

impl fmt::Display for ReloadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(SystemTime::now()))
    }
}

fn time_ago(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 2.0 {
        format!("{} milliseconds ago", elapsed.as_millis())
    } else if secs < 120.0 {
        format!("{} seconds ago", secs as u64)
    } else if secs < 7200.0 {
        format!("{} minutes ago", (secs / 60.0) as u64)
    } else if secs < 172_800.0 {
        format!("{} hours ago", (secs / 3600.0) as u64)
    } else {
        format!("{} days ago", (secs / 86400.0) as u64)
    }
}

fn english_list(items: &[String]) -> String {
    match items {
        [] => "dependencies".to_string(),
        [one] => one.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(reason: ReloadReason, after: &[&str]) -> ReloadEvent {
        ReloadEvent {
            module: "simulator".to_string(),
            reason,
            mtime: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
            after: after.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_modified_description() {
        let e = event(ReloadReason::Modified, &[]);
        let now = e.mtime + Duration::from_secs(18);
        assert_eq!(e.describe(now), "Reloaded simulator modified 18 seconds ago");
        assert_eq!(
            e.describe(e.mtime + Duration::from_millis(250)),
            "Reloaded simulator modified 250 milliseconds ago"
        );
        assert_eq!(
            e.describe(e.mtime + Duration::from_secs(3 * 3600)),
            "Reloaded simulator modified 3 hours ago"
        );
        assert_eq!(
            e.describe(e.mtime - Duration::from_secs(5)),
            "Reloaded simulator modified in the future (!)"
        );
    }

    #[test]
    fn test_dependent_description() {
        let now = SystemTime::now();
        assert_eq!(
            event(ReloadReason::Dependent, &["printmath"]).describe(now),
            "Reloaded simulator because printmath reloaded"
        );
        assert_eq!(
            event(ReloadReason::Dependent, &["a", "b"]).describe(now),
            "Reloaded simulator because a and b reloaded"
        );
        assert_eq!(
            event(ReloadReason::Dependent, &["a", "b", "c"]).describe(now),
            "Reloaded simulator because a, b, and c reloaded"
        );
    }

    #[test]
    fn test_time_buckets() {
        assert_eq!(time_ago(Duration::from_secs(150)), "2 minutes ago");
        assert_eq!(time_ago(Duration::from_secs(3 * 86400)), "3 days ago");
    }
}
