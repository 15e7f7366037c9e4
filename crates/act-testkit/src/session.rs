use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// One recorded assertion outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Assertion {
    pub passed: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The summary produced by [`TestSession::end`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub passed: bool,
    pub total: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub assertions: Vec<Assertion>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
}

struct Inner {
    name: Option<String>,
    started_at: Option<DateTime<Utc>>,
    assertions: Vec<Assertion>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            name: None,
            started_at: None,
            assertions: Vec::new(),
        }
    }
}

/// Accumulates assertions for a named test run (spec.md §4.3).
///
/// A session with no name yet ("idle") still buffers assertions; they're
/// attributed to an "unnamed" session if `end` is called before `start`.
pub struct TestSession {
    inner: Mutex<Inner>,
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Begin a named run, discarding any assertions buffered so far.
    pub fn start(&self, name: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.name = Some(name.into());
        inner.started_at = Some(Utc::now());
        inner.assertions.clear();
    }

    /// Record one assertion outcome.
    pub fn add_assertion(&self, passed: bool, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        if inner.started_at.is_none() {
            inner.started_at = Some(Utc::now());
        }
        inner.assertions.push(Assertion {
            passed,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Whether a run has been named via `start` and not yet ended.
    pub fn is_active(&self) -> bool {
        self.inner.lock().name.is_some()
    }

    /// Close out the run and return to idle, producing a summary.
    pub fn end(&self) -> SessionSummary {
        let mut inner = self.inner.lock();
        let name = inner.name.take().unwrap_or_else(|| "unnamed".to_string());
        let started_at = inner.started_at.take().unwrap_or_else(Utc::now);
        let assertions = std::mem::take(&mut inner.assertions);
        drop(inner);

        let ended_at = Utc::now();
        let total = assertions.len();
        let failed_count = assertions.iter().filter(|a| !a.passed).count();
        let passed_count = total - failed_count;
        SessionSummary {
            name,
            passed: failed_count == 0,
            total,
            passed_count,
            failed_count,
            assertions,
            started_at,
            duration_ms: (ended_at - started_at).num_milliseconds(),
            ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_passes() {
        let session = TestSession::new();
        session.start("empty");
        let summary = session.end();
        assert_eq!(summary.name, "empty");
        assert_eq!(summary.total, 0);
        assert!(summary.passed);
    }

    #[test]
    fn mixed_assertions_fail_overall() {
        let session = TestSession::new();
        session.start("mixed");
        session.add_assertion(true, "a");
        session.add_assertion(false, "b");
        let summary = session.end();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert!(!summary.passed);
    }

    #[test]
    fn assertions_before_start_are_buffered_as_unnamed() {
        let session = TestSession::new();
        session.add_assertion(true, "early");
        let summary = session.end();
        assert_eq!(summary.name, "unnamed");
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn start_again_resets_previous_assertions() {
        let session = TestSession::new();
        session.start("first");
        session.add_assertion(false, "stale");
        session.start("second");
        let summary = session.end();
        assert_eq!(summary.name, "second");
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn end_returns_session_to_idle() {
        let session = TestSession::new();
        session.start("s");
        session.end();
        assert!(!session.is_active());
    }
}
