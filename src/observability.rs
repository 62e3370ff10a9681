//! Observer interface for engine operations (open/attach/import/query/export/rename/detach).
//!
//! This generalizes the ingestion-only observer the engine grew out of to every mutating or
//! query operation `EngineContext` performs, since alerting and auditing need to see the whole
//! lifecycle of a workbook, not just the ingestion step.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{EngineError, EngineSeverity};

/// Which engine operation an [`OperationContext`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Attach,
    Detach,
    Rename,
    Query,
    Export,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Open => "open",
            Operation::Attach => "attach",
            Operation::Detach => "detach",
            Operation::Rename => "rename",
            Operation::Query => "query",
            Operation::Export => "export",
            Operation::Close => "close",
        };
        f.write_str(s)
    }
}

/// Context about an engine operation, passed to every observer callback.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Opaque workbook handle the operation ran against (0 if not yet allocated, e.g. during
    /// `openFile` before the handle is minted).
    pub workbook: u64,
    /// Which operation this is.
    pub operation: Operation,
    /// A short, human-readable detail string (source path, dataset name, or truncated SQL).
    pub detail: String,
}

/// Minimal stats reported on a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationStats {
    /// Rows affected/returned, where applicable (0 otherwise).
    pub rows: usize,
}

/// Observer interface for workbook engine operations.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait WorkbookObserver: Send + Sync {
    /// Called when an operation succeeds.
    fn on_success(&self, _ctx: &OperationContext, _stats: OperationStats) {}

    /// Called when an operation fails.
    fn on_failure(&self, _ctx: &OperationContext, _severity: EngineSeverity, _error: &EngineError) {}

    /// Called when a failure meets an alert threshold ([`EngineSeverity::Critical`] by default,
    /// see [`CompositeObserver`]).
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        self.on_failure(ctx, severity, error);
    }
}

/// An observer that fans callbacks out to a list of observers, promoting failures at or above
/// [`EngineSeverity::Critical`] to `on_alert` in addition to `on_failure`.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn WorkbookObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn WorkbookObserver>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Arc<dyn WorkbookObserver>) {
        self.observers.push(observer);
    }

    /// Report a failure, additionally raising an alert when `severity` is at least
    /// [`EngineSeverity::Critical`].
    pub fn report_failure(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        self.on_failure(ctx, severity, error);
        if severity >= EngineSeverity::Critical {
            self.on_alert(ctx, severity, error);
        }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl WorkbookObserver for CompositeObserver {
    fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs engine events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl WorkbookObserver for StdErrObserver {
    fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
        eprintln!(
            "[engine][ok] wb={} op={} detail={} rows={}",
            ctx.workbook, ctx.operation, ctx.detail, stats.rows
        );
    }

    fn on_failure(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        eprintln!(
            "[engine][{severity:?}] wb={} op={} detail={} err={}",
            ctx.workbook, ctx.operation, ctx.detail, error
        );
    }

    fn on_alert(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        eprintln!(
            "[ALERT][engine][{severity:?}] wb={} op={} detail={} err={}",
            ctx.workbook, ctx.operation, ctx.detail, error
        );
    }
}

/// Appends engine events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl WorkbookObserver for FileObserver {
    fn on_success(&self, ctx: &OperationContext, stats: OperationStats) {
        self.append_line(&format!(
            "{} ok wb={} op={} detail={} rows={}",
            unix_ts(),
            ctx.workbook,
            ctx.operation,
            ctx.detail,
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        self.append_line(&format!(
            "{} fail severity={:?} wb={} op={} detail={} err={}",
            unix_ts(),
            severity,
            ctx.workbook,
            ctx.operation,
            ctx.detail,
            error
        ));
    }

    fn on_alert(&self, ctx: &OperationContext, severity: EngineSeverity, error: &EngineError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} wb={} op={} detail={} err={}",
            unix_ts(),
            severity,
            ctx.workbook,
            ctx.operation,
            ctx.detail,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        successes: AtomicUsize,
        failures: AtomicUsize,
        alerts: AtomicUsize,
    }

    impl WorkbookObserver for CountingObserver {
        fn on_success(&self, _ctx: &OperationContext, _stats: OperationStats) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_failure(&self, _ctx: &OperationContext, _severity: EngineSeverity, _error: &EngineError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        fn on_alert(&self, _ctx: &OperationContext, _severity: EngineSeverity, _error: &EngineError) {
            self.alerts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn composite_fans_out_to_every_observer() {
        let a = Arc::new(CountingObserver::default());
        let b = Arc::new(CountingObserver::default());
        let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);
        let ctx = OperationContext {
            workbook: 1,
            operation: Operation::Query,
            detail: "SELECT 1".to_string(),
        };
        composite.on_success(&ctx, OperationStats { rows: 3 });
        assert_eq!(a.successes.load(Ordering::SeqCst), 1);
        assert_eq!(b.successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn report_failure_raises_alert_only_for_critical() {
        let observer = Arc::new(CountingObserver::default());
        let composite = CompositeObserver::new(vec![observer.clone()]);
        let ctx = OperationContext {
            workbook: 1,
            operation: Operation::Open,
            detail: "orders.csv".to_string(),
        };
        let err = EngineError::UnknownDataset { name: "x".into() };
        composite.report_failure(&ctx, EngineSeverity::Error, &err);
        assert_eq!(observer.failures.load(Ordering::SeqCst), 1);
        assert_eq!(observer.alerts.load(Ordering::SeqCst), 0);

        composite.report_failure(&ctx, EngineSeverity::Critical, &err);
        assert_eq!(observer.failures.load(Ordering::SeqCst), 2);
        assert_eq!(observer.alerts.load(Ordering::SeqCst), 1);
    }
}
