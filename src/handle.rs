//! Handle manager & eviction: a process-wide table of workbooks keyed by opaque integer handle,
//! enforcing `MAX_ACTIVE_WORKBOOKS` and `MAX_RESIDENT_BYTES` via LRU eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};

/// Default cap on simultaneously resident workbooks.
pub const DEFAULT_MAX_ACTIVE_WORKBOOKS: usize = 4;
/// Default cap on total resident bytes across every workbook (256 MiB).
pub const DEFAULT_MAX_RESIDENT_BYTES: u64 = 256 * 1024 * 1024;

struct Inner {
    next_id: u64,
    workbooks: HashMap<u64, Arc<Mutex<EngineContext>>>,
    last_used: HashMap<u64, Instant>,
}

/// Process-wide table of live workbooks. One instance is normally shared (e.g. behind a
/// `static`/`OnceLock` in `abi.rs`), but nothing here assumes global uniqueness.
pub struct HandleTable {
    inner: Mutex<Inner>,
    max_active_workbooks: usize,
    max_resident_bytes: u64,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACTIVE_WORKBOOKS, DEFAULT_MAX_RESIDENT_BYTES)
    }
}

impl HandleTable {
    pub fn new(max_active_workbooks: usize, max_resident_bytes: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                workbooks: HashMap::new(),
                last_used: HashMap::new(),
            }),
            max_active_workbooks,
            max_resident_bytes,
        }
    }

    /// Allocate a fresh, monotonically increasing handle id for `ctx`, then enforce eviction
    /// bounds (the just-allocated handle is never evicted by its own allocation).
    pub fn allocate(&self, ctx: EngineContext) -> u64 {
        let mut inner = self.inner.lock().expect("handle table mutex poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.workbooks.insert(id, Arc::new(Mutex::new(ctx)));
        inner.last_used.insert(id, Instant::now());
        self.enforce_bounds(&mut inner, id);
        id
    }

    /// Resolve `handle` to its workbook, touching `lastUsedAt`. Fails with
    /// [`EngineError::InvalidHandle`] if the handle is unknown or was evicted.
    pub fn get(&self, handle: u64) -> EngineResult<Arc<Mutex<EngineContext>>> {
        let mut inner = self.inner.lock().expect("handle table mutex poisoned");
        if let Some(wb) = inner.workbooks.get(&handle).cloned() {
            inner.last_used.insert(handle, Instant::now());
            Ok(wb)
        } else {
            Err(EngineError::InvalidHandle { handle })
        }
    }

    /// Re-check eviction bounds after an operation (e.g. `attachFile`) increased `handle`'s
    /// resident bytes. `handle` itself is protected from eviction during this call.
    pub fn enforce_bounds_after(&self, handle: u64) {
        let mut inner = self.inner.lock().expect("handle table mutex poisoned");
        inner.last_used.insert(handle, Instant::now());
        self.enforce_bounds(&mut inner, handle);
    }

    /// Remove `handle` from the table. Idempotent — closing an already-closed/evicted handle is a
    /// no-op.
    pub fn close(&self, handle: u64) {
        let mut inner = self.inner.lock().expect("handle table mutex poisoned");
        inner.workbooks.remove(&handle);
        inner.last_used.remove(&handle);
    }

    /// Number of currently-resident workbooks.
    pub fn active_count(&self) -> usize {
        self.inner.lock().expect("handle table mutex poisoned").workbooks.len()
    }

    fn enforce_bounds(&self, inner: &mut Inner, protect: u64) {
        loop {
            if inner.workbooks.len() <= 1 {
                break;
            }
            let total_bytes: u64 = inner
                .workbooks
                .values()
                .map(|wb| wb.lock().expect("workbook mutex poisoned").approx_total_bytes())
                .sum();
            let over_count = inner.workbooks.len() > self.max_active_workbooks;
            let over_bytes = total_bytes > self.max_resident_bytes;
            if !over_count && !over_bytes {
                break;
            }
            let victim = inner
                .last_used
                .iter()
                .filter(|(h, _)| **h != protect)
                .min_by_key(|(_, t)| **t)
                .map(|(h, _)| *h);
            match victim {
                Some(h) => {
                    inner.workbooks.remove(&h);
                    inner.last_used.remove(&h);
                }
                None => break,
            }
        }
    }
}
