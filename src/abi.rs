//! Stable, language-neutral C ABI.
//!
//! The crate ships as a `cdylib` (see `Cargo.toml`); this module is the thin `extern "C"` surface
//! that exposes `EngineContext` through it. Every function here catches every [`EngineError`] at
//! the boundary: a status/0/empty-json is returned and the human message lands in the originating
//! workbook's `last-error` slot.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::{Arc, OnceLock};

use crate::engine::EngineContext;
use crate::error::EngineError;
use crate::format::{resolve_format, ImportFormat};
use crate::handle::HandleTable;
use crate::importers::OpenOptions;
use crate::manifest::{import_project_manifest, Manifest};
use crate::observability::{CompositeObserver, StdErrObserver, WorkbookObserver};

static HANDLES: OnceLock<HandleTable> = OnceLock::new();
static OBSERVER: OnceLock<Arc<dyn WorkbookObserver>> = OnceLock::new();

fn handles() -> &'static HandleTable {
    HANDLES.get_or_init(HandleTable::default)
}

fn observer() -> Arc<dyn WorkbookObserver> {
    OBSERVER
        .get_or_init(|| Arc::new(CompositeObserver::new(vec![Arc::new(StdErrObserver)])))
        .clone()
}

/// Read a caller-owned UTF-8 C string. Null or invalid UTF-8 yields `None` rather than panicking —
/// callers across the ABI boundary are untrusted.
unsafe fn read_cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

unsafe fn read_buf<'a>(buf: *const u8, size: usize) -> &'a [u8] {
    if buf.is_null() || size == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(buf, size) }
    }
}

fn open_options(delim_byte: u8, has_header_flag: i32) -> OpenOptions {
    let mut opts = OpenOptions::default();
    opts.delimiter = delim_byte;
    opts.has_header_row = has_header_flag != 0;
    opts
}

/// Initialize process-wide state. Idempotent; safe to call more than once.
#[no_mangle]
pub extern "C" fn ff_init() {
    handles();
    let _ = observer();
}

#[no_mangle]
pub extern "C" fn ff_openFile(
    buf: *const u8,
    size: usize,
    name: *const c_char,
    fmt_enum: i32,
    delim_byte: u8,
    has_header_flag: i32,
) -> u64 {
    let Some(name) = (unsafe { read_cstr(name) }) else { return 0 };
    let buffer = unsafe { read_buf(buf, size) };

    let mut ctx = EngineContext::new(observer());
    let format = match ImportFormat::from_i32(fmt_enum).and_then(|f| resolve_format(name, f)) {
        Ok(f) => f,
        Err(_) => return 0,
    };
    if ctx.attach_file(0, buffer, name, format, open_options(delim_byte, has_header_flag)).is_err() {
        return 0;
    }
    handles().allocate(ctx)
}

#[no_mangle]
pub extern "C" fn ff_attachFile(
    handle: u64,
    buf: *const u8,
    size: usize,
    name: *const c_char,
    fmt_enum: i32,
    delim_byte: u8,
    has_header_flag: i32,
) -> i32 {
    let Some(name) = (unsafe { read_cstr(name) }) else { return EngineError::InvalidName { name: String::new() }.status_code() };
    let buffer = unsafe { read_buf(buf, size) };

    let Ok(wb) = handles().get(handle) else {
        return EngineError::InvalidHandle { handle }.status_code();
    };
    let mut ctx = wb.lock().expect("workbook mutex poisoned");
    let format = match ImportFormat::from_i32(fmt_enum).and_then(|f| resolve_format(name, f)) {
        Ok(f) => f,
        Err(e) => return e.status_code(),
    };
    let result = ctx.attach_file(handle, buffer, name, format, open_options(delim_byte, has_header_flag));
    drop(ctx);
    handles().enforce_bounds_after(handle);
    status_of(result)
}

#[no_mangle]
pub extern "C" fn ff_detachSource(handle: u64, path: *const c_char) -> i32 {
    with_workbook(handle, |ctx| {
        let Some(path) = (unsafe { read_cstr(path) }) else {
            return Err(EngineError::UnknownSource { path: String::new() });
        };
        ctx.detach_source(handle, path)
    })
    .map(|_| 0)
    .unwrap_or_else(|e| e.status_code())
}

#[no_mangle]
pub extern "C" fn ff_renameDataset(handle: u64, old_name: *const c_char, new_name: *const c_char) -> i32 {
    with_workbook(handle, |ctx| {
        let (Some(old_name), Some(new_name)) = ((unsafe { read_cstr(old_name) }), (unsafe { read_cstr(new_name) })) else {
            return Err(EngineError::InvalidName { name: String::new() });
        };
        ctx.rename_dataset(handle, old_name, new_name)
    })
    .map(|_| 0)
    .unwrap_or_else(|e| e.status_code())
}

#[no_mangle]
pub extern "C" fn ff_listDatasets(handle: u64) -> *const c_char {
    json_call(handle, |ctx| Ok(ctx.list_datasets()))
}

#[no_mangle]
pub extern "C" fn ff_describeDataset(handle: u64, name: *const c_char) -> *const c_char {
    json_call(handle, |ctx| {
        let name = unsafe { read_cstr(name) }.ok_or_else(|| EngineError::UnknownDataset { name: String::new() })?;
        ctx.describe_dataset(handle, name)
    })
}

#[no_mangle]
pub extern "C" fn ff_query(handle: u64, sql: *const c_char) -> *const c_char {
    json_call(handle, |ctx| {
        let sql = unsafe { read_cstr(sql) }.ok_or_else(|| EngineError::MalformedInput { message: "sql is not valid UTF-8".to_string() })?;
        ctx.query(handle, sql)
    })
}

#[no_mangle]
pub extern "C" fn ff_profileDataset(handle: u64, name: *const c_char) -> *const c_char {
    json_call(handle, |ctx| {
        let name = unsafe { read_cstr(name) }.ok_or_else(|| EngineError::UnknownDataset { name: String::new() })?;
        ctx.profile_dataset(handle, name)
    })
}

#[no_mangle]
pub extern "C" fn ff_evaluateQualityRules(handle: u64, name: *const c_char, rules_json: *const c_char) -> *const c_char {
    json_call(handle, |ctx| {
        let name = unsafe { read_cstr(name) }.ok_or_else(|| EngineError::UnknownDataset { name: String::new() })?;
        let rules_json =
            unsafe { read_cstr(rules_json) }.ok_or_else(|| EngineError::MalformedInput { message: "rulesJson is not valid UTF-8".to_string() })?;
        ctx.evaluate_quality_rules(handle, name, rules_json)
    })
}

#[no_mangle]
pub extern "C" fn ff_listDatasetSources(handle: u64) -> *const c_char {
    json_call(handle, |ctx| Ok(ctx.list_dataset_sources()))
}

#[no_mangle]
pub extern "C" fn ff_getWorkbookSourcePaths(handle: u64) -> *const c_char {
    json_call(handle, |ctx| Ok(ctx.get_workbook_source_paths()))
}

#[no_mangle]
pub extern "C" fn ff_getWorkbookMemoryStats(handle: u64) -> *const c_char {
    json_call(handle, |ctx| Ok(ctx.get_workbook_memory_stats()))
}

#[no_mangle]
pub extern "C" fn ff_listDatasetMemoryStats(handle: u64) -> *const c_char {
    json_call(handle, |ctx| Ok(ctx.list_dataset_memory_stats()))
}

#[no_mangle]
pub extern "C" fn ff_exportProjectManifest(handle: u64, project_name: *const c_char) -> *const c_char {
    json_call(handle, |ctx| {
        let project_name = unsafe { read_cstr(project_name) };
        ctx.export_project_manifest(handle, project_name)
    })
}

/// ABI glue, not a core operation: re-entrant "load this path" callbacks aren't expressible in a
/// flat C ABI, so this entrypoint takes every source buffer up front as a parallel array keyed by
/// path, parses `manifestJson`, and imports in one call.
#[no_mangle]
pub extern "C" fn ff_importProjectManifest(
    manifest_json: *const c_char,
    paths: *const *const c_char,
    bufs: *const *const u8,
    sizes: *const usize,
    count: usize,
) -> u64 {
    let Some(manifest_json) = (unsafe { read_cstr(manifest_json) }) else { return 0 };
    let Ok(manifest) = Manifest::parse(manifest_json) else { return 0 };
    if paths.is_null() || bufs.is_null() || sizes.is_null() {
        return 0;
    }

    let mut files: std::collections::HashMap<String, Vec<u8>> = std::collections::HashMap::new();
    for i in 0..count {
        unsafe {
            let path_ptr = *paths.add(i);
            let Some(path) = read_cstr(path_ptr) else { return 0 };
            let buf_ptr = *bufs.add(i);
            let size = *sizes.add(i);
            files.insert(path.to_string(), read_buf(buf_ptr, size).to_vec());
        }
    }

    let result = import_project_manifest(&manifest, observer(), |path| {
        files
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSource { path: path.to_string() })
    });
    match result {
        Ok(ctx) => handles().allocate(ctx),
        Err(_) => 0,
    }
}

#[no_mangle]
pub extern "C" fn ff_getLastError(handle: u64) -> *const c_char {
    match handles().get(handle) {
        Ok(wb) => wb.lock().expect("workbook mutex poisoned").last_error_ptr(),
        Err(_) => std::ptr::null(),
    }
}

#[no_mangle]
pub extern "C" fn ff_getLastJson(handle: u64) -> *const c_char {
    match handles().get(handle) {
        Ok(wb) => wb.lock().expect("workbook mutex poisoned").last_json_ptr(),
        Err(_) => empty_json_ptr(),
    }
}

#[no_mangle]
pub extern "C" fn ff_closeFile(handle: u64) {
    handles().close(handle);
}

fn status_of(result: Result<(), EngineError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.status_code(),
    }
}

fn with_workbook<T>(handle: u64, f: impl FnOnce(&mut EngineContext) -> Result<T, EngineError>) -> Result<T, EngineError> {
    let wb = handles().get(handle)?;
    let mut ctx = wb.lock().expect("workbook mutex poisoned");
    let result = f(&mut ctx);
    drop(ctx);
    handles().enforce_bounds_after(handle);
    result
}

/// Run `f` against the workbook at `handle` and return a pointer to the resulting JSON payload
/// (or the empty-object fallback on any failure).
fn json_call(handle: u64, f: impl FnOnce(&mut EngineContext) -> Result<serde_json::Value, EngineError>) -> *const c_char {
    let Ok(wb) = handles().get(handle) else {
        return empty_json_ptr();
    };
    let mut ctx = wb.lock().expect("workbook mutex poisoned");
    let _ = f(&mut ctx);
    let ptr = ctx.last_json_ptr();
    drop(ctx);
    handles().enforce_bounds_after(handle);
    ptr
}

fn empty_json_ptr() -> *const c_char {
    thread_local! {
        static EMPTY: CString = CString::new("{}").unwrap();
    }
    EMPTY.with(|c| c.as_ptr())
}
