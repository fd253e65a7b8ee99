//! FFI bindings for the SHPIA context analyzer
//!
//! C-compatible entry points. All functions take null-terminated C strings and
//! return allocated memory that must be freed with `shpia_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::aggregate::aggregate_records_json;
use crate::config::AnalyzerConfig;
use crate::pipeline::{analyze_aggregated_json, ContextAnalyzer};
use crate::rules::ActivityRules;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Caller must free the result
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze an aggregated sensor document and return the report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `shpia_free_string`.
/// - Returns NULL on error; call `shpia_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn shpia_analyze_json(
    json: *const c_char,
    window_minutes: u32,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match analyze_aggregated_json(json_str, window_minutes) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Aggregate a raw record array into the analyzer input document.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `shpia_free_string`.
/// - Returns NULL on error; call `shpia_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn shpia_aggregate_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match aggregate_records_json(json_str) {
        Ok(aggregated) => string_to_cstr(&aggregated),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Analyzer Handle API
// ============================================================================

/// Opaque handle to a ContextAnalyzer
pub struct ShpiaAnalyzerHandle {
    analyzer: ContextAnalyzer,
}

/// Create an analyzer with the given window size and the built-in rules.
///
/// # Safety
/// - Must be freed with `shpia_analyzer_free`.
/// - Returns NULL on an invalid window; call `shpia_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn shpia_analyzer_new(window_minutes: u32) -> *mut ShpiaAnalyzerHandle {
    clear_last_error();

    let config = AnalyzerConfig::default().with_time_window(window_minutes);
    match ContextAnalyzer::new(config) {
        Ok(analyzer) => Box::into_raw(Box::new(ShpiaAnalyzerHandle { analyzer })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `shpia_analyzer_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn shpia_analyzer_free(analyzer: *mut ShpiaAnalyzerHandle) {
    if !analyzer.is_null() {
        drop(Box::from_raw(analyzer));
    }
}

/// Replace the analyzer's activity rules with a JSON array of rule rows.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `shpia_analyzer_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; the previous rules stay in place on error.
#[no_mangle]
pub unsafe extern "C" fn shpia_analyzer_set_rules(
    analyzer: *mut ShpiaAnalyzerHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return -1;
    }
    let handle = &mut *analyzer;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match ActivityRules::from_json(&json_str) {
        Ok(rules) => {
            handle.analyzer.set_rules(rules);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Analyze an aggregated document with a configured analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `shpia_analyzer_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `shpia_free_string`.
/// - Returns NULL on error; call `shpia_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn shpia_analyzer_analyze(
    analyzer: *const ShpiaAnalyzerHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }
    let handle = &*analyzer;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match handle
        .analyzer
        .analyze_json(&json_str)
        .and_then(|report| report.to_json_pretty())
    {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a `shpia_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `shpia_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn shpia_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - The returned pointer is valid until the next `shpia_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn shpia_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn shpia_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
