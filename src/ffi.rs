//! FFI bindings for the Plate engine
//!
//! This module provides C-compatible functions for calling the engine from a
//! mobile host. All functions take C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `plate_free_string`.
//! Dates cross the boundary as `YYYY-MM-DD` strings.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::{dashboard_from_records, onboarding_from_json, DashboardProcessor};
use crate::types::Snapshot;

// Thread-local storage for the last error message
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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::DateParseError(format!("{s}: {e}")))
}

/// Read both string arguments or record which one was invalid
unsafe fn read_args(
    input: *const c_char,
    input_name: &str,
    today: *const c_char,
) -> Option<(String, NaiveDate)> {
    let Some(input) = cstr_to_string(input) else {
        set_last_error(&format!("Invalid {input_name} string pointer"));
        return None;
    };
    let Some(today) = cstr_to_string(today) else {
        set_last_error("Invalid today string pointer");
        return None;
    };
    match parse_date(&today) {
        Ok(date) => Some((input, date)),
        Err(e) => {
            set_last_error(&e.to_string());
            None
        }
    }
}

fn result_to_cstr(result: Result<String, EngineError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute dashboard JSON from plate.record.v1 records (JSON array or NDJSON).
///
/// # Safety
/// - `records` and `today` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `plate_free_string`.
/// - Returns NULL on error; call `plate_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn plate_dashboard_json(
    records: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    match read_args(records, "records", today) {
        Some((records, today)) => result_to_cstr(dashboard_from_records(records, today)),
        None => ptr::null_mut(),
    }
}

/// Compute onboarding plan JSON from an onboarding profile JSON document.
///
/// # Safety
/// - `profile` and `today` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `plate_free_string`.
/// - Returns NULL on error; call `plate_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn plate_onboarding_json(
    profile: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    match read_args(profile, "profile", today) {
        Some((profile, today)) => result_to_cstr(onboarding_from_json(profile, today)),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a DashboardProcessor
pub struct PlateProcessorHandle {
    processor: DashboardProcessor,
}

/// Create a new processor. `config_json` may be NULL for defaults.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `plate_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn plate_processor_new(config_json: *const c_char) -> *mut PlateProcessorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(EngineConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => EngineConfig::from_json(&json),
            None => Err(EngineError::ParseError("config is not valid UTF-8".to_string())),
        }
    };

    match config.and_then(DashboardProcessor::with_config) {
        Ok(processor) => Box::into_raw(Box::new(PlateProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `plate_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn plate_processor_free(processor: *mut PlateProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Accept a snapshot JSON document and return dashboard JSON.
///
/// Returns NULL without setting an error when the snapshot is older than one
/// already accepted.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `plate_processor_new`.
/// - `snapshot` and `today` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `plate_free_string`.
#[no_mangle]
pub unsafe extern "C" fn plate_processor_accept(
    processor: *mut PlateProcessorHandle,
    snapshot: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    let Some((snapshot, today)) = read_args(snapshot, "snapshot", today) else {
        return ptr::null_mut();
    };

    let snapshot: Snapshot = match serde_json::from_str(&snapshot) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&EngineError::from(e).to_string());
            return ptr::null_mut();
        }
    };

    match handle.processor.accept(&snapshot, today) {
        Some(dashboard) => result_to_cstr(
            serde_json::to_string(&dashboard).map_err(|e| EngineError::EncodingError(e.to_string())),
        ),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Plate functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Plate function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn plate_free_string(ptr: *mut c_char) {
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
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Plate function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn plate_last_error() -> *const c_char {
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
pub unsafe extern "C" fn plate_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
