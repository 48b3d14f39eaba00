//! FFI interface for C/C++ hosts
//!
//! Requests and results cross the boundary as JSON. A request is a
//! serialized [`ScrapeRequest`]; the result is the scraped value.
//!
//! Every call goes through one process-wide [`Scraper`], so a login made
//! by one call is reused by later calls naming the same `sessionId`.

use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::OnceLock;

use serde_json::Value;
use tokio::runtime::Runtime;

use crate::scrape::{ScrapeRequest, Scraper};

/// Runtime and scraper shared by all FFI calls
struct Engine {
    runtime: Runtime,
    scraper: Scraper,
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

fn engine() -> Result<&'static Engine, String> {
    if let Some(engine) = ENGINE.get() {
        return Ok(engine);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;
    let scraper = Scraper::new().map_err(|e| e.to_string())?;
    // A racing caller may have won; its engine is kept and this one dropped
    Ok(ENGINE.get_or_init(|| Engine { runtime, scraper }))
}

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via free_scrape_result
#[repr(C)]
pub struct ScrapeResultFFI {
    /// JSON-serialized result (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if the scrape failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Run a scrape described by a JSON request.
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_scrape_result`
#[no_mangle]
pub unsafe extern "C" fn scrape_json(request_json: *const c_char) -> ScrapeResultFFI {
    let request_str = match read_c_str(request_json) {
        Ok(s) => s,
        Err(msg) => return make_error_result(msg),
    };
    into_ffi(perform_scrape(request_str, None))
}

/// Run a scrape over HTML the host already has.
///
/// The request still needs its `url` to resolve relative links.
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `request_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_scrape_result`
#[no_mangle]
pub unsafe extern "C" fn scrape_html_json(
    html_ptr: *const c_char,
    html_len: usize,
    request_json: *const c_char,
) -> ScrapeResultFFI {
    let html = if html_ptr.is_null() || html_len == 0 {
        String::new()
    } else {
        let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
        match std::str::from_utf8(slice) {
            Ok(s) => s.to_string(),
            Err(_) => return make_error_result("Invalid UTF-8 in HTML content"),
        }
    };

    let request_str = match read_c_str(request_json) {
        Ok(s) => s,
        Err(msg) => return make_error_result(msg),
    };
    into_ffi(perform_scrape(request_str, Some(html)))
}

/// Free a ScrapeResultFFI returned by this module
///
/// # Safety
/// - `result` must have been returned by `scrape_json` or `scrape_html_json`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_scrape_result(result: ScrapeResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_c_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("Request JSON is null");
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| "Invalid UTF-8 in request JSON")
}

// Helper to create error result
fn make_error_result(msg: &str) -> ScrapeResultFFI {
    let error_cstr = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    ScrapeResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}

fn into_ffi(result: Result<Value, String>) -> ScrapeResultFFI {
    let value = match result {
        Ok(value) => value,
        Err(msg) => return make_error_result(&msg),
    };
    match serde_json::to_string(&value) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ScrapeResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

fn perform_scrape(request_str: &str, html: Option<String>) -> Result<Value, String> {
    let engine = engine()?;
    scrape_with(&engine.runtime, &engine.scraper, request_str, html)
}

// Parse the request and drive the scrape to completion
fn scrape_with(
    runtime: &Runtime,
    scraper: &Scraper,
    request_str: &str,
    html: Option<String>,
) -> Result<Value, String> {
    let mut request: ScrapeRequest = serde_json::from_str(request_str)
        .map_err(|e| format!("Failed to parse request JSON: {}", e))?;
    if html.is_some() {
        request.html = html;
    }
    runtime
        .block_on(scraper.scrape(request))
        .map_err(|e| e.to_string())
}
