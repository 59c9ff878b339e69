//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Inputs
//! - Document records are UTF-8 JSON byte ranges (not necessarily
//!   null-terminated), tagged with `"kind"`.
//! - `profile_json` (company profile JSON) and `config_toml` (render
//!   settings) are optional null-terminated strings; pass `NULL` for
//!   defaults.
//!
//! ## Memory management
//! - Buffers returned by `jsd_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `jsd_free_buffer` / `jsd_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`: `0` success, `1` null
//!   pointer, `2` invalid UTF-8, `3` invalid record/profile/config/layout,
//!   `4` generation failure.
//! - Error details can be retrieved via `jsd_last_error`.
//!
//! ## Thread safety
//! - `jsd_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -ljobsite_docs
//! // #include <stdint.h>
//! // extern int jsd_generate_pdf(const uint8_t* record, uint32_t record_len,
//! //                             const char* profile_json, const char* config_toml,
//! //                             uint8_t** out_buf, uint32_t* out_len);
//! // extern void jsd_free_buffer(uint8_t* buf, uint32_t len);
//! // extern const char* jsd_last_error();
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;
use std::slice;

use crate::compose::compose_document;
use crate::config::RenderConfig;
use crate::document::{DocumentRecord, Profile};
use crate::draw::DocumentLayout;
use crate::pipeline::{generate, Generated};

const ERR_NULL: c_int = 1;
const ERR_UTF8: c_int = 2;
const ERR_INPUT: c_int = 3;
const ERR_GENERATE: c_int = 4;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Error code plus message, reported through `jsd_last_error`.
struct FfiError(c_int, String);

impl FfiError {
    fn report(self) -> c_int {
        set_last_error(&self.1);
        self.0
    }
}

struct Inputs {
    record: DocumentRecord,
    profile: Profile,
    config: RenderConfig,
}

/// # Safety
/// `ptr`, if non-null, must point to a valid null-terminated string.
unsafe fn optional_str<'a>(ptr: *const c_char, what: &str) -> Result<Option<&'a str>, FfiError> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|e| FfiError(ERR_UTF8, format!("Invalid UTF-8 in {what}: {e}")))
}

/// # Safety
/// `record_ptr` must point to `record_len` bytes; the optional strings must
/// be null or valid null-terminated strings.
unsafe fn read_inputs(
    record_ptr: *const u8,
    record_len: u32,
    profile_json: *const c_char,
    config_toml: *const c_char,
) -> Result<Inputs, FfiError> {
    if record_ptr.is_null() {
        return Err(FfiError(ERR_NULL, "Null pointer argument".to_string()));
    }
    let bytes = slice::from_raw_parts(record_ptr, record_len as usize);
    let json = std::str::from_utf8(bytes).map_err(|e| FfiError(ERR_UTF8, format!("Invalid UTF-8: {e}")))?;
    let record = DocumentRecord::from_json(json).map_err(|e| FfiError(ERR_INPUT, e.to_string()))?;

    let profile = match optional_str(profile_json, "profile")? {
        Some(s) => serde_json::from_str(s).map_err(|e| FfiError(ERR_INPUT, format!("Invalid profile: {e}")))?,
        None => Profile::default(),
    };
    let config = match optional_str(config_toml, "config")? {
        Some(s) => RenderConfig::from_toml_str(s, Path::new("<ffi>")).map_err(|e| FfiError(ERR_INPUT, e.to_string()))?,
        None => RenderConfig::default(),
    };
    Ok(Inputs {
        record,
        profile,
        config,
    })
}

/// # Safety
/// `out_buf` and `out_len` must be valid pointers.
unsafe fn hand_out_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

/// # Safety
/// `out` must be a valid pointer.
unsafe fn hand_out_string(s: String, out: *mut *mut c_char) -> Result<(), FfiError> {
    let cs = CString::new(s).map_err(|_| FfiError(ERR_GENERATE, "Output contained a null byte".to_string()))?;
    *out = cs.into_raw();
    Ok(())
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Generate a PDF from a document record.
///
/// # Parameters
/// - `record_ptr`, `record_len`: UTF-8 JSON document record
/// - `profile_json`: optional company profile JSON (`NULL` for none)
/// - `config_toml`: optional render settings TOML (`NULL` for defaults)
/// - `out_buf`, `out_len`: on success, receive the heap-allocated PDF bytes
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `jsd_last_error`.
///
/// # Safety
/// - `record_ptr` must point to `record_len` valid bytes.
/// - `profile_json` / `config_toml` must be null or null-terminated strings.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `jsd_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn jsd_generate_pdf(
    record_ptr: *const u8,
    record_len: u32,
    profile_json: *const c_char,
    config_toml: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    let inputs = match read_inputs(record_ptr, record_len, profile_json, config_toml) {
        Ok(i) => i,
        Err(e) => return e.report(),
    };
    match generate(&inputs.record, &inputs.profile, &inputs.config, false) {
        Ok(Generated::File { bytes, .. }) => {
            hand_out_buffer(bytes, out_buf, out_len);
            0
        }
        Ok(Generated::DataUri(_)) => FfiError(ERR_GENERATE, "Unexpected data URI output".to_string()).report(),
        Err(e) => FfiError(ERR_GENERATE, e.to_string()).report(),
    }
}

/// Generate a PDF and return it as a
/// `data:application/pdf;filename=...;base64,...` string.
///
/// # Safety
/// Same as `jsd_generate_pdf`. `*out_uri` must be freed with
/// `jsd_free_string`.
#[no_mangle]
pub unsafe extern "C" fn jsd_generate_data_uri(
    record_ptr: *const u8,
    record_len: u32,
    profile_json: *const c_char,
    config_toml: *const c_char,
    out_uri: *mut *mut c_char,
) -> c_int {
    if out_uri.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    let inputs = match read_inputs(record_ptr, record_len, profile_json, config_toml) {
        Ok(i) => i,
        Err(e) => return e.report(),
    };
    let uri = match generate(&inputs.record, &inputs.profile, &inputs.config, true) {
        Ok(Generated::DataUri(uri)) => uri,
        Ok(Generated::File { .. }) => {
            return FfiError(ERR_GENERATE, "Unexpected file output".to_string()).report()
        }
        Err(e) => return FfiError(ERR_GENERATE, e.to_string()).report(),
    };
    match hand_out_string(uri, out_uri) {
        Ok(()) => 0,
        Err(e) => e.report(),
    }
}

/// Compute only the page layout (no PDF rendering). Returns JSON that
/// `jsd_render_from_layout` accepts.
///
/// # Safety
/// Same as `jsd_generate_pdf`. `*out_json` must be freed with
/// `jsd_free_string`.
#[no_mangle]
pub unsafe extern "C" fn jsd_compute_layout(
    record_ptr: *const u8,
    record_len: u32,
    profile_json: *const c_char,
    config_toml: *const c_char,
    out_json: *mut *mut c_char,
) -> c_int {
    if out_json.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    let inputs = match read_inputs(record_ptr, record_len, profile_json, config_toml) {
        Ok(i) => i,
        Err(e) => return e.report(),
    };
    let loader = crate::assets::DefaultAssetLoader::new(
        inputs.config.fetch_timeout_secs.map(std::time::Duration::from_secs),
    );
    let layout = match compose_document(&inputs.record, &inputs.profile, &inputs.config, &loader) {
        Ok(l) => l,
        Err(e) => return FfiError(ERR_GENERATE, e.to_string()).report(),
    };
    match hand_out_string(layout.to_json(), out_json) {
        Ok(()) => 0,
        Err(e) => e.report(),
    }
}

/// Render a PDF from a layout JSON string produced by `jsd_compute_layout`.
///
/// This allows pre-computing the layout and rendering separately.
///
/// # Safety
/// `json_ptr` must be a valid null-terminated string; `out_buf` and
/// `out_len` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn jsd_render_from_layout(
    json_ptr: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    let json = match CStr::from_ptr(json_ptr).to_str() {
        Ok(s) => s,
        Err(e) => return FfiError(ERR_UTF8, format!("Invalid UTF-8 in JSON: {e}")).report(),
    };
    let layout = match DocumentLayout::from_json(json) {
        Ok(l) => l,
        Err(e) => return FfiError(ERR_INPUT, format!("Invalid layout JSON: {e}")).report(),
    };
    match crate::render::render_pdf(&layout) {
        Ok(bytes) => {
            hand_out_buffer(bytes, out_buf, out_len);
            0
        }
        Err(e) => FfiError(ERR_GENERATE, e.to_string()).report(),
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `jsd_generate_pdf` or
/// `jsd_render_from_layout`.
///
/// # Safety
/// `buf` must have been returned by one of those calls, and `len` must be
/// the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn jsd_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a string returned by `jsd_generate_data_uri` or `jsd_compute_layout`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn jsd_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `jsd_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn jsd_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn jsd_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &[u8] = br#"{"kind":"invoice","invoiceNumber":"INV-1","items":[{"description":"Framing","quantity":2,"rate":50}]}"#;

    fn last_error() -> String {
        unsafe { CStr::from_ptr(jsd_last_error()) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_generate_pdf() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            jsd_generate_pdf(
                RECORD.as_ptr(),
                RECORD.len() as u32,
                ptr::null(),
                ptr::null(),
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        assert!(out_len > 100);
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { jsd_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_generate_data_uri_with_profile_and_config() {
        let profile = CString::new(r#"{"companyName":"Ridge Roofing"}"#).unwrap();
        let config = CString::new("raster_scale = 1.0\n").unwrap();
        let mut uri: *mut c_char = ptr::null_mut();

        let rc = unsafe {
            jsd_generate_data_uri(
                RECORD.as_ptr(),
                RECORD.len() as u32,
                profile.as_ptr(),
                config.as_ptr(),
                &mut uri,
            )
        };

        assert_eq!(rc, 0);
        let s = unsafe { CStr::from_ptr(uri) }.to_str().unwrap();
        assert!(s.starts_with("data:application/pdf;filename=Invoice-INV-1.pdf;base64,"));
        unsafe { jsd_free_string(uri) };
    }

    #[test]
    fn ffi_layout_round_trips_through_render() {
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            jsd_compute_layout(
                RECORD.as_ptr(),
                RECORD.len() as u32,
                ptr::null(),
                ptr::null(),
                &mut json_ptr,
            )
        };
        assert_eq!(rc, 0);
        let json = unsafe { CStr::from_ptr(json_ptr) }.to_str().unwrap();
        assert!(json.contains("\"op\": \"table\""));

        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { jsd_render_from_layout(json_ptr, &mut out_buf, &mut out_len) };
        assert_eq!(rc, 0);
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");

        unsafe {
            jsd_free_buffer(out_buf, out_len);
            jsd_free_string(json_ptr);
        }
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { jsd_generate_pdf(ptr::null(), 0, ptr::null(), ptr::null(), &mut out_buf, &mut out_len) };
        assert_eq!(rc, ERR_NULL);
        assert_eq!(last_error(), "Null pointer argument");
    }

    #[test]
    fn ffi_invalid_record_reports_error() {
        let bad = br#"{"kind":"brochure"}"#;
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe {
            jsd_generate_pdf(bad.as_ptr(), bad.len() as u32, ptr::null(), ptr::null(), &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, ERR_INPUT);
        assert!(last_error().starts_with("Invalid document record"));
        assert!(out_buf.is_null());
    }

    #[test]
    fn ffi_invalid_layout_json() {
        let json = CString::new("{not json").unwrap();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { jsd_render_from_layout(json.as_ptr(), &mut out_buf, &mut out_len) };
        assert_eq!(rc, ERR_INPUT);
        assert!(last_error().starts_with("Invalid layout JSON"));
    }

    #[test]
    fn ffi_version() {
        let v = jsd_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
