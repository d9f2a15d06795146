//! C ABI for embedding hosts
//!
//! Hosts call `sentinel_init` once, then `sentinel_run_detection` per CSV
//! payload. Every returned string is owned by Rust and must be released with
//! `sentinel_free_string`.

use std::ffi::{CStr, CString, c_char};

use crate::config::SentinelConfig;
use crate::payload::DetectionResponse;
use crate::runtime;

/// Load models from `model_dir` (or the environment when null).
///
/// Returns whether models are available. Safe to call more than once; only
/// the first call loads.
#[unsafe(no_mangle)]
pub extern "C" fn sentinel_init(model_dir: *const c_char) -> bool {
    let _ = tracing_subscriber::fmt().try_init();

    let mut config = SentinelConfig::from_env();
    if !model_dir.is_null() {
        let c_str = unsafe { CStr::from_ptr(model_dir) };
        match c_str.to_str() {
            Ok(dir) if !dir.is_empty() => config = config.with_model_dir(dir),
            Ok(_) => {}
            Err(_) => {
                tracing::warn!("model_dir is not valid UTF-8, using configured directory");
            }
        }
    }

    runtime::init(&config)
}

/// Run detection over a NUL-terminated CSV string.
///
/// Always returns a response JSON string (never null).
#[unsafe(no_mangle)]
pub extern "C" fn sentinel_run_detection(csv: *const c_char) -> *mut c_char {
    let json = if csv.is_null() {
        error_json("CSV input is null")
    } else {
        let c_str = unsafe { CStr::from_ptr(csv) };
        match c_str.to_str() {
            Ok(text) => runtime::run_detection(text),
            Err(_) => error_json("CSV input is not valid UTF-8"),
        }
    };

    into_c_string(json)
}

#[unsafe(no_mangle)]
pub extern "C" fn sentinel_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(s);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sentinel_models_ready() -> bool {
    runtime::models_ready()
}

/// Crate version as a static NUL-terminated string (do not free)
#[unsafe(no_mangle)]
pub extern "C" fn sentinel_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

fn error_json(message: &str) -> String {
    DetectionResponse::Error {
        message: message.to_string(),
        missing: None,
    }
    .to_json()
}

fn into_c_string(json: String) -> *mut c_char {
    // serde_json escapes control characters, so interior NULs cannot occur
    CString::new(json)
        .unwrap_or_else(|_| c"{\"status\":\"error\",\"message\":\"invalid response\"}".to_owned())
        .into_raw()
}
