//! FFI (Foreign Function Interface) bindings for the player host.
//!
//! The host loads the library, creates one plugin handle, and calls the
//! exported functions whenever the user searches, browses or plays.
//!
//! # Calling convention
//!
//! - Structured arguments (user variables, music items, categories) are passed
//!   as null-terminated UTF-8 JSON.
//! - Every query returns a JSON envelope, `{"ok":true,"data":...}` or
//!   `{"ok":false,"error":"..."}`, which the caller MUST release with
//!   `webdav_music_free_string()`.
//! - Each handle runs its own single-threaded async runtime; calls block until
//!   the server round trips complete.
//!
//! # Usage from C
//!
//! ```c
//! const char *vars = "{\"url\":\"https://nas/dav\",\"username\":\"u\",\"password\":\"p\"}";
//! WebDavMusicHandle *h = webdav_music_new(vars, 0);
//! char *json = webdav_music_search(h, "Artist", 1);
//! /* ... parse json ... */
//! webdav_music_free_string(json);
//! webdav_music_free(h);
//! ```

use crate::config::{AssetLookup, PluginManifest, SharedConfig, UserVariables};
use crate::error::{PluginError, Result};
use crate::model::{MusicItem, SearchType, TopListItem};
use crate::plugin::WebDavMusicPlugin;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

// ============================================================================
// Handle
// ============================================================================

/// Opaque handle to a plugin instance.
pub struct WebDavMusicHandle {
    runtime: Runtime,
    config: SharedConfig,
    plugin: WebDavMusicPlugin,
}

/// Result code for operations without a payload
#[repr(C)]
pub enum CResultCode {
    Success = 0,
    Error = 1,
}

/// Create a plugin handle.
/// `user_variables` may be null; `asset_lookup` is 0 for listing-based and
/// 1 for live cover/lyric lookup.
/// Returns null if the runtime cannot be started or the JSON is invalid.
/// Caller MUST call webdav_music_free() when done.
#[no_mangle]
pub extern "C" fn webdav_music_new(
    user_variables: *const c_char,
    asset_lookup: c_int,
) -> *mut WebDavMusicHandle {
    let variables = if user_variables.is_null() {
        UserVariables::default()
    } else {
        match parse_json::<UserVariables>(user_variables) {
            Ok(vars) => vars,
            Err(e) => {
                warn!("Rejected user variables: {}", e);
                return ptr::null_mut();
            }
        }
    };

    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            warn!("Failed to start plugin runtime: {}", e);
            return ptr::null_mut();
        }
    };

    let lookup = match asset_lookup {
        1 => AssetLookup::Live,
        _ => AssetLookup::Listing,
    };
    let config = SharedConfig::new(variables);
    let plugin = WebDavMusicPlugin::new(Arc::new(config.clone())).with_asset_lookup(lookup);

    Box::into_raw(Box::new(WebDavMusicHandle {
        runtime,
        config,
        plugin,
    }))
}

/// Free a handle returned by webdav_music_new().
#[no_mangle]
pub extern "C" fn webdav_music_free(handle: *mut WebDavMusicHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}

/// Replace the user variables. The next query reconnects if they changed.
#[no_mangle]
pub extern "C" fn webdav_music_set_user_variables(
    handle: *mut WebDavMusicHandle,
    user_variables: *const c_char,
) -> CResultCode {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return CResultCode::Error;
    };

    match parse_json::<UserVariables>(user_variables) {
        Ok(vars) => {
            handle.config.set(vars);
            CResultCode::Success
        }
        Err(e) => {
            warn!("Rejected user variables: {}", e);
            CResultCode::Error
        }
    }
}

/// Drop the cached listing so the next search rescans the server.
#[no_mangle]
pub extern "C" fn webdav_music_invalidate(handle: *mut WebDavMusicHandle) -> CResultCode {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return CResultCode::Error;
    };
    handle.runtime.block_on(handle.plugin.invalidate());
    CResultCode::Success
}

// ============================================================================
// Queries
// ============================================================================

/// Static plugin metadata as JSON.
#[no_mangle]
pub extern "C" fn webdav_music_manifest() -> *mut c_char {
    respond(Ok(PluginManifest::webdav()))
}

#[no_mangle]
pub extern "C" fn webdav_music_search(
    handle: *mut WebDavMusicHandle,
    query: *const c_char,
    page: c_int,
) -> *mut c_char {
    with_handle(handle, |h| {
        let query = read_str(query)?;
        let page = u32::try_from(page).unwrap_or(1);
        h.runtime
            .block_on(h.plugin.search(&query, page, SearchType::Music))
    })
}

#[no_mangle]
pub extern "C" fn webdav_music_top_lists(handle: *mut WebDavMusicHandle) -> *mut c_char {
    with_handle(handle, |h| h.runtime.block_on(h.plugin.get_top_lists()))
}

#[no_mangle]
pub extern "C" fn webdav_music_top_list_detail(
    handle: *mut WebDavMusicHandle,
    top_list_item: *const c_char,
) -> *mut c_char {
    with_handle(handle, |h| {
        let item: TopListItem = parse_json(top_list_item)?;
        h.runtime.block_on(h.plugin.get_top_list_detail(&item))
    })
}

#[no_mangle]
pub extern "C" fn webdav_music_media_source(
    handle: *mut WebDavMusicHandle,
    music_item: *const c_char,
) -> *mut c_char {
    with_handle(handle, |h| {
        let item: MusicItem = parse_json(music_item)?;
        h.runtime.block_on(h.plugin.get_media_source(&item))
    })
}

#[no_mangle]
pub extern "C" fn webdav_music_music_info(
    handle: *mut WebDavMusicHandle,
    music_item: *const c_char,
) -> *mut c_char {
    with_handle(handle, |h| {
        let item: MusicItem = parse_json(music_item)?;
        h.runtime.block_on(h.plugin.get_music_info(&item))
    })
}

#[no_mangle]
pub extern "C" fn webdav_music_lyric(
    handle: *mut WebDavMusicHandle,
    music_item: *const c_char,
) -> *mut c_char {
    with_handle(handle, |h| {
        let item: MusicItem = parse_json(music_item)?;
        h.runtime.block_on(h.plugin.get_lyric(&item))
    })
}

// ============================================================================
// String Management
// ============================================================================

/// Free a string returned by FFI functions.
#[no_mangle]
pub extern "C" fn webdav_music_free_string(s: *mut c_char) {
    free_c_char(s);
}

// ============================================================================
// Helper Functions
// ============================================================================

fn with_handle<T, F>(handle: *mut WebDavMusicHandle, f: F) -> *mut c_char
where
    T: Serialize,
    F: FnOnce(&WebDavMusicHandle) -> Result<T>,
{
    match unsafe { handle.as_ref() } {
        Some(h) => respond(f(h)),
        None => respond::<()>(Err(PluginError::Request("null plugin handle".into()))),
    }
}

fn respond<T: Serialize>(result: Result<T>) -> *mut c_char {
    let envelope = match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(data) => serde_json::json!({ "ok": true, "data": data }),
            Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
        },
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
    };
    string_to_c_char(&envelope.to_string())
}

fn read_str(s: *const c_char) -> Result<String> {
    if s.is_null() {
        return Ok(String::new());
    }
    let c_str = unsafe { CStr::from_ptr(s) };
    c_str
        .to_str()
        .map(str::to_string)
        .map_err(|e| PluginError::Request(format!("argument is not UTF-8: {e}")))
}

fn parse_json<T: DeserializeOwned>(s: *const c_char) -> Result<T> {
    if s.is_null() {
        return Err(PluginError::Request("missing JSON argument".into()));
    }
    Ok(serde_json::from_str(&read_str(s)?)?)
}

fn string_to_c_char(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn free_c_char(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}
