//! FFI bindings for Synheart Onboard
//!
//! C-compatible functions for driving a user store from a mobile host.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `onboard_free_string`.
//!
//! Store handles are not thread-safe; use each handle from the thread that
//! created it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use tracing::warn;

use crate::action::UserAction;
use crate::config::StoreConfig;
use crate::error::OnboardError;
use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};
use crate::store::{Subscription, UserStore};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Snapshot callback. `snapshot_json` is only valid for the duration of the call.
pub type OnboardSnapshotCallback =
    extern "C" fn(snapshot_json: *const c_char, user_data: *mut c_void);

// ============================================================================
// Store API
// ============================================================================

/// Opaque handle to a UserStore
pub struct OnboardStoreHandle {
    subscriptions: RefCell<HashMap<u64, Subscription>>,
    next_subscription: Cell<u64>,
    store: UserStore,
}

fn build_store(storage_dir: Option<String>, config: &StoreConfig) -> UserStore {
    match storage_dir {
        Some(dir) => UserStore::with_config(FileKeyValueStore::new(dir), config),
        None => UserStore::with_config(MemoryKeyValueStore::new(), config),
    }
}

fn into_handle(store: UserStore) -> *mut OnboardStoreHandle {
    let handle = Box::new(OnboardStoreHandle {
        subscriptions: RefCell::new(HashMap::new()),
        next_subscription: Cell::new(1),
        store,
    });
    Box::into_raw(handle)
}

/// Create a store persisting under `storage_dir` with the default configuration.
///
/// # Safety
/// - `storage_dir` must be a valid null-terminated C string, or NULL for an
///   in-memory store.
/// - Returns a pointer to a newly allocated store.
/// - Must be freed with `onboard_store_free`.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_new(storage_dir: *const c_char) -> *mut OnboardStoreHandle {
    clear_last_error();

    let dir = cstr_to_string(storage_dir);
    into_handle(build_store(dir, &StoreConfig::default()))
}

/// Create a store with a JSON configuration.
///
/// Only `storage_key` affects the store. Inputs are bound on the host side,
/// so `debounce_ms` is validated but otherwise unused here.
///
/// # Safety
/// - `storage_dir` must be a valid null-terminated C string, or NULL for an
///   in-memory store.
/// - `config_json` must be a valid null-terminated C string.
/// - Must be freed with `onboard_store_free`.
/// - Returns NULL on error; call `onboard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_new_with_config(
    storage_dir: *const c_char,
    config_json: *const c_char,
) -> *mut OnboardStoreHandle {
    clear_last_error();

    let config_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    let config = match StoreConfig::from_json(&config_str) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let dir = cstr_to_string(storage_dir);
    into_handle(build_store(dir, &config))
}

/// Free a store and every subscription registered through it.
///
/// # Safety
/// - `store` must be a valid pointer returned by `onboard_store_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_free(store: *mut OnboardStoreHandle) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Dispatch a JSON-encoded action, e.g.
/// `{"type":"update_field","field":"firstName","value":"Jane"}`.
///
/// # Safety
/// - `store` must be a valid pointer returned by `onboard_store_new`.
/// - `action_json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `onboard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_dispatch(
    store: *const OnboardStoreHandle,
    action_json: *const c_char,
) -> i32 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1;
    }

    let handle = &*store;

    let json_str = match cstr_to_string(action_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid action string pointer");
            return -1;
        }
    };

    match UserAction::from_json(&json_str) {
        Ok(action) => {
            handle.store.dispatch(action);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Current state as JSON, including the derived fields.
///
/// # Safety
/// - `store` must be a valid pointer returned by `onboard_store_new`.
/// - Returns a newly allocated string that must be freed with `onboard_free_string`.
/// - Returns NULL on error; call `onboard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_snapshot(store: *const OnboardStoreHandle) -> *mut c_char {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return ptr::null_mut();
    }

    let handle = &*store;

    match handle.store.snapshot().to_snapshot().to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&OnboardError::from(e).to_string());
            ptr::null_mut()
        }
    }
}

/// Whether a record is currently persisted.
///
/// # Safety
/// - `store` must be a valid pointer returned by `onboard_store_new`.
/// - Returns 1 if saved data exists, 0 if not, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_has_saved_data(store: *const OnboardStoreHandle) -> i32 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1;
    }

    match (*store).store.saved_data_exists() {
        Ok(exists) => i32::from(exists),
        Err(e) => {
            set_last_error(&OnboardError::from(e).to_string());
            -1
        }
    }
}

/// Register a callback that receives snapshot JSON on every state change.
///
/// The callback is invoked once immediately with the current state.
///
/// # Safety
/// - `store` must be a valid pointer returned by `onboard_store_new`.
/// - `user_data` is passed back verbatim and must stay valid until the
///   subscription is removed or the store is freed.
/// - Returns a non-zero subscription id, or 0 on error.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_subscribe(
    store: *const OnboardStoreHandle,
    callback: Option<OnboardSnapshotCallback>,
    user_data: *mut c_void,
) -> u64 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return 0;
    }

    let Some(callback) = callback else {
        set_last_error("Null callback pointer");
        return 0;
    };

    let handle = &*store;
    let id = handle.next_subscription.get();
    handle.next_subscription.set(id + 1);

    let subscription = handle.store.subscribe(move |state| {
        let json = match state.to_snapshot().to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode snapshot for host callback");
                return;
            }
        };
        if let Ok(cstr) = CString::new(json) {
            callback(cstr.as_ptr(), user_data);
        }
    });

    handle.subscriptions.borrow_mut().insert(id, subscription);
    id
}

/// Remove a subscription.
///
/// # Safety
/// - `store` must be a valid pointer returned by `onboard_store_new`.
/// - Returns 0 on success, -1 if the id is unknown or already removed.
#[no_mangle]
pub unsafe extern "C" fn onboard_store_unsubscribe(
    store: *const OnboardStoreHandle,
    subscription_id: u64,
) -> i32 {
    clear_last_error();

    if store.is_null() {
        set_last_error("Null store pointer");
        return -1;
    }

    let handle = &*store;
    let removed = handle.subscriptions.borrow_mut().remove(&subscription_id);
    match removed {
        Some(subscription) => {
            subscription.unsubscribe();
            0
        }
        None => {
            set_last_error(&format!("Unknown subscription id: {}", subscription_id));
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Onboard functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an Onboard function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn onboard_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Onboard function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn onboard_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Onboard library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn onboard_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
