//! Raw libchrony client ABI.
//!
//! Mirrors the declarations in libchrony's `chrony.h`. Symbols are resolved
//! at runtime with `dlsym`, so only function pointer types live here.
//!
//! Two assumptions must be checked against the installed libchrony: the
//! `chrony_field_type` values below, and that a singleton report (`tracking`,
//! `rtcdata`) can be read with `chrony_request_record(.., 0)` alone, without
//! first calling `chrony_request_report_number_records`.

use std::ffi::{c_char, c_int, c_void};

use chronyscope_core::TypeTag;

/// Opaque `chrony_session`.
#[repr(C)]
pub struct ChronySession {
    _private: [u8; 0],
}

// ============================================================================
// chrony_field_type
// ============================================================================

/// `CHRONY_TYPE_NONE`
pub const CHRONY_TYPE_NONE: c_int = 0;
/// `CHRONY_TYPE_RECORD`
pub const CHRONY_TYPE_RECORD: c_int = 1;
/// `CHRONY_TYPE_UINTEGER`
pub const CHRONY_TYPE_UINTEGER: c_int = 2;
/// `CHRONY_TYPE_INTEGER`
pub const CHRONY_TYPE_INTEGER: c_int = 3;
/// `CHRONY_TYPE_FLOAT`
pub const CHRONY_TYPE_FLOAT: c_int = 4;
/// `CHRONY_TYPE_TIMESPEC`
pub const CHRONY_TYPE_TIMESPEC: c_int = 5;
/// `CHRONY_TYPE_STRING`
pub const CHRONY_TYPE_STRING: c_int = 6;

/// Maps a raw `chrony_field_type` onto the pipeline's tag.
#[must_use]
#[allow(clippy::match_same_arms)]
pub const fn type_tag(raw: c_int) -> TypeTag {
    match raw {
        CHRONY_TYPE_UINTEGER => TypeTag::UInteger,
        CHRONY_TYPE_INTEGER => TypeTag::Integer,
        CHRONY_TYPE_FLOAT => TypeTag::Float,
        CHRONY_TYPE_TIMESPEC => TypeTag::Timespec,
        CHRONY_TYPE_STRING => TypeTag::String,
        // Records are containers, not values.
        CHRONY_TYPE_NONE | CHRONY_TYPE_RECORD => TypeTag::Unknown(raw),
        other => TypeTag::Unknown(other),
    }
}

// ============================================================================
// Function signatures
// ============================================================================

/// `int chrony_open_socket(const char *address)`
pub type OpenSocketFn = unsafe extern "C" fn(address: *const c_char) -> c_int;
/// `void chrony_close_socket(int fd)`
pub type CloseSocketFn = unsafe extern "C" fn(fd: c_int);
/// `chrony_err chrony_init_session(chrony_session **session, int fd)`
pub type InitSessionFn =
    unsafe extern "C" fn(session: *mut *mut ChronySession, fd: c_int) -> c_int;
/// `void chrony_deinit_session(chrony_session *session)`
pub type DeinitSessionFn = unsafe extern "C" fn(session: *mut ChronySession);
/// `chrony_err chrony_request_report_number_records(chrony_session *s, const char *report)`
pub type RequestRecordCountFn =
    unsafe extern "C" fn(session: *mut ChronySession, report: *const c_char) -> c_int;
/// `int chrony_get_report_number_records(chrony_session *s)`
pub type GetRecordCountFn = unsafe extern "C" fn(session: *mut ChronySession) -> c_int;
/// `chrony_err chrony_request_record(chrony_session *s, const char *report, int record)`
pub type RequestRecordFn = unsafe extern "C" fn(
    session: *mut ChronySession,
    report: *const c_char,
    record: c_int,
) -> c_int;
/// `int chrony_needs_response(chrony_session *s)`
pub type NeedsResponseFn = unsafe extern "C" fn(session: *mut ChronySession) -> c_int;
/// `chrony_err chrony_process_response(chrony_session *s)`
pub type ProcessResponseFn = unsafe extern "C" fn(session: *mut ChronySession) -> c_int;
/// `int chrony_get_field_index(chrony_session *s, const char *name)`
pub type GetFieldIndexFn =
    unsafe extern "C" fn(session: *mut ChronySession, name: *const c_char) -> c_int;
/// `chrony_field_type chrony_get_field_type(chrony_session *s, int field)`
pub type GetFieldTypeFn = unsafe extern "C" fn(session: *mut ChronySession, field: c_int) -> c_int;
/// `int64_t chrony_get_field_integer(chrony_session *s, int field)`
pub type GetFieldIntegerFn =
    unsafe extern "C" fn(session: *mut ChronySession, field: c_int) -> i64;
/// `uint64_t chrony_get_field_uinteger(chrony_session *s, int field)`
pub type GetFieldUIntegerFn =
    unsafe extern "C" fn(session: *mut ChronySession, field: c_int) -> u64;
/// `double chrony_get_field_float(chrony_session *s, int field)`
pub type GetFieldFloatFn = unsafe extern "C" fn(session: *mut ChronySession, field: c_int) -> f64;
/// `struct timespec chrony_get_field_timespec(chrony_session *s, int field)`
pub type GetFieldTimespecFn =
    unsafe extern "C" fn(session: *mut ChronySession, field: c_int) -> libc::timespec;
/// `const char *chrony_get_field_string(chrony_session *s, int field)`
pub type GetFieldStringFn =
    unsafe extern "C" fn(session: *mut ChronySession, field: c_int) -> *const c_char;

/// Every symbol the pipeline calls, resolved from one library handle.
#[derive(Clone, Copy)]
pub struct Symbols {
    pub open_socket: OpenSocketFn,
    pub close_socket: CloseSocketFn,
    pub init_session: InitSessionFn,
    pub deinit_session: DeinitSessionFn,
    pub request_record_count: RequestRecordCountFn,
    pub get_record_count: GetRecordCountFn,
    pub request_record: RequestRecordFn,
    pub needs_response: NeedsResponseFn,
    pub process_response: ProcessResponseFn,
    pub get_field_index: GetFieldIndexFn,
    pub get_field_type: GetFieldTypeFn,
    pub get_field_integer: GetFieldIntegerFn,
    pub get_field_uinteger: GetFieldUIntegerFn,
    pub get_field_float: GetFieldFloatFn,
    pub get_field_timespec: GetFieldTimespecFn,
    pub get_field_string: GetFieldStringFn,
}

impl std::fmt::Debug for Symbols {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Symbols").finish_non_exhaustive()
    }
}

/// Resolves `name` in `handle`.
///
/// # Safety
///
/// `handle` must be a live handle returned by `dlopen`, and `T` must be the
/// function pointer type declared for `name` in `chrony.h`.
pub unsafe fn resolve<T: Copy>(handle: *mut c_void, name: &'static str) -> Option<T> {
    debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());
    let cname = std::ffi::CString::new(name).ok()?;
    // SAFETY: handle is live per the caller contract; cname is NUL-terminated.
    let ptr = unsafe { libc::dlsym(handle, cname.as_ptr()) };
    if ptr.is_null() {
        return None;
    }
    // SAFETY: T is a function pointer of the same size as the returned
    // symbol address per the caller contract.
    Some(unsafe { std::mem::transmute_copy::<*mut c_void, T>(&ptr) })
}
