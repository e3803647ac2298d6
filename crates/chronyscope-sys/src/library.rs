//! Loading libchrony and opening sessions on it.

use std::ffi::{CString, c_int, c_void};
use std::path::Path;
use std::sync::Arc;

use chronyscope_core::{ChronyError, ChronyLibrary, NativeFailure, NativeStatus, Stage};

use crate::connection::Connection;
use crate::ffi::{self, ChronySession, Symbols};

/// A `dlopen` handle plus every resolved symbol. Closed on last drop.
pub(crate) struct Handle {
    raw: *mut c_void,
    name: String,
    pub(crate) symbols: Symbols,
}

// SAFETY: the handle is only passed to dlclose once, on drop; libchrony's
// functions carry no thread affinity and every session they act on is owned
// by exactly one `Connection`.
unsafe impl Send for Handle {}
// SAFETY: see above; `Handle` is immutable after construction.
unsafe impl Sync for Handle {}

impl Drop for Handle {
    fn drop(&mut self) {
        // SAFETY: raw came from a successful dlopen and is closed once.
        unsafe {
            libc::dlclose(self.raw);
        }
        tracing::debug!(library = %self.name, "unloaded libchrony");
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("name", &self.name).finish()
    }
}

/// libchrony loaded at runtime.
///
/// Cloning is cheap; every clone and every open connection keeps the shared
/// object mapped.
#[derive(Debug, Clone)]
pub struct LibChrony {
    handle: Arc<Handle>,
}

impl LibChrony {
    /// Loads the first library in `names` that `dlopen` accepts and resolves
    /// every symbol the pipeline calls.
    ///
    /// # Errors
    /// Library error naming the libraries tried, or the first missing symbol.
    pub fn load<S: AsRef<str>>(names: &[S]) -> Result<Self, ChronyError> {
        let mut tried = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let Ok(cname) = CString::new(name) else {
                tried.push(format!("{name}: invalid name"));
                continue;
            };
            // SAFETY: cname is NUL-terminated; RTLD_NOW resolves eagerly.
            let raw = unsafe { libc::dlopen(cname.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
            if raw.is_null() {
                tried.push(format!("{name}: {}", dlerror()));
                continue;
            }

            // SAFETY: raw is a live dlopen handle.
            return match unsafe { resolve_symbols(raw) } {
                Ok(symbols) => {
                    tracing::debug!(library = name, "loaded libchrony");
                    Ok(Self {
                        handle: Arc::new(Handle {
                            raw,
                            name: name.to_string(),
                            symbols,
                        }),
                    })
                }
                Err(symbol) => {
                    // SAFETY: raw is live and not shared with anything yet.
                    unsafe {
                        libc::dlclose(raw);
                    }
                    Err(chronyscope_core::classify::classify(
                        Stage::Load,
                        NativeFailure::SymbolMissing { symbol },
                    ))
                }
            };
        }

        Err(chronyscope_core::classify::classify(
            Stage::Load,
            NativeFailure::LibraryMissing {
                detail: tried.join("; "),
            },
        ))
    }

    /// Loads libchrony under its default names.
    ///
    /// # Errors
    /// See [`LibChrony::load`].
    pub fn load_default() -> Result<Self, ChronyError> {
        Self::load(&chronyscope_core::config::DEFAULT_LIBRARY_NAMES)
    }

    /// Name of the loaded shared object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.handle.name
    }
}

impl ChronyLibrary for LibChrony {
    type Connection = Connection;

    fn connect(&self, target: &str) -> Result<Connection, NativeFailure> {
        let symbols = &self.handle.symbols;
        let ctarget = CString::new(target).map_err(|_| NativeFailure::TargetMissing {
            target: target.to_string(),
            code: None,
        })?;

        // SAFETY: ctarget is NUL-terminated and outlives the call.
        let fd = unsafe { (symbols.open_socket)(ctarget.as_ptr()) };
        if fd < 0 {
            let errno = std::io::Error::last_os_error().raw_os_error();
            return Err(classify_open_failure(target, fd, errno));
        }

        let mut session: *mut ChronySession = std::ptr::null_mut();
        // SAFETY: session is a valid out-pointer; fd was just opened.
        let status = unsafe { (symbols.init_session)(&raw mut session, fd) };
        if status != 0 || session.is_null() {
            // SAFETY: fd is open and owned here.
            unsafe { (symbols.close_socket)(fd) };
            return Err(NativeFailure::SessionInit(NativeStatus(status)));
        }

        Ok(Connection::new(Arc::clone(&self.handle), session, fd))
    }
}

/// Splits a failed `chrony_open_socket` into permission or connection.
pub(crate) fn classify_open_failure(target: &str, fd: c_int, errno: Option<i32>) -> NativeFailure {
    let denied_code = fd == -libc::EACCES || fd == -libc::EPERM;
    let denied_errno = matches!(errno, Some(libc::EACCES | libc::EPERM));
    if denied_code || denied_errno || exists_without_access(target) {
        NativeFailure::AccessDenied {
            target: target.to_string(),
            code: Some(fd),
        }
    } else {
        NativeFailure::TargetMissing {
            target: target.to_string(),
            code: Some(fd),
        }
    }
}

fn exists_without_access(target: &str) -> bool {
    if !Path::new(target).exists() {
        return false;
    }
    let Ok(ctarget) = CString::new(target) else {
        return false;
    };
    // SAFETY: ctarget is NUL-terminated.
    unsafe { libc::access(ctarget.as_ptr(), libc::R_OK | libc::W_OK) != 0 }
}

fn dlerror() -> String {
    // SAFETY: dlerror returns NULL or a NUL-terminated thread-local string.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return "unknown dlopen error".to_string();
    }
    // SAFETY: non-null, NUL-terminated per dlerror contract.
    unsafe { std::ffi::CStr::from_ptr(msg) }
        .to_string_lossy()
        .into_owned()
}

/// Resolves every symbol, returning the first missing one.
///
/// # Safety
///
/// `raw` must be a live `dlopen` handle.
unsafe fn resolve_symbols(raw: *mut c_void) -> Result<Symbols, &'static str> {
    macro_rules! sym {
        ($name:literal) => {
            // SAFETY: raw is live; the target type is the chrony.h signature.
            unsafe { ffi::resolve(raw, $name) }.ok_or($name)?
        };
    }

    let symbols = Symbols {
        open_socket: sym!("chrony_open_socket"),
        close_socket: sym!("chrony_close_socket"),
        init_session: sym!("chrony_init_session"),
        deinit_session: sym!("chrony_deinit_session"),
        request_record_count: sym!("chrony_request_report_number_records"),
        get_record_count: sym!("chrony_get_report_number_records"),
        request_record: sym!("chrony_request_record"),
        needs_response: sym!("chrony_needs_response"),
        process_response: sym!("chrony_process_response"),
        get_field_index: sym!("chrony_get_field_index"),
        get_field_type: sym!("chrony_get_field_type"),
        get_field_integer: sym!("chrony_get_field_integer"),
        get_field_uinteger: sym!("chrony_get_field_uinteger"),
        get_field_float: sym!("chrony_get_field_float"),
        get_field_timespec: sym!("chrony_get_field_timespec"),
        get_field_string: sym!("chrony_get_field_string"),
    };
    Ok(symbols)
}
