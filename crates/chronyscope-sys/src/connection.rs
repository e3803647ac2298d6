//! One libchrony session on one socket.

use std::ffi::{CStr, CString, c_int};
use std::sync::Arc;

use chronyscope_core::{ChronyConnection, FieldIndex, NativeStatus, Timespec, TypeTag};

use crate::ffi::{self, ChronySession};
use crate::library::Handle;

/// Status reported for a report name containing an interior NUL, or a record
/// index outside `c_int`. Mirrors `CHRONY_INVALID_ARGUMENT`.
const INVALID_ARGUMENT: i32 = 7;

/// A live session. Torn down once, by [`ChronyConnection::close`] or on drop.
#[derive(Debug)]
pub struct Connection {
    handle: Arc<Handle>,
    session: *mut ChronySession,
    fd: c_int,
    open: bool,
}

// SAFETY: the session pointer is owned exclusively by this value and only
// used through `&mut self` or `&self` on one thread at a time.
unsafe impl Send for Connection {}

impl Connection {
    pub(crate) const fn new(handle: Arc<Handle>, session: *mut ChronySession, fd: c_int) -> Self {
        Self {
            handle,
            session,
            fd,
            open: true,
        }
    }

    /// Socket descriptor of this session.
    #[must_use]
    pub const fn fd(&self) -> c_int {
        self.fd
    }

    const fn field(index: FieldIndex) -> c_int {
        index.0
    }

    /// The session pointer, refused once closed.
    const fn live(&self) -> Result<*mut ChronySession, NativeStatus> {
        if self.open {
            Ok(self.session)
        } else {
            Err(NativeStatus(INVALID_ARGUMENT))
        }
    }
}

fn report_name(report: &str) -> Result<CString, NativeStatus> {
    CString::new(report).map_err(|_| NativeStatus(INVALID_ARGUMENT))
}

const fn status(raw: c_int) -> Result<(), NativeStatus> {
    if raw == 0 {
        Ok(())
    } else {
        Err(NativeStatus(raw))
    }
}

impl ChronyConnection for Connection {
    fn request_record_count(&mut self, report: &str) -> Result<(), NativeStatus> {
        let session = self.live()?;
        let report = report_name(report)?;
        // SAFETY: session is live; report is NUL-terminated.
        status(unsafe { (self.handle.symbols.request_record_count)(session, report.as_ptr()) })
    }

    fn record_count(&self) -> i64 {
        let Ok(session) = self.live() else {
            return 0;
        };
        // SAFETY: session is live.
        i64::from(unsafe { (self.handle.symbols.get_record_count)(session) })
    }

    fn request_record(&mut self, report: &str, index: u32) -> Result<(), NativeStatus> {
        let session = self.live()?;
        let report = report_name(report)?;
        let index = c_int::try_from(index).map_err(|_| NativeStatus(INVALID_ARGUMENT))?;
        // SAFETY: session is live; report is NUL-terminated.
        status(unsafe { (self.handle.symbols.request_record)(session, report.as_ptr(), index) })
    }

    fn needs_response(&self) -> bool {
        let Ok(session) = self.live() else {
            return false;
        };
        // SAFETY: session is live.
        unsafe { (self.handle.symbols.needs_response)(session) != 0 }
    }

    fn process_response(&mut self) -> Result<(), NativeStatus> {
        let session = self.live()?;
        // SAFETY: session is live.
        status(unsafe { (self.handle.symbols.process_response)(session) })
    }

    fn field_index(&self, name: &str) -> Option<FieldIndex> {
        let session = self.live().ok()?;
        let name = CString::new(name).ok()?;
        // SAFETY: session is live; name is NUL-terminated.
        let index = unsafe { (self.handle.symbols.get_field_index)(session, name.as_ptr()) };
        (index >= 0).then_some(FieldIndex(index))
    }

    fn field_type(&self, index: FieldIndex) -> TypeTag {
        let Ok(session) = self.live() else {
            return TypeTag::Unknown(ffi::CHRONY_TYPE_NONE);
        };
        // SAFETY: session is live.
        ffi::type_tag(unsafe { (self.handle.symbols.get_field_type)(session, Self::field(index)) })
    }

    fn integer(&self, index: FieldIndex) -> i64 {
        let Ok(session) = self.live() else {
            return 0;
        };
        // SAFETY: session is live.
        unsafe { (self.handle.symbols.get_field_integer)(session, Self::field(index)) }
    }

    fn uinteger(&self, index: FieldIndex) -> u64 {
        let Ok(session) = self.live() else {
            return 0;
        };
        // SAFETY: session is live.
        unsafe { (self.handle.symbols.get_field_uinteger)(session, Self::field(index)) }
    }

    fn float(&self, index: FieldIndex) -> f64 {
        let Ok(session) = self.live() else {
            return f64::NAN;
        };
        // SAFETY: session is live.
        unsafe { (self.handle.symbols.get_field_float)(session, Self::field(index)) }
    }

    fn timespec(&self, index: FieldIndex) -> Timespec {
        let Ok(session) = self.live() else {
            return Timespec::default();
        };
        // SAFETY: session is live; the struct is returned by value.
        let ts = unsafe { (self.handle.symbols.get_field_timespec)(session, Self::field(index)) };
        #[allow(clippy::useless_conversion)]
        Timespec {
            sec: i64::from(ts.tv_sec),
            nsec: i64::from(ts.tv_nsec),
        }
    }

    fn string(&self, index: FieldIndex) -> Option<String> {
        let session = self.live().ok()?;
        // SAFETY: session is live.
        let ptr = unsafe { (self.handle.symbols.get_field_string)(session, Self::field(index)) };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: non-null pointers from libchrony are NUL-terminated and
        // valid until the next response is processed; copied out immediately.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        // SAFETY: session and fd are live and released exactly once here.
        unsafe {
            (self.handle.symbols.deinit_session)(self.session);
            (self.handle.symbols.close_socket)(self.fd);
        }
        self.session = std::ptr::null_mut();
        tracing::debug!(fd = self.fd, "closed libchrony session");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
