//! Session: one live libchrony connection bounded to one operation.
//!
//! A session is opened per public call and always torn down before that call
//! returns. Closing is idempotent and also happens on drop, so early returns
//! through `?` never leak the socket.

use crate::classify::{NativeFailure, Stage, classify};
use crate::error::Result;
use crate::native::{ChronyConnection, ChronyLibrary};

/// A connected session. Exclusively owns its connection handle.
pub struct Session<C: ChronyConnection> {
    conn: Option<C>,
    target: String,
}

impl<C: ChronyConnection> Session<C> {
    /// Connects to `target` and initializes a client session.
    ///
    /// # Errors
    ///
    /// Returns a connection error if nothing listens at `target`, a
    /// permission error if access is denied.
    pub fn open<L>(library: &L, target: &str) -> Result<Self>
    where
        L: ChronyLibrary<Connection = C>,
    {
        let conn = library
            .connect(target)
            .map_err(|failure| classify(Stage::Connect, failure))?;
        tracing::debug!(target, "opened chrony session");
        Ok(Self {
            conn: Some(conn),
            target: target.to_string(),
        })
    }

    /// Opens a session, runs `f` against it and closes it on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Session::open`] or from `f`.
    pub fn scoped<L, T, F>(library: &L, target: &str, f: F) -> Result<T>
    where
        L: ChronyLibrary<Connection = C>,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut session = Self::open(library, target)?;
        let result = f(&mut session);
        session.close();
        result
    }

    /// Socket path this session was opened on.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true until [`Session::close`] runs.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Tears the session down. Calling it again does nothing.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
            tracing::debug!(target = %self.target, "closed chrony session");
        }
    }

    /// The live connection.
    ///
    /// # Errors
    ///
    /// Returns a session-closed data error once the session has been closed.
    pub fn connection(&mut self) -> Result<&mut C> {
        self.conn
            .as_mut()
            .ok_or_else(|| classify(Stage::Request, NativeFailure::SessionClosed))
    }
}

impl<C: ChronyConnection> Drop for Session<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: ChronyConnection> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("open", &self.is_open())
            .finish()
    }
}
