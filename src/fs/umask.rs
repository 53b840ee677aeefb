//! Scoped umask override.
//!
//! Provisioning creates directories with wide-open modes so that every
//! toolkit user can work inside them. The process umask would silently
//! strip those bits, so it is zeroed for the duration of the run and
//! restored when the guard drops, on every exit path.

/// RAII guard holding a process-wide umask override.
///
/// The umask is process-global state; do not hold two guards at once.
#[derive(Debug)]
pub struct UmaskGuard {
    #[cfg(unix)]
    previous: libc::mode_t,
}

impl UmaskGuard {
    /// Set the process umask to `mask`, remembering the previous value.
    #[cfg(unix)]
    pub fn set(mask: u32) -> Self {
        // SAFETY: umask is async-signal-safe and cannot fail.
        let previous = unsafe { libc::umask(mask as libc::mode_t) };
        Self { previous }
    }

    /// No-op outside unix; permissions are advisory there anyway.
    #[cfg(not(unix))]
    pub fn set(_mask: u32) -> Self {
        Self {}
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        // SAFETY: restoring the value returned by the earlier umask call.
        unsafe {
            libc::umask(self.previous);
        }
    }
}
