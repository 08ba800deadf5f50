use crate::backend::{ActiveBackend, Backend};
use crate::reason::Reason;
use crate::state;

/// Leave: transfer control to the nearest enclosing trap level, carrying
/// `reason`.
///
/// Before control moves, every cleanup entry pushed since that level's
/// watermark is disposed, most recently pushed first. The enclosing
/// [`trap`](crate::trap) call then returns `Err(reason)`.
///
/// A leave with no active trap level aborts the process: returning from a
/// failed operation would violate the caller's expectation that control
/// never falls through it.
///
/// # Example
///
/// ```rust
/// use leavetrap::{leave, trap, Reason};
///
/// let result = trap(|| {
///     leave(Reason::NOT_READY);
/// });
/// assert_eq!(result, Err(Reason::NOT_READY));
/// ```
pub fn leave(reason: Reason) -> ! {
    if state::with(|s| s.marks.is_empty()) {
        tracing::error!(code = reason.raw(), "leave with no active trap level");
        eprintln!("leavetrap: leave({reason}) with no active trap level; aborting.");
        std::process::abort();
    }
    // Dispose this level's pending obligations before transferring control.
    // Each entry is popped before its disposer runs, so a disposer that
    // itself leaves supersedes the reason without disposing anything twice.
    loop {
        match state::with(state::TrapState::pop_tracked) {
            Some(entry) => entry.dispose(),
            None => break,
        }
    }
    tracing::trace!(code = reason.raw(), "leave");
    ActiveBackend::leave(reason)
}

/// Leave with [`Reason::OUT_OF_MEMORY`] if `ptr` is null; otherwise a no-op.
#[inline]
pub fn leave_if_null<T>(ptr: *const T) {
    if ptr.is_null() {
        leave(Reason::OUT_OF_MEMORY);
    }
}

/// Leave with `code` if it is a non-success code; otherwise a no-op.
#[inline]
pub fn leave_if_error(code: i32) {
    if code != 0 {
        leave(Reason::from_raw(code));
    }
}

/// "Value or leave" semantics for fallible results, the leave-on-failure
/// counterpart of manual error checking.
pub trait OrLeave {
    /// The success value.
    type Output;

    /// Extract the success value, leaving with the error's reason code
    /// otherwise.
    fn or_leave(self) -> Self::Output;
}

impl<T, E: Into<Reason>> OrLeave for Result<T, E> {
    type Output = T;

    #[inline]
    fn or_leave(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => leave(err.into()),
        }
    }
}

#[cfg(test)]
#[cfg(backend = "unwind")]
mod test {
    use super::*;
    use crate::registry::{FacilityId, RegistryError};
    use crate::trap;

    #[test]
    fn leave_if_helpers_are_noops_on_success() {
        let x = 5i32;
        let result = trap(|| {
            leave_if_null(&raw const x);
            leave_if_error(0);
            true
        });
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn null_pointer_leaves_out_of_memory() {
        let result = trap(|| leave_if_null(std::ptr::null::<u8>()));
        assert_eq!(result, Err(Reason::OUT_OF_MEMORY));
    }

    #[test]
    fn error_code_leaves_as_is() {
        let result = trap(|| leave_if_error(-7));
        assert_eq!(result, Err(Reason::from_raw(-7)));
    }

    #[test]
    fn or_leave_extracts_or_leaves() {
        let ok: Result<u32, RegistryError> = Ok(5);
        assert_eq!(trap(|| ok.or_leave()), Ok(5));

        let err: Result<u32, RegistryError> =
            Err(RegistryError::NotReady(FacilityId::Scheduler));
        assert_eq!(trap(|| err.or_leave()), Err(Reason::NOT_READY));
    }
}
