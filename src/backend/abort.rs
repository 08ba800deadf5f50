use super::Backend;
use crate::reason::Reason;

/// The degraded strategy for targets without a recoverable transfer: a leave
/// terminates the process, and the guard is a plain pass-through.
pub(crate) struct ActiveBackend;

impl Backend for ActiveBackend {
    fn leave(reason: Reason) -> ! {
        tracing::error!(code = reason.raw(), "leave on a non-recoverable target");
        eprintln!("leavetrap: leave({reason}) on a target without a recoverable transfer; aborting.");
        std::process::abort();
    }

    fn catch_leave<R>(body: impl FnOnce() -> R) -> Result<R, Reason> {
        Ok(body())
    }
}
