use crate::reason::Reason;

/// A control-transfer backend.
///
/// A *leave* forcefully "returns" through multiple call frames up to the
/// nearest enclosing guard, carrying a numeric reason code. This roughly
/// corresponds to the `resume_unwind`/`catch_unwind` pair on Rust and the
/// `longjmp`/`setjmp` pair on targets without native unwinding.
///
/// Backends only transfer control and deliver the reason; disposing pending
/// cleanup obligations is the engine's job and happens before `leave` is
/// invoked. Every backend must satisfy the same contract:
///
/// - `leave` transfers control to the closest (most nested) `catch_leave`
///   frame, which returns the exact reason passed, or terminates the process
///   when the strategy has no recoverable transfer.
/// - During the transfer, destructors of intermediate locals run as if the
///   frames returned normally.
/// - Unwinding not originated by `leave` (a Rust panic) is never swallowed.
pub(crate) trait Backend {
    /// Transfer control to the nearest enclosing `catch_leave`, or terminate
    /// the process if the strategy cannot transfer.
    fn leave(reason: Reason) -> !;

    /// Run `body`, converting a leave raised within it into `Err(reason)`.
    fn catch_leave<R>(body: impl FnOnce() -> R) -> Result<R, Reason>;
}

#[cfg(backend = "unwind")]
#[path = "unwind.rs"]
mod imp;

#[cfg(backend = "abort")]
#[path = "abort.rs"]
mod imp;

#[cfg(backend = "unimplemented")]
#[path = "unimplemented.rs"]
mod imp;

pub(crate) use imp::ActiveBackend;
