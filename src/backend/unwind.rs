use super::Backend;
use crate::reason::Reason;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

pub(crate) struct ActiveBackend;

/// Panic payload marking a leave in flight.
///
/// Everything else unwinding through [`ActiveBackend::catch_leave`] is a real
/// panic and is rethrown untouched.
struct LeaveSignal(Reason);

impl Backend for ActiveBackend {
    fn leave(reason: Reason) -> ! {
        // resume_unwind skips the panic hook: a leave is ordinary control
        // flow, not a bug report.
        resume_unwind(Box::new(LeaveSignal(reason)));
    }

    fn catch_leave<R>(body: impl FnOnce() -> R) -> Result<R, Reason> {
        catch_unwind(AssertUnwindSafe(body)).map_err(|payload| {
            match payload.downcast::<LeaveSignal>() {
                Ok(signal) => signal.0,
                Err(payload) => resume_unwind(payload),
            }
        })
    }
}
