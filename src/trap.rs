use std::rc::Rc;

use crate::backend::{ActiveBackend, Backend};
use crate::cleanup::imbalance;
use crate::reason::Reason;
use crate::state;

/// Maximum number of simultaneously active trap levels per thread.
///
/// Exceeding it is a fatal bookkeeping error, reported as a plain panic so
/// that no guarded region can swallow it.
pub const MAX_TRAP_DEPTH: usize = 20;

/// Run `body` inside a new trap level.
///
/// If `body` completes, its value is returned in `Ok`. If it (or anything it
/// calls) [`leave`](crate::leave)s, control comes back here with the leave's
/// reason in `Err`, and every cleanup entry pushed since this call has been
/// disposed, most recently pushed first. Entries belonging to enclosing
/// levels are untouched, and a leave inside a nested `trap` resumes at that
/// nested call, not here.
///
/// Rust panics are not leaves: they propagate through untouched, releasing
/// this level's pending entries on the way out.
///
/// # Panics
///
/// Exiting normally with undisposed entries pushed inside this level is a
/// fatal imbalance, as is nesting more than [`MAX_TRAP_DEPTH`] levels.
pub fn trap<R>(body: impl FnOnce() -> R) -> Result<R, Reason> {
    let frame = TrapFrame::enter();
    let result = ActiveBackend::catch_leave(body);
    if result.is_ok() {
        let depth = state::with(|s| s.cleanup.depth());
        if depth != frame.mark {
            // The frame guard disposes the leftovers while this unwinds.
            imbalance("trap level exited normally with pending cleanup entries");
        }
    }
    drop(frame);
    result
}

/// Number of active trap levels on the calling thread.
#[must_use]
pub fn trap_depth() -> usize {
    state::with(|s| s.marks.len())
}

/// Tear down the calling thread's trap usage.
///
/// Disposes any obligations still on the cleanup stack, most recently
/// pushed first, and releases the per-thread state. A no-op if the thread
/// never used the engine.
///
/// # Panics
///
/// Panics if called inside an active trap level.
pub fn teardown_thread() {
    let Some(handle) = state::detach() else { return };
    let cell = Rc::try_unwrap(handle)
        .ok()
        .expect("trap state still borrowed during teardown");
    let mut state = cell.into_inner();
    assert!(state.marks.is_empty(), "thread torn down inside an active trap level");
    while let Some(entry) = state.cleanup.pop_entry() {
        entry.dispose();
    }
    tracing::trace!("trap state torn down");
}

/// One active trap level. The mark records where the cleanup stack stood on
/// entry; dropping the frame pops the mark again on every exit path, and on
/// an unwinding path it first disposes whatever is still pending above the
/// mark (a leave has already unwound its own entries; a foreign panic has
/// not).
struct TrapFrame {
    mark: usize,
}

impl TrapFrame {
    fn enter() -> Self {
        let mark = state::with(|s| {
            if s.marks.len() >= MAX_TRAP_DEPTH {
                return None;
            }
            let mark = s.cleanup.depth();
            s.marks.push(mark);
            Some(mark)
        });
        let Some(mark) = mark else {
            panic!("trap nesting exceeded the maximum depth ({MAX_TRAP_DEPTH})");
        };
        tracing::trace!(mark, "entered trap level");
        Self { mark }
    }
}

impl Drop for TrapFrame {
    fn drop(&mut self) {
        loop {
            let entry = state::with(|s| {
                if s.cleanup.depth() > self.mark {
                    s.cleanup.pop_entry()
                } else {
                    None
                }
            });
            match entry {
                Some(entry) => entry.dispose(),
                None => break,
            }
        }
        state::with(|s| {
            s.marks.pop();
        });
        tracing::trace!(mark = self.mark, "exited trap level");
    }
}

#[cfg(test)]
#[cfg(backend = "unwind")]
mod test {
    use super::*;
    use crate::cleanup::{cleanup_depth, defer, pop, pop_and_dispose_many, push};
    use crate::leave::leave;
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    struct DropFlag(Rc<Cell<bool>>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn normal_completion_returns_ok() {
        assert_eq!(trap(|| 7u32), Ok(7));
        assert_eq!(trap_depth(), 0);
    }

    #[test]
    fn leave_returns_the_reason() {
        let result = trap(|| {
            leave(Reason::from_raw(42));
        });
        assert_eq!(result, Err(Reason::from_raw(42)));
        assert_eq!(trap_depth(), 0);
    }

    #[test]
    fn leave_disposes_in_reverse_push_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let result = trap(|| {
            for i in 0..3 {
                let log = Rc::clone(&log);
                defer(move || log.borrow_mut().push(i));
            }
            leave(Reason::GENERAL);
        });
        assert_eq!(result, Err(Reason::GENERAL));
        assert_eq!(*log.borrow(), [2, 1, 0]);
        assert_eq!(cleanup_depth(), 0);
    }

    #[test]
    fn nested_leave_resumes_at_the_inner_guard() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer = trap(|| {
            let a = Rc::clone(&log);
            defer(move || a.borrow_mut().push('A'));
            let b = Rc::clone(&log);
            defer(move || b.borrow_mut().push('B'));

            let inner = trap(|| {
                let c = Rc::clone(&log);
                defer(move || c.borrow_mut().push('C'));
                leave(Reason::from_raw(42));
            });

            // Control is back here, not at the outer guard; only the inner
            // level's entry is gone.
            assert_eq!(inner, Err(Reason::from_raw(42)));
            assert_eq!(*log.borrow(), ['C']);
            assert_eq!(cleanup_depth(), 2);

            pop_and_dispose_many(2);
            0u8
        });
        assert_eq!(outer, Ok(0));
        assert_eq!(*log.borrow(), ['C', 'B', 'A']);
    }

    #[test]
    fn popped_entries_are_not_disposed_by_a_later_leave() {
        let ran = Rc::new(Cell::new(false));
        let result = trap(|| {
            let ran = Rc::clone(&ran);
            defer(move || ran.set(true));
            let entry = pop();
            drop(entry);
            leave(Reason::GENERAL);
        });
        assert_eq!(result, Err(Reason::GENERAL));
        assert!(!ran.get(), "the obligation was transferred away by pop");
    }

    #[test]
    fn foreign_panics_pass_through_and_release_obligations() {
        let flag = Rc::new(Cell::new(false));
        let result = catch_unwind(AssertUnwindSafe(|| {
            trap(|| {
                let flag = DropFlag(Rc::clone(&flag));
                push(flag);
                panic!("boom");
            })
        }));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&'static str>(), Some(&"boom"));
        assert!(flag.get(), "pending entries are released during the unwind");
        assert_eq!(trap_depth(), 0);
    }

    #[test]
    fn unbalanced_normal_exit_is_fatal() {
        let flag = Rc::new(Cell::new(false));
        let result = catch_unwind(AssertUnwindSafe(|| {
            trap(|| {
                push(DropFlag(Rc::clone(&flag)));
                7u8
            })
        }));
        let payload = result.unwrap_err();
        let message = payload.downcast_ref::<String>().unwrap();
        assert!(message.contains("imbalance"));
        assert!(flag.get(), "the frame guard released the leftover entry");
        assert_eq!(trap_depth(), 0);
    }

    #[test]
    fn nesting_past_the_limit_is_fatal_and_not_leavable() {
        fn nest() {
            let guarded = trap(nest);
            assert!(guarded.is_ok(), "depth overflow must not arrive as a leave");
        }
        let result = catch_unwind(nest);
        let payload = result.unwrap_err();
        let message = payload.downcast_ref::<String>().unwrap();
        assert!(message.contains("nesting"));
        assert_eq!(trap_depth(), 0);
    }

    #[test]
    fn teardown_disposes_remaining_obligations() {
        std::thread::spawn(|| {
            let log = Rc::new(RefCell::new(Vec::new()));
            for i in 0..2 {
                let log = Rc::clone(&log);
                defer(move || log.borrow_mut().push(i));
            }
            teardown_thread();
            assert_eq!(*log.borrow(), [1, 0]);
            // A second teardown finds no state and is a no-op.
            teardown_thread();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn end_to_end_scenario() {
        // push A, push B, enter nested trap, push C, leave(42): the nested
        // guard returns 42, C is disposed, A and B stay available.
        std::thread::spawn(|| {
            let disposed = Rc::new(RefCell::new(Vec::new()));
            let outer = trap(|| {
                for name in ["A", "B"] {
                    let disposed = Rc::clone(&disposed);
                    defer(move || disposed.borrow_mut().push(name));
                }
                let inner = trap(|| {
                    let disposed = Rc::clone(&disposed);
                    defer(move || disposed.borrow_mut().push("C"));
                    leave(Reason::from_raw(42));
                });
                assert_eq!(inner, Err(Reason::from_raw(42)));
                assert_eq!(*disposed.borrow(), ["C"]);

                // A and B are still live obligations of the outer scope.
                assert_eq!(cleanup_depth(), 2);
                pop_and_dispose_many(2);
            });
            assert_eq!(outer, Ok(()));
            assert_eq!(*disposed.borrow(), ["C", "B", "A"]);
        })
        .join()
        .unwrap();
    }
}
