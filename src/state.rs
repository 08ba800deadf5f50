use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::cleanup::{CleanupEntry, CleanupStack};
use crate::registry::{FacilityId, thread};

/// Per-thread engine state: the cleanup stack plus one watermark per active
/// trap level. Exactly one instance exists per thread, created lazily on the
/// first trap, push, or leave and located through the thread registry under
/// [`FacilityId::TrapState`].
pub(crate) struct TrapState {
    pub(crate) cleanup: CleanupStack,
    pub(crate) marks: Vec<usize>,
}

impl TrapState {
    fn new() -> Self {
        Self { cleanup: CleanupStack::new(), marks: Vec::new() }
    }

    /// Cleanup-stack depth below which the current trap level must not
    /// reach. Entries under the floor belong to enclosing levels (or to no
    /// level at all) and are off limits to pops and unwinds.
    pub(crate) fn floor(&self) -> usize {
        self.marks.last().copied().unwrap_or(0)
    }

    /// Pop the top entry if it belongs to the current trap level.
    pub(crate) fn pop_tracked(&mut self) -> Option<CleanupEntry> {
        if self.cleanup.depth() > self.floor() {
            self.cleanup.pop_entry()
        } else {
            None
        }
    }
}

/// Run `f` on the calling thread's trap state, creating the state on first
/// use.
///
/// `f` must not reenter this function; every caller keeps `f` to plain
/// bookkeeping and runs disposal callbacks only after the borrow is
/// released.
pub(crate) fn with<R>(f: impl FnOnce(&mut TrapState) -> R) -> R {
    let handle = handle();
    let result = f(&mut handle.borrow_mut());
    result
}

fn handle() -> Rc<RefCell<TrapState>> {
    if let Ok(value) = thread::get(FacilityId::TrapState) {
        return value
            .downcast::<RefCell<TrapState>>()
            .expect("trap state slot holds a foreign value");
    }
    let fresh = Rc::new(RefCell::new(TrapState::new()));
    thread::register(Rc::clone(&fresh) as Rc<dyn Any>, FacilityId::TrapState)
        .expect("trap state slot raced its own creation");
    fresh
}

/// Detach the calling thread's state for teardown, if any exists.
pub(crate) fn detach() -> Option<Rc<RefCell<TrapState>>> {
    thread::take(FacilityId::TrapState).map(|value| {
        value
            .downcast::<RefCell<TrapState>>()
            .expect("trap state slot holds a foreign value")
    })
}
