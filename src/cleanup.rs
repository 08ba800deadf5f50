use core::fmt;
use std::alloc::Layout;
use std::any::Any;

use crate::leave::leave;
use crate::mem;
use crate::reason::Reason;
use crate::state;

// Module invariant: an entry is disposed at most once. Every path that
// disposes (explicit pop_and_dispose, leave-triggered unwind, trap-frame
// release on a foreign panic) removes the entry from the stack first, and a
// removed entry is owned by exactly one holder.

/// A pending resource-release obligation.
///
/// Entries are created by the `push` family and by [`pop`], which hands an
/// entry back to the caller without disposing it. Dropping an entry does
/// *not* count as disposal: an owned object falls back to ordinary Rust
/// ownership and is dropped, while raw and function-disposal entries are
/// simply forgotten (the caller still holds the underlying handle).
pub struct CleanupEntry {
    kind: Kind,
}

enum Kind {
    Owned(Box<dyn Any>),
    Raw { ptr: *mut u8, layout: Layout },
    Func { arg: *mut (), dispose: unsafe fn(*mut ()) },
    Deferred(Box<dyn FnOnce()>),
}

impl CleanupEntry {
    /// An owned object, disposed by running its destructor.
    #[must_use]
    pub fn owned<T: Any>(object: T) -> Self {
        Self { kind: Kind::Owned(Box::new(object)) }
    }

    /// A raw allocation, disposed by releasing its storage through
    /// [`mem::deallocate`] without running any destructor.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`mem::allocate`] with `layout`, and
    /// disposal must be the allocation's one release.
    #[must_use]
    pub unsafe fn raw(ptr: *mut u8, layout: Layout) -> Self {
        Self { kind: Kind::Raw { ptr, layout } }
    }

    /// A caller-supplied disposal function with one pointer argument.
    ///
    /// # Safety
    ///
    /// `dispose(arg)` must be sound to call once at any point before the
    /// owning thread ends.
    #[must_use]
    pub unsafe fn func(arg: *mut (), dispose: unsafe fn(*mut ())) -> Self {
        Self { kind: Kind::Func { arg, dispose } }
    }

    /// A deferred action, disposed by running it.
    #[must_use]
    pub fn deferred(action: impl FnOnce() + 'static) -> Self {
        Self { kind: Kind::Deferred(Box::new(action)) }
    }

    /// Run this entry's disposal strategy.
    pub fn dispose(self) {
        match self.kind {
            Kind::Owned(object) => drop(object),
            // SAFETY: `raw` requires the pointer to come from `mem::allocate`
            // with this layout and to be released exactly once.
            Kind::Raw { ptr, layout } => unsafe { mem::deallocate(ptr, layout) },
            // SAFETY: `func` requires `dispose(arg)` to be sound to call once.
            Kind::Func { arg, dispose } => unsafe { dispose(arg) },
            Kind::Deferred(action) => action(),
        }
    }

    /// Recover the object of an owned entry, or give the entry back.
    pub fn into_owned(self) -> Result<Box<dyn Any>, Self> {
        match self.kind {
            Kind::Owned(object) => Ok(object),
            kind => Err(Self { kind }),
        }
    }
}

impl fmt::Debug for CleanupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            Kind::Owned(_) => "owned",
            Kind::Raw { .. } => "raw",
            Kind::Func { .. } => "func",
            Kind::Deferred(_) => "deferred",
        };
        f.debug_struct("CleanupEntry").field("kind", &kind).finish()
    }
}

/// The per-thread LIFO of pending obligations. Owned by the thread's trap
/// state; all access goes through the free functions below.
pub(crate) struct CleanupStack {
    entries: Vec<CleanupEntry>,
}

impl CleanupStack {
    pub(crate) const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Push an entry, handing it back if the stack's own storage cannot
    /// grow. The caller converts that failure into an out-of-memory leave.
    pub(crate) fn try_push(&mut self, entry: CleanupEntry) -> Result<(), CleanupEntry> {
        if self.entries.try_reserve(1).is_err() {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    pub(crate) fn pop_entry(&mut self) -> Option<CleanupEntry> {
        self.entries.pop()
    }
}

/// Push an owned object; a leave or [`pop_and_dispose`] runs its destructor.
pub fn push<T: Any>(object: T) {
    push_entry(CleanupEntry::owned(object));
}

/// Push a raw allocation; disposal releases its storage through
/// [`mem::deallocate`] without running any destructor.
///
/// # Safety
///
/// See [`CleanupEntry::raw`].
pub unsafe fn push_raw(ptr: *mut u8, layout: Layout) {
    // SAFETY: requirements forwarded to the caller.
    push_entry(unsafe { CleanupEntry::raw(ptr, layout) });
}

/// Push a caller-supplied disposal function with one pointer argument.
///
/// # Safety
///
/// See [`CleanupEntry::func`].
pub unsafe fn push_fn(arg: *mut (), dispose: unsafe fn(*mut ())) {
    // SAFETY: requirements forwarded to the caller.
    push_entry(unsafe { CleanupEntry::func(arg, dispose) });
}

/// Push a deferred action; disposal runs it.
pub fn defer(action: impl FnOnce() + 'static) {
    push_entry(CleanupEntry::deferred(action));
}

fn push_entry(entry: CleanupEntry) {
    let outcome = state::with(|s| s.cleanup.try_push(entry));
    if let Err(entry) = outcome {
        // The stack must never silently lose a pending obligation: release
        // it now, then report the storage failure.
        entry.dispose();
        leave(Reason::OUT_OF_MEMORY);
    }
}

/// Remove the top entry without disposing it, transferring the obligation
/// back to the caller.
///
/// # Panics
///
/// Popping an entry that does not belong to the current trap level (or
/// popping an empty stack) is a fatal imbalance.
pub fn pop() -> CleanupEntry {
    match state::with(state::TrapState::pop_tracked) {
        Some(entry) => entry,
        None => imbalance("pop from an empty trap level"),
    }
}

/// [`pop`] the top `count` entries, most recent first.
pub fn pop_many(count: usize) -> Vec<CleanupEntry> {
    (0..count).map(|_| pop()).collect()
}

/// Remove and dispose the top entry.
///
/// # Panics
///
/// Same imbalance conditions as [`pop`].
pub fn pop_and_dispose() {
    pop().dispose();
}

/// Remove and dispose the top `count` entries, most recent first.
pub fn pop_and_dispose_many(count: usize) {
    for _ in 0..count {
        pop_and_dispose();
    }
}

/// Number of entries on the calling thread's cleanup stack.
#[must_use]
pub fn cleanup_depth() -> usize {
    state::with(|s| s.cleanup.depth())
}

/// A bookkeeping violation. Deliberately a plain panic: imbalances are
/// programming errors and must not be deliverable as a leave.
pub(crate) fn imbalance(what: &str) -> ! {
    panic!("cleanup stack imbalance: {what}");
}
