//! The per-thread facility registry.
//!
//! Storage is implicitly scoped to the calling thread, so no locking is
//! involved; a value registered here is invisible to every other thread.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::{FacilityId, RegistryError};
use crate::leave::OrLeave;

thread_local! {
    static SLOTS: RefCell<[Option<Rc<dyn Any>>; FacilityId::COUNT]> =
        const { RefCell::new([const { None }; FacilityId::COUNT]) };
}

/// Get the value registered for `id` on the calling thread.
pub fn get(id: FacilityId) -> Result<Rc<dyn Any>, RegistryError> {
    SLOTS.with(|slots| {
        slots.borrow()[usize::from(id.raw())]
            .as_ref()
            .map(Rc::clone)
            .ok_or(RegistryError::NotReady(id))
    })
}

/// Register `value` for `id` on the calling thread.
///
/// Fails with [`RegistryError::AlreadyInstalled`] if the slot is occupied;
/// use [`take`] first to replace a value.
pub fn register(value: Rc<dyn Any>, id: FacilityId) -> Result<(), RegistryError> {
    SLOTS.with(|slots| {
        let slot = &mut slots.borrow_mut()[usize::from(id.raw())];
        if slot.is_some() {
            return Err(RegistryError::AlreadyInstalled(id));
        }
        *slot = Some(value);
        tracing::debug!(id = id.raw(), "registered thread facility");
        Ok(())
    })
}

/// Remove and return the value registered for `id` on the calling thread.
pub fn take(id: FacilityId) -> Option<Rc<dyn Any>> {
    SLOTS.with(|slots| slots.borrow_mut()[usize::from(id.raw())].take())
}

/// Whether `id` has a value on the calling thread.
#[must_use]
pub fn contains(id: FacilityId) -> bool {
    SLOTS.with(|slots| slots.borrow()[usize::from(id.raw())].is_some())
}

/// [`get`], leaving with [`Reason::NOT_READY`](crate::Reason::NOT_READY)
/// instead of returning an error.
pub fn get_or_leave(id: FacilityId) -> Rc<dyn Any> {
    get(id).or_leave()
}
