//! The process-wide singleton registry.
//!
//! One mutex guards each slot, so registrations for distinct facilities
//! never contend. Lazy singleton initialization uses the
//! [`lock_and_get`]/[`SlotGuard::register_and_unlock`] pair: the first call
//! returns the current value and *keeps the slot locked* through the
//! returned guard, so a second thread cannot observe a partially initialized
//! slot. Dropping the guard without registering simply releases the lock.
//!
//! A poisoned slot lock is recovered by taking the inner value: every
//! operation here leaves the slot in a valid state even if the owning thread
//! panicked mid-call.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use super::{FacilityId, RegistryError};
use crate::leave::OrLeave;

/// A registered singleton. Values are shared across threads, so they must be
/// `Send + Sync`.
pub type SharedFacility = Arc<dyn Any + Send + Sync>;

type Slot = Option<SharedFacility>;

/// A process-wide facility table.
///
/// The free functions in this module operate on one default instance;
/// embedders that need an isolated table (tests, nested runtimes) can carry
/// their own.
pub struct GlobalRegistry {
    slots: [Mutex<Slot>; FacilityId::COUNT],
}

/// The default table, created under `Lazy`'s one-time lock on first access.
static DEFAULT: Lazy<GlobalRegistry> = Lazy::new(GlobalRegistry::new);

impl GlobalRegistry {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Mutex::new(None)),
        }
    }

    fn lock_slot(&self, id: FacilityId) -> MutexGuard<'_, Slot> {
        self.slots[usize::from(id.raw())]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the value registered for `id`.
    pub fn get(&self, id: FacilityId) -> Result<SharedFacility, RegistryError> {
        self.lock_slot(id)
            .as_ref()
            .map(Arc::clone)
            .ok_or(RegistryError::NotReady(id))
    }

    /// Register `value` for `id`.
    ///
    /// Fails with [`RegistryError::AlreadyInstalled`] if the slot is
    /// occupied. For check-then-register without a race, use
    /// [`GlobalRegistry::lock_and_get`].
    pub fn register(&self, value: SharedFacility, id: FacilityId) -> Result<(), RegistryError> {
        let mut slot = self.lock_slot(id);
        if slot.is_some() {
            return Err(RegistryError::AlreadyInstalled(id));
        }
        *slot = Some(value);
        tracing::debug!(id = id.raw(), "registered global facility");
        Ok(())
    }

    /// Return the current value for `id` and keep the slot locked.
    ///
    /// The lock is held by the returned [`SlotGuard`] until it is consumed
    /// by [`SlotGuard::register_and_unlock`] or dropped. Other threads block
    /// on this slot in the meantime, so do not hold the guard across calls
    /// back into client code.
    pub fn lock_and_get(&self, id: FacilityId) -> (Option<SharedFacility>, SlotGuard<'_>) {
        let slot = self.lock_slot(id);
        let current = slot.as_ref().map(Arc::clone);
        (current, SlotGuard { id, slot })
    }

    /// Get the value for `id`, registering the result of `init` first if the
    /// slot is empty. `init` runs at most once per empty slot, under the
    /// slot lock.
    pub fn get_or_register_with(
        &self,
        id: FacilityId,
        init: impl FnOnce() -> SharedFacility,
    ) -> SharedFacility {
        let (current, guard) = self.lock_and_get(id);
        match current {
            Some(value) => value,
            None => {
                let value = init();
                guard.register_and_unlock(Arc::clone(&value));
                value
            }
        }
    }
}

impl Default for GlobalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds one slot of a [`GlobalRegistry`] locked.
///
/// Returned by [`lock_and_get`]; consume it with
/// [`SlotGuard::register_and_unlock`] to publish a value atomically with the
/// preceding read, or drop it to release the slot unchanged.
#[must_use = "the slot stays locked until the guard is consumed or dropped"]
pub struct SlotGuard<'a> {
    id: FacilityId,
    slot: MutexGuard<'a, Slot>,
}

impl SlotGuard<'_> {
    /// The value currently in the locked slot.
    #[must_use]
    pub fn current(&self) -> Option<&SharedFacility> {
        self.slot.as_ref()
    }

    /// Publish `value` and release the slot.
    ///
    /// Replaces whatever the slot held; callers doing test-and-set read the
    /// current value from [`lock_and_get`] first and only register when it
    /// was empty.
    pub fn register_and_unlock(mut self, value: SharedFacility) {
        *self.slot = Some(value);
        tracing::debug!(id = self.id.raw(), "registered global facility");
    }
}

/// [`GlobalRegistry::get`] on the default table.
pub fn get(id: FacilityId) -> Result<SharedFacility, RegistryError> {
    DEFAULT.get(id)
}

/// [`GlobalRegistry::register`] on the default table.
pub fn register(value: SharedFacility, id: FacilityId) -> Result<(), RegistryError> {
    DEFAULT.register(value, id)
}

/// [`GlobalRegistry::lock_and_get`] on the default table.
pub fn lock_and_get(id: FacilityId) -> (Option<SharedFacility>, SlotGuard<'static>) {
    DEFAULT.lock_and_get(id)
}

/// [`GlobalRegistry::get_or_register_with`] on the default table.
pub fn get_or_register_with(
    id: FacilityId,
    init: impl FnOnce() -> SharedFacility,
) -> SharedFacility {
    DEFAULT.get_or_register_with(id, init)
}

/// [`get`], leaving with [`Reason::NOT_READY`](crate::Reason::NOT_READY)
/// instead of returning an error.
pub fn get_or_leave(id: FacilityId) -> SharedFacility {
    get(id).or_leave()
}
