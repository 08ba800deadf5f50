//! Fixed-identifier registries for per-thread and process-wide facilities.
//!
//! Both registries map the closed [`FacilityId`] set to trait-object values.
//! The [`thread`] registry scopes its slots to the calling thread and is how
//! the trap engine locates its own per-thread state; the [`global`] registry
//! is process-wide, with one lock per slot and a guard-based
//! test-and-set protocol for safe lazy singleton initialization.

use thiserror::Error;

use crate::reason::Reason;

pub mod global;
pub mod thread;

pub use global::SlotGuard;

/// Identifier of a well-known facility, one per slot in each registry.
///
/// The set is closed: raw codes outside it are rejected by
/// [`FacilityId::from_raw`] rather than mapped to spare slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FacilityId {
    /// The per-thread trap engine state. Used by this crate itself.
    TrapState = 0,
    /// The process allocator facade.
    Allocator = 1,
    /// The task scheduler.
    Scheduler = 2,
    /// The inter-component message queue.
    MessageQueue = 3,
    /// The telemetry sink.
    Telemetry = 4,
}

impl FacilityId {
    /// Number of slots in each registry.
    pub const COUNT: usize = 5;

    const ALL: [Self; Self::COUNT] = [
        Self::TrapState,
        Self::Allocator,
        Self::Scheduler,
        Self::MessageQueue,
        Self::Telemetry,
    ];

    /// The slot index of this identifier.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Look up an identifier by raw code.
    #[inline]
    pub fn from_raw(raw: u8) -> Result<Self, RegistryError> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(RegistryError::BadIdentifier(raw))
    }
}

/// Failure of a direct registry operation.
///
/// Code that prefers "leave on failure" semantics over manual checking can
/// route these through [`OrLeave`](crate::OrLeave) or the registries'
/// `get_or_leave` wrappers; the conversion to [`Reason`] below defines the
/// delivered codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The raw identifier is outside the closed facility set.
    #[error("facility identifier {0} is outside the known range")]
    BadIdentifier(u8),
    /// The slot already holds a value.
    #[error("a value is already registered for {0:?}")]
    AlreadyInstalled(FacilityId),
    /// The slot holds no value yet.
    #[error("no value registered for {0:?}")]
    NotReady(FacilityId),
}

impl From<RegistryError> for Reason {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::BadIdentifier(_) => Reason::NOT_SUPPORTED,
            RegistryError::AlreadyInstalled(_) => Reason::ALREADY_INSTALLED,
            RegistryError::NotReady(_) => Reason::NOT_READY,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_codes_roundtrip() {
        for id in FacilityId::ALL {
            assert_eq!(FacilityId::from_raw(id.raw()), Ok(id));
        }
        assert_eq!(
            FacilityId::from_raw(FacilityId::COUNT as u8),
            Err(RegistryError::BadIdentifier(FacilityId::COUNT as u8)),
        );
    }

    #[test]
    fn errors_map_to_reasons() {
        assert_eq!(
            Reason::from(RegistryError::AlreadyInstalled(FacilityId::Scheduler)),
            Reason::ALREADY_INSTALLED,
        );
        assert_eq!(
            Reason::from(RegistryError::NotReady(FacilityId::Telemetry)),
            Reason::NOT_READY,
        );
        assert_eq!(Reason::from(RegistryError::BadIdentifier(200)), Reason::NOT_SUPPORTED);
    }
}
