use core::fmt;

/// Numeric reason code carried by a leave.
///
/// `0` means success and is never delivered to a trap guard. Negative codes
/// from the well-known set below describe failures of the portability layer
/// itself; every other non-zero value is caller-defined and passes through
/// the engine untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Reason(i32);

impl Reason {
    /// Success. Comparing against this is equivalent to [`Reason::is_success`].
    pub const NONE: Self = Self(0);
    /// Unspecified failure.
    pub const GENERAL: Self = Self(-1);
    /// An underlying system call failed.
    pub const SYSTEM_CALL_FAILED: Self = Self(-3);
    /// An allocation returned null.
    pub const OUT_OF_MEMORY: Self = Self(-4);
    /// The operation is not supported on this target or configuration.
    pub const NOT_SUPPORTED: Self = Self(-5);
    /// A facility slot was already occupied.
    pub const ALREADY_INSTALLED: Self = Self(-11);
    /// A facility slot has no value yet.
    pub const NOT_READY: Self = Self(-18);

    /// Wrap a raw code. Caller-defined codes are any non-zero value outside
    /// the well-known set.
    #[inline]
    #[must_use]
    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    /// The raw numeric code.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether this code means "no error".
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    const fn well_known_name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("none"),
            -1 => Some("general"),
            -3 => Some("system call failed"),
            -4 => Some("out of memory"),
            -5 => Some("not supported"),
            -11 => Some("already installed"),
            -18 => Some("not ready"),
            _ => None,
        }
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.well_known_name() {
            Some(name) => write!(f, "Reason({name})"),
            None => write!(f, "Reason({})", self.0),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.well_known_name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for Reason {
    #[inline]
    fn from(code: i32) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(Reason::from_raw(42).raw(), 42);
        assert_eq!(Reason::from_raw(-4), Reason::OUT_OF_MEMORY);
    }

    #[test]
    fn success_is_zero_only() {
        assert!(Reason::NONE.is_success());
        assert!(!Reason::GENERAL.is_success());
        assert!(!Reason::from_raw(7).is_success());
    }

    #[test]
    fn display_names_well_known_codes() {
        assert_eq!(Reason::OUT_OF_MEMORY.to_string(), "out of memory (-4)");
        assert_eq!(Reason::from_raw(42).to_string(), "42");
        assert_eq!(format!("{:?}", Reason::NOT_READY), "Reason(not ready)");
    }
}
