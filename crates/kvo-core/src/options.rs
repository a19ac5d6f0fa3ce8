//! Observing options.
//!
//! Options decide which values a [`Change`](crate::Change) carries and when
//! notifications are sent in addition to the ordinary post-change one.

use bitflags::bitflags;

bitflags! {
    /// Flags passed when registering an observation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObservingOptions: u8 {
        /// Include the new value in post-change notifications.
        const NEW = 1 << 0;
        /// Include the old value in notifications.
        const OLD = 1 << 1;
        /// Send one notification immediately at registration time.
        const INITIAL = 1 << 2;
        /// Send a separate notification before each change.
        const PRIOR = 1 << 3;
    }
}

impl ObservingOptions {
    /// `NEW | OLD`, the most common combination.
    pub const NEW_AND_OLD: Self = Self::NEW.union(Self::OLD);

    /// Whether the post-change notification should include the new value.
    #[inline]
    #[must_use]
    pub fn wants_new(self) -> bool {
        self.contains(Self::NEW)
    }

    /// Whether notifications should include the old value.
    #[inline]
    #[must_use]
    pub fn wants_old(self) -> bool {
        self.contains(Self::OLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let opts = ObservingOptions::default();
        assert!(opts.is_empty());
        assert!(!opts.wants_new());
        assert!(!opts.wants_old());
    }

    #[test]
    fn new_and_old() {
        let opts = ObservingOptions::NEW_AND_OLD;
        assert!(opts.wants_new());
        assert!(opts.wants_old());
        assert!(!opts.contains(ObservingOptions::INITIAL));
    }
}
