//! Ownership policy: whether a controller keeps its targets alive.
//!
//! # Retaining
//!
//! The controller holds an `Rc` to every target it observes, so no
//! observation can ever refer to a dropped target. An object that observes
//! itself, or two objects that observe each other, through retaining
//! controllers form a reference cycle and are never dropped until the
//! observation is removed explicitly.
//!
//! # Non-retaining
//!
//! The controller holds a `Weak` to each target. Callers are expected to
//! remove the observation before the target is dropped. Dropping a target
//! early is memory safe: its notifications simply stop and the stale entry
//! is pruned (with a warning when dead-target detection is enabled).

use std::fmt;
use std::rc::{Rc, Weak};

use crate::observed::Observed;

/// Ownership mode of a controller, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Retention {
    /// The controller keeps observed targets alive.
    #[default]
    Retaining,
    /// The controller does not extend the lifetime of observed targets.
    NonRetaining,
}

impl Retention {
    /// Both modes, in slot order.
    pub const ALL: [Retention; 2] = [Retention::Retaining, Retention::NonRetaining];

    #[must_use]
    pub fn retains_targets(self) -> bool {
        matches!(self, Self::Retaining)
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retaining => "retaining",
            Self::NonRetaining => "non-retaining",
        })
    }
}

/// A controller's reference to an observed target, shaped by [`Retention`].
pub(crate) enum TargetRef {
    Strong(Rc<dyn Observed>),
    Weak(Weak<dyn Observed>),
}

impl TargetRef {
    pub(crate) fn new(retention: Retention, target: &Rc<dyn Observed>) -> Self {
        match retention {
            Retention::Retaining => Self::Strong(Rc::clone(target)),
            Retention::NonRetaining => Self::Weak(Rc::downgrade(target)),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<Rc<dyn Observed>> {
        match self {
            Self::Strong(rc) => Some(Rc::clone(rc)),
            Self::Weak(weak) => weak.upgrade(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            Self::Strong(_) => true,
            Self::Weak(weak) => weak.strong_count() > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::KvoObject;
    use kvo_core::ObjectId;

    #[test]
    fn default_is_retaining() {
        assert_eq!(Retention::default(), Retention::Retaining);
        assert!(Retention::Retaining.retains_targets());
        assert!(!Retention::NonRetaining.retains_targets());
    }

    #[test]
    fn strong_ref_keeps_target_alive() {
        let target: Rc<dyn Observed> = Rc::new(KvoObject::<crate::KvoController>::new());
        let id = ObjectId::of(&target);
        let weak = Rc::downgrade(&target);
        let r = TargetRef::new(Retention::Retaining, &target);
        drop(target);
        assert!(r.is_alive());
        assert!(weak.upgrade().is_some());
        let held = r.upgrade().unwrap_or_else(|| panic!("strong ref lost its target"));
        assert_eq!(ObjectId::of(&held), id);
    }

    #[test]
    fn weak_ref_does_not_keep_target_alive() {
        let target: Rc<dyn Observed> = Rc::new(KvoObject::<crate::KvoController>::new());
        let id = ObjectId::of(&target);
        let r = TargetRef::new(Retention::NonRetaining, &target);
        let TargetRef::Weak(weak) = &r else {
            panic!("non-retaining ref must be weak");
        };
        assert_eq!(ObjectId::of_weak(weak), id);
        assert!(r.upgrade().is_some());
        drop(target);
        assert!(!r.is_alive());
        assert!(r.upgrade().is_none());
    }

    #[test]
    fn display() {
        assert_eq!(Retention::Retaining.to_string(), "retaining");
        assert_eq!(Retention::NonRetaining.to_string(), "non-retaining");
    }
}
