//! Address identity for reference-counted objects.
//!
//! Registries key their entries by the allocation address of the observed
//! `Rc`. An address cannot be reused while any `Rc` or `Weak` to the same
//! allocation exists, so an entry that keeps either kind of reference has a
//! stable, collision-free key for as long as the entry lives.

use std::fmt;
use std::rc::{Rc, Weak};

/// Identity of a reference-counted object (its allocation address).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of the object behind `rc`.
    #[must_use]
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc).cast::<()>() as usize)
    }

    /// Identity of the object behind `weak`, whether or not it is still alive.
    #[must_use]
    pub fn of_weak<T: ?Sized>(weak: &Weak<T>) -> Self {
        Self(Weak::as_ptr(weak).cast::<()>() as usize)
    }

    /// Identity of a borrowed object. Matches [`ObjectId::of`] when `value`
    /// is the contents of an `Rc`.
    #[must_use]
    pub fn of_ref<T: ?Sized>(value: &T) -> Self {
        Self(std::ptr::from_ref(value).cast::<()>() as usize)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}
