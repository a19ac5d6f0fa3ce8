//! Lazy attachment point: one controller per host and ownership mode.
//!
//! # Design
//!
//! A host embeds a [`ControllerSlots`] and exposes it through [`KvoHost`].
//! Every host then gets the [`KvoHostExt`] accessors for free. A slot starts
//! *unbound*; the first lookup constructs a controller with the requested
//! [`Retention`] and stores it, and later lookups return handles to that same
//! instance.
//!
//! ```text
//!             get_or_create / set
//!   Unbound ───────────────────────▶ Bound(c)
//!                                      │  set(c')
//!                                      ▼
//!                                    Bound(c')   (c torn down immediately)
//! ```
//!
//! Slots are dropped with the host. A controller whose only owner is its
//! slot is therefore dropped in the same step, and its teardown removes every
//! observation it held.
//!
//! # Invariants
//!
//! 1. At most one controller per (host, retention); repeated lookups return
//!    handles to the same instance.
//! 2. The two slots of a host are independent.
//! 3. A replaced controller is released before `set_controller` returns.
//!
//! Hosts are `Rc`/`RefCell` based and never shared across threads, so the
//! check-construct-store sequence needs no lock. A constructor that touches
//! the same slot re-entrantly loses the race: the instance stored first wins
//! and the late one is discarded.

use std::cell::RefCell;
use std::fmt;

use tracing::{debug, warn};

use crate::retention::Retention;

/// A controller that can be lazily attached to a host.
///
/// `Clone` must produce a handle to the **same** instance.
pub trait AttachableController: Clone + 'static {
    /// Construct a fresh controller with the given ownership mode.
    fn with_retention(retention: Retention) -> Self;

    fn retention(&self) -> Retention;

    /// Whether `self` and `other` are handles to the same instance.
    fn ptr_eq(&self, other: &Self) -> bool;
}

/// Storage for a host's retaining and non-retaining controllers.
pub struct ControllerSlots<C> {
    retaining: RefCell<Option<C>>,
    non_retaining: RefCell<Option<C>>,
}

impl<C> Default for ControllerSlots<C> {
    fn default() -> Self {
        Self {
            retaining: RefCell::new(None),
            non_retaining: RefCell::new(None),
        }
    }
}

impl<C: AttachableController> ControllerSlots<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, retention: Retention) -> &RefCell<Option<C>> {
        match retention {
            Retention::Retaining => &self.retaining,
            Retention::NonRetaining => &self.non_retaining,
        }
    }

    /// The controller for `retention`, constructing and storing it first if
    /// the slot is unbound.
    pub fn get_or_create(&self, retention: Retention) -> C {
        let slot = self.slot(retention);
        if let Some(existing) = slot.borrow().as_ref() {
            return existing.clone();
        }

        let created = C::with_retention(retention);
        let mut guard = slot.borrow_mut();
        if let Some(winner) = guard.as_ref() {
            let winner = winner.clone();
            drop(guard);
            drop(created);
            return winner;
        }
        *guard = Some(created.clone());
        drop(guard);
        debug!(%retention, "controller attached");
        created
    }

    /// The stored controller for `retention`, without creating one.
    #[must_use]
    pub fn get(&self, retention: Retention) -> Option<C> {
        self.slot(retention).borrow().clone()
    }

    /// Whether a controller is stored for `retention`.
    #[must_use]
    pub fn is_bound(&self, retention: Retention) -> bool {
        self.slot(retention).borrow().is_some()
    }

    /// Store `controller` for `retention`, releasing any previous one
    /// before returning. Installing the already-stored instance is a no-op.
    pub fn replace(&self, retention: Retention, controller: C) {
        if controller.retention() != retention {
            warn!(
                slot = %retention,
                controller = %controller.retention(),
                "installing controller into a slot of a different retention"
            );
        }

        let previous = {
            let mut guard = self.slot(retention).borrow_mut();
            if guard.as_ref().is_some_and(|c| c.ptr_eq(&controller)) {
                return;
            }
            guard.replace(controller)
        };
        debug!(%retention, replaced = previous.is_some(), "controller installed");
        // Released outside the borrow so its teardown can touch the host.
        drop(previous);
    }
}

impl<C> fmt::Debug for ControllerSlots<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerSlots")
            .field("retaining", &self.retaining.borrow().is_some())
            .field("non_retaining", &self.non_retaining.borrow().is_some())
            .finish()
    }
}

/// An object that can host controllers.
pub trait KvoHost {
    type Controller: AttachableController;

    fn controller_slots(&self) -> &ControllerSlots<Self::Controller>;
}

/// Return `host`'s controller for `retention`, creating it on first access.
pub fn get_or_create_controller<H>(host: &H, retention: Retention) -> H::Controller
where
    H: KvoHost + ?Sized,
{
    host.controller_slots().get_or_create(retention)
}

/// Replace `host`'s controller for `retention`. The previous controller, if
/// any, is released immediately.
pub fn set_controller<H>(host: &H, retention: Retention, controller: H::Controller)
where
    H: KvoHost + ?Sized,
{
    host.controller_slots().replace(retention, controller);
}

/// `host`'s controller for `retention`, if one has been attached.
pub fn existing_controller<H>(host: &H, retention: Retention) -> Option<H::Controller>
where
    H: KvoHost + ?Sized,
{
    host.controller_slots().get(retention)
}

/// Controller accessors available on every [`KvoHost`].
pub trait KvoHostExt: KvoHost {
    /// Lazily created controller that retains its observed targets.
    ///
    /// Dropped together with this host, removing all of its observations.
    /// Do not use it to observe `self`, or an object that observes `self`
    /// through its own retaining controller: that forms a reference cycle.
    fn kvo_controller(&self) -> Self::Controller {
        get_or_create_controller(self, Retention::Retaining)
    }

    /// Lazily created controller that does not retain its observed targets.
    ///
    /// Use this to observe `self` or an owner. Each observation must be
    /// removed before its target is dropped; a target dropped early stops
    /// delivering and is pruned with a warning.
    fn kvo_controller_non_retaining(&self) -> Self::Controller {
        get_or_create_controller(self, Retention::NonRetaining)
    }

    fn set_kvo_controller(&self, controller: Self::Controller) {
        set_controller(self, Retention::Retaining, controller);
    }

    fn set_kvo_controller_non_retaining(&self, controller: Self::Controller) {
        set_controller(self, Retention::NonRetaining, controller);
    }

    fn controller_for(&self, retention: Retention) -> Self::Controller {
        get_or_create_controller(self, retention)
    }

    fn set_controller_for(&self, retention: Retention, controller: Self::Controller) {
        set_controller(self, retention, controller);
    }
}

impl<H: KvoHost + ?Sized> KvoHostExt for H {}
