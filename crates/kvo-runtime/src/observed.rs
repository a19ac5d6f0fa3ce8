//! Per-target observation registry and change delivery.
//!
//! # Design
//!
//! Every observable object owns an [`ObservationInfo`]. Controllers register
//! [`ObservationRecord`]s with it; the registry keeps only `Weak` references,
//! so it never extends the life of a record and never points at a record
//! whose controller is gone. Dead entries are pruned lazily while collecting
//! the recipients of a change.
//!
//! # Delivery
//!
//! [`ObservationInfo::will_change`] and [`ObservationInfo::did_change`]
//! collect the live records for a key first and then invoke handlers with no
//! borrow held, so a handler may freely set values, register observations,
//! or remove them. A record deactivated during a delivery cycle is skipped
//! for the remainder of that cycle.
//!
//! # Invariants
//!
//! 1. Recipients are notified in registration order.
//! 2. A record only receives changes for its own key path.
//! 3. `PRIOR` records receive a pre-change notification before the
//!    post-change one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use kvo_core::{Change, KeyPath, ObservingOptions, Value};
use tracing::trace;

/// Callback invoked with the changed object and the change payload.
pub type Handler = Rc<dyn Fn(&dyn Observed, &Change)>;

/// An object whose properties can be observed.
pub trait Observed: 'static {
    /// The registry of observations on this object.
    fn observation_info(&self) -> &ObservationInfo;

    /// Current value for `key_path` ([`Value::Null`] if unset).
    fn value_for_key(&self, key_path: &KeyPath) -> Value;
}

/// A single registered observation: key path, options, and handler.
///
/// Owned (strongly) by exactly one controller; targets see it only through
/// `Weak` references.
pub struct ObservationRecord {
    key_path: KeyPath,
    options: ObservingOptions,
    handler: Handler,
    active: Cell<bool>,
    trace_delivery: bool,
}

impl ObservationRecord {
    pub(crate) fn new(
        key_path: KeyPath,
        options: ObservingOptions,
        handler: Handler,
        trace_delivery: bool,
    ) -> Rc<Self> {
        Rc::new(Self {
            key_path,
            options,
            handler,
            active: Cell::new(true),
            trace_delivery,
        })
    }

    #[must_use]
    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    #[must_use]
    pub fn options(&self) -> ObservingOptions {
        self.options
    }

    /// False once the owning controller removed this observation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }

    pub(crate) fn deliver(&self, target: &dyn Observed, change: &Change) {
        if !self.is_active() {
            return;
        }
        if self.trace_delivery {
            trace!(
                key_path = %change.key_path,
                prior = change.is_prior,
                initial = change.is_initial,
                "delivering change"
            );
        }
        (self.handler)(target, change);
    }
}

impl fmt::Debug for ObservationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationRecord")
            .field("key_path", &self.key_path)
            .field("options", &self.options)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

/// Registry of observations on one target.
#[derive(Default)]
pub struct ObservationInfo {
    /// Records stored as weak references. Dead entries are pruned on delivery.
    records: RefCell<Vec<Weak<ObservationRecord>>>,
}

impl ObservationInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, record: &Rc<ObservationRecord>) {
        self.records.borrow_mut().push(Rc::downgrade(record));
    }

    /// Remove `record`, returning whether it was registered here.
    pub(crate) fn unregister(&self, record: &Rc<ObservationRecord>) -> bool {
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|w| !std::ptr::eq(w.as_ptr(), Rc::as_ptr(record)));
        records.len() != before
    }

    /// Number of live, active observations.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.records
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|r| r.is_active())
            .count()
    }

    /// Number of stored entries, including dead ones not yet pruned.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether any live observation watches `key_path`.
    #[must_use]
    pub fn is_observed(&self, key_path: &str) -> bool {
        self.records
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .any(|r| r.is_active() && r.key_path.as_str() == key_path)
    }

    /// Notify `PRIOR` observers of `key_path` that its value is about to
    /// change from `old`.
    pub fn will_change(&self, target: &dyn Observed, key_path: &str, old: &Value) {
        for record in self.recipients(key_path) {
            if record.options.contains(ObservingOptions::PRIOR) {
                let change = Change::prior(record.key_path.clone(), old, record.options);
                record.deliver(target, &change);
            }
        }
    }

    /// Notify observers of `key_path` that its value changed from `old` to
    /// `new`.
    pub fn did_change(&self, target: &dyn Observed, key_path: &str, old: &Value, new: &Value) {
        for record in self.recipients(key_path) {
            let change = Change::setting(record.key_path.clone(), old, new, record.options);
            record.deliver(target, &change);
        }
    }

    /// Prune dead entries and collect live records for `key_path`.
    fn recipients(&self, key_path: &str) -> Vec<Rc<ObservationRecord>> {
        let mut records = self.records.borrow_mut();
        records.retain(|w| w.upgrade().is_some_and(|r| r.is_active()));
        records
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|r| r.key_path.as_str() == key_path)
            .collect()
    }
}

impl fmt::Debug for ObservationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationInfo")
            .field("observer_count", &self.observer_count())
            .field("registered_count", &self.registered_count())
            .finish()
    }
}
