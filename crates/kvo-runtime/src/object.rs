//! A ready-made observable object that can also host controllers.
//!
//! [`KvoObject`] stores named [`Value`]s and reports every value-changing
//! write to its observers. Writing a value equal to the current one is a
//! no-op: no version bump, no notifications. Floats compare by bit pattern
//! (see [`Value::is_same`]), so rewriting the same `NaN` is a no-op too.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use kvo_core::{KeyPath, Value};

use crate::attach::{AttachableController, ControllerSlots, KvoHost};
use crate::controller::KvoController;
use crate::observed::{ObservationInfo, Observed};

/// Property bag with change notification and controller slots.
///
/// Share it through `Rc` to observe it: controllers identify targets by
/// their `Rc` allocation.
pub struct KvoObject<C: AttachableController = KvoController> {
    properties: RefCell<BTreeMap<Rc<str>, Value>>,
    version: Cell<u64>,
    info: ObservationInfo,
    controllers: ControllerSlots<C>,
}

impl KvoObject {
    /// Create an empty object hosting [`KvoController`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: AttachableController> Default for KvoObject<C> {
    fn default() -> Self {
        Self {
            properties: RefCell::new(BTreeMap::new()),
            version: Cell::new(0),
            info: ObservationInfo::new(),
            controllers: ControllerSlots::new(),
        }
    }
}

impl<C: AttachableController> KvoObject<C> {
    /// Builder: set an initial value without notifying anyone.
    #[must_use]
    pub fn with_property(self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.borrow_mut().insert(Rc::from(key), value.into());
        self
    }

    /// Current value for `key` ([`Value::Null`] if unset).
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.properties.borrow().get(key).cloned().unwrap_or_default()
    }

    /// Set `key` to `value`, notifying observers if the value changed.
    ///
    /// Returns whether the value changed. Observers may write to this object
    /// from their handlers.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let old = self.get(key);
        if old.is_same(&value) {
            return false;
        }

        self.info.will_change(self, key, &old);
        self.properties.borrow_mut().insert(Rc::from(key), value.clone());
        self.version.set(self.version.get() + 1);
        self.info.did_change(self, key, &old, &value);
        true
    }

    /// Number of value-changing writes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Names of the properties that have been set.
    #[must_use]
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.properties.borrow().keys().cloned().collect()
    }
}

impl<C: AttachableController> Observed for KvoObject<C> {
    fn observation_info(&self) -> &ObservationInfo {
        &self.info
    }

    fn value_for_key(&self, key_path: &KeyPath) -> Value {
        self.get(key_path.as_str())
    }
}

impl<C: AttachableController> KvoHost for KvoObject<C> {
    type Controller = C;

    fn controller_slots(&self) -> &ControllerSlots<C> {
        &self.controllers
    }
}

impl<C: AttachableController> fmt::Debug for KvoObject<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvoObject")
            .field("properties", &*self.properties.borrow())
            .field("version", &self.version.get())
            .field("observers", &self.info.observer_count())
            .field("controllers", &self.controllers)
            .finish()
    }
}
