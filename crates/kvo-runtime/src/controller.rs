//! Observation controller: registers, tracks, and removes observations.
//!
//! A [`KvoController`] is a cheap handle; clones share the same registry.
//! When the last handle is dropped the controller removes every observation
//! it still holds before its memory is released, so no observation outlives
//! its controller.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Invalid key path | Empty component, whitespace | `Err(InvalidKeyPath)`, nothing registered |
//! | Limit reached | `max_observations` exceeded | `Err(ObservationLimit)`, nothing registered |
//! | Duplicate | Same target and key path twice | Ignored, first registration kept |
//! | Dead target | Non-retaining target dropped while observed | Entry pruned, warning logged |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kvo_core::{Change, KeyPath, KvoConfig, KvoError, ObjectId, ObservingOptions};
use tracing::{debug, warn};

use crate::attach::AttachableController;
use crate::observed::{Handler, ObservationRecord, Observed};
use crate::retention::{Retention, TargetRef};

/// Observations on one target, in registration order.
struct TargetEntry {
    id: ObjectId,
    target: TargetRef,
    records: Vec<Rc<ObservationRecord>>,
}

impl TargetEntry {
    /// Deactivate every record and unregister it from the target, if the
    /// target is still alive. Returns the number of records removed.
    fn detach(self) -> usize {
        let count = self.records.len();
        let target = self.target.upgrade();
        for record in &self.records {
            record.deactivate();
            if let Some(target) = &target {
                target.observation_info().unregister(record);
            }
        }
        count
    }
}

struct ControllerInner {
    retention: Retention,
    config: KvoConfig,
    entries: RefCell<Vec<TargetEntry>>,
}

impl ControllerInner {
    fn observation_count(&self) -> usize {
        self.entries.borrow().iter().map(|e| e.records.len()).sum()
    }

    fn teardown_all(&self) -> usize {
        // Release the borrow before detaching: dropping a retained target
        // can run arbitrary drop code.
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        entries.into_iter().map(TargetEntry::detach).sum()
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        let removed = self.teardown_all();
        debug!(retention = %self.retention, removed, "controller dropped");
    }
}

/// Per-host registry of active observations with a fixed [`Retention`].
///
/// Cloning creates a new handle to the **same** controller.
#[derive(Clone)]
pub struct KvoController {
    inner: Rc<ControllerInner>,
}

impl KvoController {
    /// Create a controller using the process-wide [`KvoConfig::global`].
    #[must_use]
    pub fn new(retention: Retention) -> Self {
        Self::with_config(retention, KvoConfig::global().clone())
    }

    /// Create a controller with an explicit configuration.
    #[must_use]
    pub fn with_config(retention: Retention, config: KvoConfig) -> Self {
        debug!(%retention, "controller created");
        Self {
            inner: Rc::new(ControllerInner {
                retention,
                config,
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn retention(&self) -> Retention {
        self.inner.retention
    }

    #[must_use]
    pub fn config(&self) -> &KvoConfig {
        &self.inner.config
    }

    /// Observe `key_path` on `target`, calling `handler` for each change.
    ///
    /// Registering the same (target, key path) twice is ignored. With
    /// [`ObservingOptions::INITIAL`] the handler runs once before this
    /// returns.
    ///
    /// # Errors
    ///
    /// [`KvoError::InvalidKeyPath`] or [`KvoError::ObservationLimit`]; in
    /// both cases nothing is registered.
    pub fn observe<T, F>(
        &self,
        target: &Rc<T>,
        key_path: &str,
        options: ObservingOptions,
        handler: F,
    ) -> Result<(), KvoError>
    where
        T: Observed,
        F: Fn(&dyn Observed, &Change) + 'static,
    {
        self.observe_many(target, &[key_path], options, handler)
    }

    /// Observe several key paths on `target` with one shared handler.
    ///
    /// All key paths are validated before anything is registered.
    ///
    /// # Errors
    ///
    /// See [`KvoController::observe`].
    pub fn observe_many<T, F>(
        &self,
        target: &Rc<T>,
        key_paths: &[&str],
        options: ObservingOptions,
        handler: F,
    ) -> Result<(), KvoError>
    where
        T: Observed,
        F: Fn(&dyn Observed, &Change) + 'static,
    {
        let mut parsed: Vec<KeyPath> = Vec::with_capacity(key_paths.len());
        for raw in key_paths {
            let key_path = KeyPath::parse(raw)?;
            if !parsed.contains(&key_path) {
                parsed.push(key_path);
            }
        }

        self.prune_dead_targets();

        let target_dyn: Rc<dyn Observed> = target.clone();
        let id = ObjectId::of(&target_dyn);
        let handler: Handler = Rc::new(handler);

        let added = {
            let mut entries = self.inner.entries.borrow_mut();
            let existing = entries.iter().position(|e| e.id == id);
            let fresh: Vec<KeyPath> = parsed
                .into_iter()
                .filter(|kp| {
                    let duplicate = existing.is_some_and(|i| {
                        entries[i].records.iter().any(|r| r.key_path() == kp)
                    });
                    if duplicate {
                        debug!(key_path = %kp, object = ?id, "already observing; ignored");
                    }
                    !duplicate
                })
                .collect();

            if let Some(limit) = self.inner.config.observation_limit() {
                let current: usize = entries.iter().map(|e| e.records.len()).sum();
                if current + fresh.len() > limit {
                    return Err(KvoError::ObservationLimit { limit });
                }
            }
            if fresh.is_empty() {
                return Ok(());
            }

            let index = existing.unwrap_or_else(|| {
                entries.push(TargetEntry {
                    id,
                    target: TargetRef::new(self.inner.retention, &target_dyn),
                    records: Vec::new(),
                });
                entries.len() - 1
            });

            let mut added = Vec::with_capacity(fresh.len());
            for key_path in fresh {
                let record = ObservationRecord::new(
                    key_path,
                    options,
                    Rc::clone(&handler),
                    self.inner.config.trace_delivery,
                );
                target_dyn.observation_info().register(&record);
                entries[index].records.push(Rc::clone(&record));
                added.push(record);
            }
            added
        };

        debug!(
            retention = %self.inner.retention,
            object = ?id,
            added = added.len(),
            "observation registered"
        );

        if options.contains(ObservingOptions::INITIAL) {
            for record in &added {
                let current = target_dyn.value_for_key(record.key_path());
                let change = Change::initial(record.key_path().clone(), &current, options);
                record.deliver(&*target_dyn, &change);
            }
        }
        Ok(())
    }

    /// Stop observing `key_path` on `target`. Returns whether an
    /// observation was removed.
    pub fn unobserve<T>(&self, target: &Rc<T>, key_path: &str) -> bool
    where
        T: Observed + ?Sized,
    {
        let id = ObjectId::of(target);
        let removed = {
            let mut entries = self.inner.entries.borrow_mut();
            let Some(index) = entries.iter().position(|e| e.id == id) else {
                return false;
            };
            let entry = &mut entries[index];
            let Some(pos) = entry
                .records
                .iter()
                .position(|r| r.key_path().as_str() == key_path)
            else {
                return false;
            };
            let record = entry.records.remove(pos);
            let emptied = entry.records.is_empty().then(|| entries.remove(index));
            (record, emptied)
        };

        let (record, emptied) = removed;
        record.deactivate();
        target.observation_info().unregister(&record);
        debug!(key_path, object = ?id, "observation removed");
        // Drop the emptied entry (possibly the last strong ref to the target)
        // only after the registry borrow is released.
        drop(emptied);
        true
    }

    /// Stop observing every key path on `target`. Returns the number of
    /// observations removed.
    pub fn unobserve_target<T>(&self, target: &Rc<T>) -> usize
    where
        T: Observed + ?Sized,
    {
        let id = ObjectId::of(target);
        let entry = {
            let mut entries = self.inner.entries.borrow_mut();
            let Some(index) = entries.iter().position(|e| e.id == id) else {
                return 0;
            };
            entries.remove(index)
        };
        let removed = entry.detach();
        debug!(object = ?id, removed, "target unobserved");
        removed
    }

    /// Remove every observation. The controller stays usable.
    pub fn unobserve_all(&self) -> usize {
        self.teardown_all()
    }

    /// Remove every observation this controller holds. Runs automatically
    /// when the last handle is dropped.
    pub fn teardown_all(&self) -> usize {
        let removed = self.inner.teardown_all();
        debug!(retention = %self.inner.retention, removed, "all observations removed");
        removed
    }

    /// Remove entries whose (non-retained) target has been dropped. Returns
    /// the number of observations pruned.
    ///
    /// Runs before every registration. A hit means the caller broke the
    /// non-retaining contract by dropping a target it was still observing;
    /// it is reported with `warn` when
    /// [`KvoConfig::detect_dead_targets`] is on.
    pub fn prune_dead_targets(&self) -> usize {
        let dead: Vec<TargetEntry> = {
            let mut entries = self.inner.entries.borrow_mut();
            let (dead, live): (Vec<_>, Vec<_>) =
                std::mem::take(&mut *entries).into_iter().partition(|e| !e.target.is_alive());
            *entries = live;
            dead
        };

        let mut pruned = 0;
        for entry in dead {
            if self.inner.config.detect_dead_targets {
                let key_paths: Vec<&str> = entry.records.iter().map(|r| r.key_path().as_str()).collect();
                warn!(
                    object = ?entry.id,
                    ?key_paths,
                    "observed target dropped before its observations were removed"
                );
            }
            pruned += entry.detach();
        }
        pruned
    }

    /// Whether `key_path` on `target` is currently observed.
    #[must_use]
    pub fn is_observing<T>(&self, target: &Rc<T>, key_path: &str) -> bool
    where
        T: Observed + ?Sized,
    {
        let id = ObjectId::of(target);
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|e| e.id == id)
            .flat_map(|e| e.records.iter())
            .any(|r| r.key_path().as_str() == key_path)
    }

    /// Number of active observations across all targets.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        self.inner.observation_count()
    }

    /// Number of distinct observed targets.
    #[must_use]
    pub fn observed_target_count(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Whether `self` and `other` are handles to the same controller.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl AttachableController for KvoController {
    fn with_retention(retention: Retention) -> Self {
        Self::new(retention)
    }

    fn retention(&self) -> Retention {
        self.inner.retention
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        KvoController::ptr_eq(self, other)
    }
}

impl fmt::Debug for KvoController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entries<'a>(&'a [TargetEntry]);

        impl fmt::Debug for Entries<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.0.iter().map(|e| {
                        let keys: Vec<&str> = e.records.iter().map(|r| r.key_path().as_str()).collect();
                        (e.id, keys)
                    }))
                    .finish()
            }
        }

        let entries = self.inner.entries.borrow();
        f.debug_struct("KvoController")
            .field("retention", &self.inner.retention)
            .field("observations", &Entries(&entries))
            .finish()
    }
}
